//! Imghost engine: the GitHub-backed content store and the async upload runner.
mod content;
mod engine;
mod paths;
mod store;
mod types;

pub use content::{read_source, ChannelProgressSink, ProgressSink, READ_PROGRESS_CEILING};
pub use engine::UploadEngine;
pub use paths::candidate_path;
pub use store::{ContentStore, GithubStore, RepoConfig, StoreSettings};
pub use types::{
    EngineEvent, ItemId, RemoteFile, RemoteLink, TransferError, TransferErrorKind, UploadJob,
    UploadProgress, UploadSource,
};
