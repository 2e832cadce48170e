//! Imghost core: upload item state machine and the upload queue coordinator.
//!
//! Nothing in this crate performs IO. Uploads are requested through
//! [`Effect::StartUpload`] and their results are fed back as [`Msg`]s.
mod effect;
mod error;
mod filename;
mod item;
mod msg;
mod observer;
mod queue;
mod update;
mod view_model;

pub use effect::{Effect, ItemUpdate, UploadRequest};
pub use error::{Action, QueueError, StateError, ValidationError};
pub use filename::{
    is_supported_image, mime_hint, normalize_directory, sanitize_filename, SUPPORTED_EXTENSIONS,
};
pub use item::{
    ContentSource, FileCandidate, ItemId, ItemStatus, UploadItem, UploadLink, UploadOutcome,
};
pub use msg::Msg;
pub use observer::{notify_observer, QueueObserver};
pub use queue::{EnqueueReport, RejectedFile, UploadQueue, DEFAULT_CONCURRENCY_LIMIT};
pub use update::update;
pub use view_model::{format_size, ItemRowView, QueueViewModel};
