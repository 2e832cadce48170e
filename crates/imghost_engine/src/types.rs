use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type ItemId = u64;

/// Bytes to transfer for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub item_id: ItemId,
    pub target_dir: String,
    pub filename: String,
    pub size_hint: u64,
    pub source: UploadSource,
    pub commit_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub item_id: ItemId,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(UploadProgress),
    UploadCompleted {
        item_id: ItemId,
        result: Result<RemoteLink, TransferError>,
    },
}

/// Where a stored file can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    /// Repository path actually written, after collision renaming.
    pub path: String,
    pub raw_url: String,
    pub web_url: String,
}

/// A file entry of a repository directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub sha: String,
    pub download_url: Option<String>,
}

/// A failed store operation. `Display` is the human readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferError {
    pub kind: TransferErrorKind,
    pub message: String,
}

impl TransferError {
    pub(crate) fn new(kind: TransferErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferErrorKind {
    NotConfigured,
    InvalidRequest,
    Network,
    Timeout,
    Unauthorized,
    Forbidden,
    RateLimited,
    NotFound,
    Conflict,
    Unprocessable,
    HttpStatus(u16),
    Io,
    InvalidResponse,
    CollisionLimit { attempts: u32 },
}

impl fmt::Display for TransferErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferErrorKind::NotConfigured => write!(f, "store not configured"),
            TransferErrorKind::InvalidRequest => write!(f, "invalid request"),
            TransferErrorKind::Network => write!(f, "network error"),
            TransferErrorKind::Timeout => write!(f, "timeout"),
            TransferErrorKind::Unauthorized => write!(f, "unauthorized"),
            TransferErrorKind::Forbidden => write!(f, "forbidden"),
            TransferErrorKind::RateLimited => write!(f, "rate limited"),
            TransferErrorKind::NotFound => write!(f, "not found"),
            TransferErrorKind::Conflict => write!(f, "conflict"),
            TransferErrorKind::Unprocessable => write!(f, "rejected by validation"),
            TransferErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            TransferErrorKind::Io => write!(f, "io error"),
            TransferErrorKind::InvalidResponse => write!(f, "invalid response"),
            TransferErrorKind::CollisionLimit { attempts } => {
                write!(f, "no free file name after {attempts} attempts")
            }
        }
    }
}
