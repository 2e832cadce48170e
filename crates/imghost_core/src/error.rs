use std::fmt;

use thiserror::Error;

use crate::{ItemId, ItemStatus};

/// Input rejected before it can affect the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no supported images in selection (rejected: {})", .rejected.join(", "))]
    NoSupportedFiles { rejected: Vec<String> },
    #[error("unsupported file type: {0}")]
    UnsupportedExtension(String),
    #[error("file name {0:?} is empty after sanitizing")]
    EmptyFilename(String),
    #[error("target directory is not set")]
    MissingTargetDirectory,
    #[error("concurrency limit must be a positive integer, got {0}")]
    InvalidConcurrencyLimit(usize),
}

/// Operation attempted against an item that cannot accept it.
///
/// This is a usage fault: callers should not try to recover from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("unknown upload item {0}")]
    UnknownItem(ItemId),
    #[error("cannot {action} item {item_id} while it is {from}")]
    InvalidTransition {
        item_id: ItemId,
        from: ItemStatus,
        action: Action,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Operator or coordinator action named in a [`StateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Complete,
    Fail,
    Retry,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "start"),
            Action::Complete => write!(f, "complete"),
            Action::Fail => write!(f, "fail"),
            Action::Retry => write!(f, "retry"),
            Action::Remove => write!(f, "remove"),
        }
    }
}
