use crate::{FileCandidate, ItemId, UploadOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User dropped or picked files.
    FilesAdded(Vec<FileCandidate>),
    /// User clicked Start.
    StartClicked,
    /// User asked to retry a failed item.
    RetryClicked(ItemId),
    /// User asked to remove an item from the list.
    RemoveClicked(ItemId),
    /// User edited the thread count.
    ConcurrencyChanged(usize),
    /// User picked a target folder.
    TargetDirectoryChanged(String),
    /// Engine progress for an uploading item.
    UploadProgress { item_id: ItemId, percent: u8 },
    /// Engine completion for an uploading item.
    UploadSettled {
        item_id: ItemId,
        outcome: UploadOutcome,
    },
}
