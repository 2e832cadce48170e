use crate::{ContentSource, ItemId, ItemStatus, UploadItem, UploadLink};

/// Work the coordinator asks its host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run one transfer; report back with `Msg::UploadProgress` and exactly
    /// one `Msg::UploadSettled`.
    StartUpload(UploadRequest),
    ItemChanged(ItemUpdate),
    ItemRemoved(ItemId),
    /// No item is queued or uploading any more.
    BatchSettled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub item_id: ItemId,
    pub target_dir: String,
    pub filename: String,
    pub size_bytes: u64,
    pub source: ContentSource,
    pub commit_message: String,
}

/// Observer-facing snapshot of an item after a transition or progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub item_id: ItemId,
    pub status: ItemStatus,
    pub progress_percent: u8,
    pub link: Option<UploadLink>,
    pub error: Option<String>,
}

impl From<&UploadItem> for ItemUpdate {
    fn from(item: &UploadItem) -> Self {
        Self {
            item_id: item.id(),
            status: item.status(),
            progress_percent: item.progress_percent(),
            link: item.result_link().cloned(),
            error: item.last_error().map(ToOwned::to_owned),
        }
    }
}

impl UploadRequest {
    pub(crate) fn for_item(item: &UploadItem, target_dir: &str) -> Self {
        Self {
            item_id: item.id(),
            target_dir: target_dir.to_string(),
            filename: item.name().to_string(),
            size_bytes: item.size_bytes(),
            source: item.source().clone(),
            commit_message: format!("feat: upload {}", item.name()),
        }
    }
}
