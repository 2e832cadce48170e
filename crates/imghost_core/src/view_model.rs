use crate::{ItemId, ItemStatus, UploadItem, UploadQueue};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueViewModel {
    pub rows: Vec<ItemRowView>,
    pub running: usize,
    pub concurrency_limit: usize,
    pub target_directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRowView {
    pub item_id: ItemId,
    pub name: String,
    pub size_label: String,
    pub status: ItemStatus,
    pub progress_percent: u8,
    pub raw_url: Option<String>,
    pub error: Option<String>,
    pub can_retry: bool,
    pub can_remove: bool,
}

impl UploadQueue {
    /// Rows in insertion order, ready for display.
    pub fn view(&self) -> QueueViewModel {
        QueueViewModel {
            rows: self.items().iter().map(ItemRowView::from).collect(),
            running: self.running_count(),
            concurrency_limit: self.concurrency_limit(),
            target_directory: self.target_directory().map(ToOwned::to_owned),
        }
    }
}

impl From<&UploadItem> for ItemRowView {
    fn from(item: &UploadItem) -> Self {
        Self {
            item_id: item.id(),
            name: item.name().to_string(),
            size_label: format_size(item.size_bytes()),
            status: item.status(),
            progress_percent: item.progress_percent(),
            raw_url: item.result_link().map(|link| link.raw_url.clone()),
            error: item.last_error().map(ToOwned::to_owned),
            can_retry: item.status() == ItemStatus::Error,
            can_remove: item.status() != ItemStatus::Uploading,
        }
    }
}

/// `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::format_size;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0 MB");
    }
}
