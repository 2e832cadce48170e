use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use imghost_logging::imghost_debug;

use crate::{Action, StateError};

pub type ItemId = u64;

/// Result of one transfer as reported back to the queue: the remote locator,
/// or the store's error message.
pub type UploadOutcome = Result<UploadLink, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Queued,
    Uploading,
    Done,
    Error,
}

impl ItemStatus {
    /// `Done` and `Error` are settled states.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Error)
    }

    /// Short label for list rendering.
    pub fn label(self) -> &'static str {
        match self {
            ItemStatus::Queued => "Queued",
            ItemStatus::Uploading => "Uploading…",
            ItemStatus::Done => "Uploaded",
            ItemStatus::Error => "Failed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Queued => write!(f, "queued"),
            ItemStatus::Uploading => write!(f, "uploading"),
            ItemStatus::Done => write!(f, "done"),
            ItemStatus::Error => write!(f, "error"),
        }
    }
}

/// Where an item's bytes come from. Read only once the upload starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file offered to the queue (drag-drop or file picker), before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    pub source: ContentSource,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, size_bytes: u64, source: ContentSource) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            source,
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self::new(name, bytes.len() as u64, ContentSource::Memory(bytes))
    }
}

/// Locators for a file the remote store accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLink {
    /// Path inside the repository; may differ from the requested name.
    pub path: String,
    pub raw_url: String,
    pub web_url: String,
    pub markdown: String,
    pub html: String,
}

impl UploadLink {
    pub fn new(
        path: impl Into<String>,
        raw_url: impl Into<String>,
        web_url: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let raw_url = raw_url.into();
        let basename = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            markdown: format!("![{basename}]({raw_url})"),
            html: format!("<img src=\"{raw_url}\" alt=\"{basename}\">"),
            path,
            raw_url,
            web_url: web_url.into(),
        }
    }
}

/// One file pending, being, or having been transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    id: ItemId,
    name: String,
    size_bytes: u64,
    source: ContentSource,
    status: ItemStatus,
    progress_percent: u8,
    result_link: Option<UploadLink>,
    last_error: Option<String>,
}

impl UploadItem {
    pub(crate) fn new(id: ItemId, name: String, size_bytes: u64, source: ContentSource) -> Self {
        Self {
            id,
            name,
            size_bytes,
            source,
            status: ItemStatus::Queued,
            progress_percent: 0,
            result_link: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn result_link(&self) -> Option<&UploadLink> {
        self.result_link.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn begin_upload(&mut self) -> Result<(), StateError> {
        self.expect_status(ItemStatus::Queued, Action::Start)?;
        self.transition(ItemStatus::Uploading);
        Ok(())
    }

    /// Applies a progress report. Returns false when the report was dropped:
    /// the item is not uploading or the value would move progress backwards.
    pub(crate) fn record_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if self.status != ItemStatus::Uploading || percent <= self.progress_percent {
            return false;
        }
        self.progress_percent = percent;
        true
    }

    pub(crate) fn complete(&mut self, link: UploadLink) -> Result<(), StateError> {
        self.expect_status(ItemStatus::Uploading, Action::Complete)?;
        self.transition(ItemStatus::Done);
        self.progress_percent = 100;
        self.result_link = Some(link);
        Ok(())
    }

    /// Progress is left where it stopped.
    pub(crate) fn fail(&mut self, message: String) -> Result<(), StateError> {
        self.expect_status(ItemStatus::Uploading, Action::Fail)?;
        self.transition(ItemStatus::Error);
        let message = if message.trim().is_empty() {
            "upload failed".to_string()
        } else {
            message
        };
        self.last_error = Some(message);
        Ok(())
    }

    pub(crate) fn requeue(&mut self) -> Result<(), StateError> {
        self.expect_status(ItemStatus::Error, Action::Retry)?;
        self.transition(ItemStatus::Queued);
        self.progress_percent = 0;
        self.last_error = None;
        Ok(())
    }

    pub(crate) fn ensure_removable(&self) -> Result<(), StateError> {
        if self.status == ItemStatus::Uploading {
            return Err(self.invalid(Action::Remove));
        }
        Ok(())
    }

    fn expect_status(&self, expected: ItemStatus, action: Action) -> Result<(), StateError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: Action) -> StateError {
        StateError::InvalidTransition {
            item_id: self.id,
            from: self.status,
            action,
        }
    }

    fn transition(&mut self, next: ItemStatus) {
        imghost_debug!("item {} ({}) {} -> {}", self.id, self.name, self.status, next);
        self.status = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> UploadItem {
        UploadItem::new(
            7,
            "cat.png".to_string(),
            3,
            ContentSource::Memory(Arc::from(&b"abc"[..])),
        )
    }

    #[test]
    fn happy_path_ends_at_full_progress_with_link() {
        let mut item = item();
        item.begin_upload().unwrap();
        assert!(item.record_progress(40));
        item.complete(UploadLink::new("images/cat.png", "raw", "web"))
            .unwrap();

        assert_eq!(item.status(), ItemStatus::Done);
        assert_eq!(item.progress_percent(), 100);
        assert!(item.result_link().is_some());
        assert_eq!(item.last_error(), None);
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut item = item();
        assert!(!item.record_progress(10), "queued items ignore progress");
        item.begin_upload().unwrap();
        assert!(item.record_progress(50));
        assert!(!item.record_progress(20));
        assert!(!item.record_progress(50));
        assert!(item.record_progress(250));
        assert_eq!(item.progress_percent(), 100);
    }

    #[test]
    fn failure_keeps_progress_and_retry_resets_it() {
        let mut item = item();
        item.begin_upload().unwrap();
        item.record_progress(35);
        item.fail("GitHub 401: bad credentials".to_string()).unwrap();
        assert_eq!(item.progress_percent(), 35);
        assert_eq!(item.last_error(), Some("GitHub 401: bad credentials"));
        assert!(item.result_link().is_none());

        item.requeue().unwrap();
        assert_eq!(item.status(), ItemStatus::Queued);
        assert_eq!(item.progress_percent(), 0);
        assert_eq!(item.last_error(), None);
    }

    #[test]
    fn blank_failure_message_is_replaced() {
        let mut item = item();
        item.begin_upload().unwrap();
        item.fail("  ".to_string()).unwrap();
        assert_eq!(item.last_error(), Some("upload failed"));
    }

    #[test]
    fn invalid_transitions_report_state() {
        let mut item = item();
        assert_eq!(
            item.requeue(),
            Err(StateError::InvalidTransition {
                item_id: 7,
                from: ItemStatus::Queued,
                action: Action::Retry,
            })
        );
        item.begin_upload().unwrap();
        assert!(item.begin_upload().is_err());
        assert!(item.ensure_removable().is_err());
    }

    #[test]
    fn link_snippets_use_basename() {
        let link = UploadLink::new(
            "images/2024/cat-1.png",
            "https://raw.example/cat-1.png",
            "https://web.example/cat-1.png",
        );
        assert_eq!(link.markdown, "![cat-1.png](https://raw.example/cat-1.png)");
        assert_eq!(
            link.html,
            "<img src=\"https://raw.example/cat-1.png\" alt=\"cat-1.png\">"
        );
    }
}
