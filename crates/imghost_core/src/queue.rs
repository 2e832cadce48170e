use imghost_logging::{imghost_debug, imghost_info, imghost_warn};

use crate::filename::{is_supported_image, normalize_directory, sanitize_filename};
use crate::{
    Effect, FileCandidate, ItemId, ItemStatus, ItemUpdate, QueueError, StateError, UploadItem,
    UploadOutcome, UploadRequest, ValidationError,
};

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 2;

/// Outcome of [`UploadQueue::enqueue`] for a selection that had at least one
/// acceptable file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnqueueReport {
    pub accepted: Vec<ItemId>,
    pub rejected: Vec<RejectedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: ValidationError,
}

/// Upload queue coordinator for one uploader session.
///
/// Owns the items and the running counter. Every method runs to completion
/// without suspending; transfers happen elsewhere and report back through
/// [`UploadQueue::record_progress`] and [`UploadQueue::settle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
    next_id: ItemId,
    running: usize,
    concurrency_limit: usize,
    target_directory: Option<String>,
    // Set when an item starts uploading, cleared when BatchSettled is emitted.
    batch_open: bool,
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadQueue {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            running: 0,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            target_directory: None,
            batch_open: false,
        }
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn get(&self, item_id: ItemId) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.running
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn target_directory(&self) -> Option<&str> {
        self.target_directory.as_deref()
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.items
            .iter()
            .filter(|item| item.status() == status)
            .count()
    }

    /// No item is queued or uploading.
    pub fn is_quiescent(&self) -> bool {
        !self
            .items
            .iter()
            .any(|item| matches!(item.status(), ItemStatus::Queued | ItemStatus::Uploading))
    }

    /// Appends the supported files of a selection as `Queued` items.
    ///
    /// Unsupported files are listed in the report. A selection without any
    /// supported file is an error and leaves the queue untouched. Nothing is
    /// launched; call [`UploadQueue::schedule`] to start.
    pub fn enqueue(&mut self, files: Vec<FileCandidate>) -> Result<EnqueueReport, ValidationError> {
        let mut report = EnqueueReport::default();
        let mut accepted = Vec::new();

        for file in files {
            match validate(&file) {
                Ok(name) => accepted.push((name, file)),
                Err(reason) => report.rejected.push(RejectedFile {
                    name: file.name,
                    reason,
                }),
            }
        }

        if accepted.is_empty() {
            return Err(ValidationError::NoSupportedFiles {
                rejected: report
                    .rejected
                    .into_iter()
                    .map(|rejected| rejected.name)
                    .collect(),
            });
        }

        for (name, file) in accepted {
            let id = self.next_id;
            self.next_id += 1;
            self.items
                .push(UploadItem::new(id, name, file.size_bytes, file.source));
            report.accepted.push(id);
        }
        imghost_info!(
            "enqueued {} item(s), rejected {}",
            report.accepted.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Takes effect on the next scheduling pass; running uploads are not preempted.
    pub fn set_concurrency_limit(&mut self, limit: usize) -> Result<(), ValidationError> {
        if limit == 0 {
            return Err(ValidationError::InvalidConcurrencyLimit(limit));
        }
        self.concurrency_limit = limit;
        Ok(())
    }

    pub fn set_target_directory(&mut self, dir: &str) -> Result<(), ValidationError> {
        let normalized = normalize_directory(dir);
        if normalized.is_empty() {
            return Err(ValidationError::MissingTargetDirectory);
        }
        self.target_directory = Some(normalized);
        Ok(())
    }

    /// Launches queued items, first in insertion order, while capacity remains.
    pub fn schedule(&mut self) -> Result<Vec<Effect>, QueueError> {
        if self.count(ItemStatus::Queued) == 0 {
            return Ok(Vec::new());
        }
        let target = self
            .target_directory
            .clone()
            .ok_or(ValidationError::MissingTargetDirectory)?;
        Ok(self.launch_ready(&target))
    }

    /// Forwards a progress report for an uploading item.
    pub fn record_progress(&mut self, item_id: ItemId, percent: u8) -> Vec<Effect> {
        let Some(item) = self.items.iter_mut().find(|item| item.id() == item_id) else {
            imghost_debug!("progress for unknown item {} dropped", item_id);
            return Vec::new();
        };
        if item.record_progress(percent) {
            vec![Effect::ItemChanged(ItemUpdate::from(&*item))]
        } else {
            Vec::new()
        }
    }

    /// Settles an uploading item, backfills freed capacity, and emits
    /// `BatchSettled` when this completion made the queue quiescent.
    pub fn settle(
        &mut self,
        item_id: ItemId,
        outcome: UploadOutcome,
    ) -> Result<Vec<Effect>, StateError> {
        let index = self.index_of(item_id)?;
        let item = &mut self.items[index];
        match outcome {
            Ok(link) => {
                item.complete(link)?;
                imghost_info!(
                    "item {} uploaded to {}",
                    item_id,
                    item.result_link()
                        .map(|link| link.path.as_str())
                        .unwrap_or_default()
                );
            }
            Err(message) => {
                item.fail(message)?;
                imghost_warn!(
                    "item {} failed: {}",
                    item_id,
                    item.last_error().unwrap_or_default()
                );
            }
        }
        self.running = self.running.saturating_sub(1);

        let mut effects = vec![Effect::ItemChanged(ItemUpdate::from(&self.items[index]))];
        if let Some(target) = self.target_directory.clone() {
            effects.extend(self.launch_ready(&target));
        }
        self.settle_batch_if_quiescent(&mut effects);
        Ok(effects)
    }

    /// Operator retry of a failed item; schedules immediately.
    pub fn retry(&mut self, item_id: ItemId) -> Result<Vec<Effect>, QueueError> {
        let index = self.index_of(item_id)?;
        self.items[index].requeue()?;
        let mut effects = vec![Effect::ItemChanged(ItemUpdate::from(&self.items[index]))];
        effects.extend(self.schedule()?);
        Ok(effects)
    }

    /// Removes an item that is not uploading.
    pub fn remove(&mut self, item_id: ItemId) -> Result<Vec<Effect>, StateError> {
        let index = self.index_of(item_id)?;
        self.items[index].ensure_removable()?;
        let removed = self.items.remove(index);
        imghost_debug!(
            "removed item {} ({}) in state {}",
            item_id,
            removed.name(),
            removed.status()
        );

        let mut effects = vec![Effect::ItemRemoved(item_id)];
        self.settle_batch_if_quiescent(&mut effects);
        Ok(effects)
    }

    fn launch_ready(&mut self, target: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        while self.running < self.concurrency_limit {
            let Some(index) = self
                .items
                .iter()
                .position(|item| item.status() == ItemStatus::Queued)
            else {
                break;
            };
            let item = &mut self.items[index];
            if let Err(err) = item.begin_upload() {
                imghost_warn!("could not start item {}: {}", item.id(), err);
                break;
            }
            self.running += 1;
            self.batch_open = true;
            imghost_info!(
                "starting upload of item {} ({}) into {:?}, {}/{} running",
                item.id(),
                item.name(),
                target,
                self.running,
                self.concurrency_limit
            );
            effects.push(Effect::ItemChanged(ItemUpdate::from(&*item)));
            effects.push(Effect::StartUpload(UploadRequest::for_item(item, target)));
        }
        effects
    }

    fn settle_batch_if_quiescent(&mut self, effects: &mut Vec<Effect>) {
        if self.batch_open && self.is_quiescent() {
            self.batch_open = false;
            imghost_info!(
                "batch settled: {} done, {} failed",
                self.count(ItemStatus::Done),
                self.count(ItemStatus::Error)
            );
            effects.push(Effect::BatchSettled);
        }
    }

    fn index_of(&self, item_id: ItemId) -> Result<usize, StateError> {
        self.items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or(StateError::UnknownItem(item_id))
    }
}

fn validate(file: &FileCandidate) -> Result<String, ValidationError> {
    if !is_supported_image(&file.name) {
        return Err(ValidationError::UnsupportedExtension(file.name.clone()));
    }
    let name = sanitize_filename(&file.name);
    if name.is_empty() || name.starts_with('.') || !is_supported_image(&name) {
        return Err(ValidationError::EmptyFilename(file.name.clone()));
    }
    Ok(name)
}
