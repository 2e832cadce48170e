use imghost_logging::{imghost_debug, imghost_warn};

use crate::{Effect, ItemUpdate, Msg, QueueError, UploadQueue};

/// Applies a message to the queue and returns the effects to run, in order.
///
/// Validation and state errors are returned synchronously; transfer failures
/// arrive as `Msg::UploadSettled` and become item state instead.
pub fn update(queue: &mut UploadQueue, msg: Msg) -> Result<Vec<Effect>, QueueError> {
    let effects = match msg {
        Msg::FilesAdded(files) => {
            let report = queue.enqueue(files)?;
            for rejected in &report.rejected {
                imghost_warn!("skipped {}: {}", rejected.name, rejected.reason);
            }
            report
                .accepted
                .iter()
                .filter_map(|id| queue.get(*id))
                .map(|item| Effect::ItemChanged(ItemUpdate::from(item)))
                .collect()
        }
        Msg::StartClicked => {
            if queue.is_empty() {
                imghost_debug!("start ignored: queue is empty");
                Vec::new()
            } else {
                queue.schedule()?
            }
        }
        Msg::RetryClicked(item_id) => queue.retry(item_id)?,
        Msg::RemoveClicked(item_id) => queue.remove(item_id)?,
        Msg::ConcurrencyChanged(limit) => {
            queue.set_concurrency_limit(limit)?;
            Vec::new()
        }
        Msg::TargetDirectoryChanged(dir) => {
            queue.set_target_directory(&dir)?;
            Vec::new()
        }
        Msg::UploadProgress { item_id, percent } => queue.record_progress(item_id, percent),
        Msg::UploadSettled { item_id, outcome } => queue.settle(item_id, outcome)?,
    };

    Ok(effects)
}
