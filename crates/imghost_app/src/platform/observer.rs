use std::collections::HashMap;
use std::io::Write;

use imghost_core::{ItemId, ItemStatus, ItemUpdate, QueueObserver};

/// Prints one line per item transition. Progress ticks are not printed.
pub struct ConsoleObserver<W: Write> {
    out: W,
    names: HashMap<ItemId, String>,
    last_status: HashMap<ItemId, ItemStatus>,
    batches_settled: usize,
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: HashMap::new(),
            last_status: HashMap::new(),
            batches_settled: 0,
        }
    }

    pub fn register(&mut self, item_id: ItemId, name: impl Into<String>) {
        self.names.insert(item_id, name.into());
    }

    pub fn batches_settled(&self) -> usize {
        self.batches_settled
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn name(&self, item_id: ItemId) -> String {
        self.names
            .get(&item_id)
            .cloned()
            .unwrap_or_else(|| format!("item {item_id}"))
    }
}

impl<W: Write> QueueObserver for ConsoleObserver<W> {
    fn on_item_state_changed(&mut self, update: &ItemUpdate) {
        if self.last_status.insert(update.item_id, update.status) == Some(update.status) {
            return;
        }
        let name = self.name(update.item_id);
        let _ = match update.status {
            ItemStatus::Done => match &update.link {
                Some(link) => writeln!(
                    self.out,
                    "[{}] {}: {}\n    {}\n    {}",
                    update.item_id,
                    name,
                    update.status.label(),
                    link.raw_url,
                    link.markdown
                ),
                None => writeln!(self.out, "[{}] {}: {}", update.item_id, name, update.status.label()),
            },
            ItemStatus::Error => writeln!(
                self.out,
                "[{}] {}: {} ({})",
                update.item_id,
                name,
                update.status.label(),
                update.error.as_deref().unwrap_or("unknown error")
            ),
            _ => writeln!(self.out, "[{}] {}: {}", update.item_id, name, update.status.label()),
        };
    }

    fn on_item_removed(&mut self, item_id: ItemId) {
        self.last_status.remove(&item_id);
        let _ = writeln!(self.out, "[{}] {}: removed", item_id, self.name(item_id));
    }

    fn on_batch_settled(&mut self) {
        self.batches_settled += 1;
        let _ = writeln!(self.out, "All uploads settled.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imghost_core::UploadLink;
    use pretty_assertions::assert_eq;

    fn change(status: ItemStatus, progress: u8) -> ItemUpdate {
        ItemUpdate {
            item_id: 1,
            status,
            progress_percent: progress,
            link: None,
            error: None,
        }
    }

    #[test]
    fn prints_transitions_once_and_skips_progress() {
        let mut observer = ConsoleObserver::new(Vec::new());
        observer.register(1, "cat.png");

        observer.on_item_state_changed(&change(ItemStatus::Queued, 0));
        observer.on_item_state_changed(&change(ItemStatus::Uploading, 0));
        observer.on_item_state_changed(&change(ItemStatus::Uploading, 40));
        observer.on_item_state_changed(&ItemUpdate {
            link: Some(UploadLink::new(
                "images/cat.png",
                "https://raw.example/images/cat.png",
                "https://web.example/images/cat.png",
            )),
            ..change(ItemStatus::Done, 100)
        });
        observer.on_batch_settled();

        let printed = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(
            printed,
            "[1] cat.png: Queued\n\
             [1] cat.png: Uploading…\n\
             [1] cat.png: Uploaded\n    \
             https://raw.example/images/cat.png\n    \
             ![cat.png](https://raw.example/images/cat.png)\n\
             All uploads settled.\n"
        );
    }

    #[test]
    fn prints_failure_reason() {
        let mut observer = ConsoleObserver::new(Vec::new());
        observer.on_item_state_changed(&ItemUpdate {
            error: Some("GitHub 401: Bad credentials".to_string()),
            ..change(ItemStatus::Error, 30)
        });

        let printed = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(printed, "[1] item 1: Failed (GitHub 401: Bad credentials)\n");
    }
}
