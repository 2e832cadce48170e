use crate::{Effect, ItemId, ItemUpdate};

/// Receiver of queue notifications, typically a view.
pub trait QueueObserver {
    /// Called on every transition and on every accepted progress report.
    fn on_item_state_changed(&mut self, update: &ItemUpdate);

    fn on_item_removed(&mut self, _item_id: ItemId) {}

    /// Called at most once per quiescence event.
    fn on_batch_settled(&mut self);
}

/// Forwards the observer-facing effects, in order. `StartUpload` is skipped.
pub fn notify_observer(observer: &mut dyn QueueObserver, effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::ItemChanged(update) => observer.on_item_state_changed(update),
            Effect::ItemRemoved(item_id) => observer.on_item_removed(*item_id),
            Effect::BatchSettled => observer.on_batch_settled(),
            Effect::StartUpload(_) => {}
        }
    }
}
