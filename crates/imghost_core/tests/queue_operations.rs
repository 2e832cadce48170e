use std::sync::Once;

use imghost_core::{
    notify_observer, update, Action, Effect, FileCandidate, ItemId, ItemStatus, ItemUpdate, Msg,
    QueueError, QueueObserver, StateError, UploadLink, UploadQueue, ValidationError,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(imghost_logging::initialize_for_tests);
}

fn image(name: &str) -> FileCandidate {
    FileCandidate::from_bytes(name, vec![7u8; 2048])
}

fn started_queue(names: &[&str], limit: usize) -> (UploadQueue, Vec<Effect>) {
    let mut queue = UploadQueue::new();
    update(&mut queue, Msg::TargetDirectoryChanged("images".to_string())).unwrap();
    update(&mut queue, Msg::ConcurrencyChanged(limit)).unwrap();
    update(
        &mut queue,
        Msg::FilesAdded(names.iter().map(|name| image(name)).collect()),
    )
    .unwrap();
    let effects = update(&mut queue, Msg::StartClicked).unwrap();
    (queue, effects)
}

fn link_for(item_id: ItemId) -> UploadLink {
    UploadLink::new(
        format!("images/{item_id}.png"),
        format!("https://raw.example/images/{item_id}.png"),
        format!("https://web.example/images/{item_id}.png"),
    )
}

fn settled(item_id: ItemId, ok: bool) -> Msg {
    Msg::UploadSettled {
        item_id,
        outcome: if ok {
            Ok(link_for(item_id))
        } else {
            Err("GitHub network error: connection reset".to_string())
        },
    }
}

#[derive(Default)]
struct RecordingObserver {
    changes: Vec<ItemUpdate>,
    removed: Vec<ItemId>,
    settled: usize,
}

impl QueueObserver for RecordingObserver {
    fn on_item_state_changed(&mut self, update: &ItemUpdate) {
        self.changes.push(update.clone());
    }

    fn on_item_removed(&mut self, item_id: ItemId) {
        self.removed.push(item_id);
    }

    fn on_batch_settled(&mut self) {
        self.settled += 1;
    }
}

#[test]
fn unsupported_extension_never_enters_queue() {
    init_logging();
    let mut queue = UploadQueue::new();

    let err = update(
        &mut queue,
        Msg::FilesAdded(vec![FileCandidate::from_bytes("notes.txt", b"hello".to_vec())]),
    )
    .unwrap_err();

    assert_eq!(
        err,
        QueueError::Validation(ValidationError::NoSupportedFiles {
            rejected: vec!["notes.txt".to_string()],
        })
    );
    assert_eq!(queue.len(), 0);
}

#[test]
fn mixed_selection_keeps_supported_files_and_reports_the_rest() {
    init_logging();
    let mut queue = UploadQueue::new();

    let report = queue
        .enqueue(vec![image("a.png"), image("readme.md"), image("b.webp")])
        .unwrap();

    assert_eq!(report.accepted, vec![1, 2]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].name, "readme.md");
    assert_eq!(
        report.rejected[0].reason,
        ValidationError::UnsupportedExtension("readme.md".to_string())
    );
    let names: Vec<_> = queue.items().iter().map(|item| item.name()).collect();
    assert_eq!(names, vec!["a.png", "b.webp"]);
}

#[test]
fn ids_keep_increasing_across_selections() {
    let mut queue = UploadQueue::new();
    queue.enqueue(vec![image("a.png")]).unwrap();
    queue.remove(1).unwrap();
    let report = queue.enqueue(vec![image("b.png")]).unwrap();
    assert_eq!(report.accepted, vec![2]);
}

#[test]
fn failed_transfer_can_be_retried_to_done() {
    init_logging();
    let (mut queue, _) = started_queue(&["cat.png"], 2);
    update(&mut queue, Msg::UploadProgress { item_id: 1, percent: 60 }).unwrap();

    let effects = update(&mut queue, settled(1, false)).unwrap();
    let item = queue.get(1).unwrap();
    assert_eq!(item.status(), ItemStatus::Error);
    assert_eq!(item.progress_percent(), 60);
    assert_eq!(
        item.last_error(),
        Some("GitHub network error: connection reset")
    );
    assert!(item.result_link().is_none());
    assert_eq!(effects.last(), Some(&Effect::BatchSettled));

    let effects = update(&mut queue, Msg::RetryClicked(1)).unwrap();
    let statuses: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ItemChanged(change) => Some((change.status, change.progress_percent)),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![(ItemStatus::Queued, 0), (ItemStatus::Uploading, 0)]
    );
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, Effect::StartUpload(request) if request.item_id == 1)));
    assert_eq!(queue.get(1).unwrap().last_error(), None);

    let effects = update(&mut queue, settled(1, true)).unwrap();
    let item = queue.get(1).unwrap();
    assert_eq!(item.status(), ItemStatus::Done);
    assert_eq!(item.progress_percent(), 100);
    assert_eq!(item.result_link(), Some(&link_for(1)));
    assert_eq!(effects.last(), Some(&Effect::BatchSettled));
}

#[test]
fn retry_is_only_valid_from_error() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png", "b.png", "c.png"], 1);
    update(&mut queue, settled(1, true)).unwrap();
    // 1 done, 2 uploading, 3 queued
    let before = queue.clone();

    for (item_id, from) in [
        (1, ItemStatus::Done),
        (2, ItemStatus::Uploading),
        (3, ItemStatus::Queued),
    ] {
        let err = update(&mut queue, Msg::RetryClicked(item_id)).unwrap_err();
        assert_eq!(
            err,
            QueueError::State(StateError::InvalidTransition {
                item_id,
                from,
                action: Action::Retry,
            })
        );
    }
    assert_eq!(queue, before);
}

#[test]
fn uploading_items_cannot_be_removed() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png", "b.png"], 1);

    let err = queue.remove(1).unwrap_err();
    assert_eq!(
        err,
        StateError::InvalidTransition {
            item_id: 1,
            from: ItemStatus::Uploading,
            action: Action::Remove,
        }
    );
    assert_eq!(queue.len(), 2);
}

#[test]
fn removed_items_are_never_scheduled() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png", "b.png", "c.png"], 1);

    let effects = update(&mut queue, Msg::RemoveClicked(2)).unwrap();
    assert_eq!(effects, vec![Effect::ItemRemoved(2)]);

    let effects = update(&mut queue, settled(1, false)).unwrap();
    let launched: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::StartUpload(request) => Some(request.item_id),
            _ => None,
        })
        .collect();
    assert_eq!(launched, vec![3]);

    // Terminal items can be removed too.
    update(&mut queue, Msg::RemoveClicked(1)).unwrap();
    assert!(queue.get(1).is_none());
    assert!(matches!(
        update(&mut queue, Msg::RemoveClicked(1)),
        Err(QueueError::State(StateError::UnknownItem(1)))
    ));
}

#[test]
fn batch_settled_fires_once_for_simultaneous_completions() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png", "b.png", "c.png"], 3);
    let mut observer = RecordingObserver::default();

    // All three transfers finish in the same tick; the host drains them in turn.
    for msg in [settled(2, true), settled(1, false), settled(3, true)] {
        let effects = update(&mut queue, msg).unwrap();
        notify_observer(&mut observer, &effects);
    }

    assert_eq!(observer.settled, 1);
    assert!(queue.is_quiescent());

    // Nothing else happening afterwards must not signal again.
    let effects = update(&mut queue, Msg::RemoveClicked(1)).unwrap();
    notify_observer(&mut observer, &effects);
    assert_eq!(observer.settled, 1);
    assert_eq!(observer.removed, vec![1]);
}

#[test]
fn each_quiescence_event_gets_its_own_signal() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png"], 2);
    let mut signals = 0;

    let effects = update(&mut queue, settled(1, false)).unwrap();
    signals += effects.iter().filter(|e| **e == Effect::BatchSettled).count();
    update(&mut queue, Msg::RetryClicked(1)).unwrap();
    let effects = update(&mut queue, settled(1, true)).unwrap();
    signals += effects.iter().filter(|e| **e == Effect::BatchSettled).count();

    assert_eq!(signals, 2);
}

#[test]
fn observer_sees_every_transition_and_progress_report() {
    init_logging();
    let (mut queue, start_effects) = started_queue(&["a.png"], 1);
    let mut observer = RecordingObserver::default();
    notify_observer(&mut observer, &start_effects);

    for percent in [10, 5, 40, 90] {
        let effects = update(&mut queue, Msg::UploadProgress { item_id: 1, percent }).unwrap();
        notify_observer(&mut observer, &effects);
    }
    let effects = update(&mut queue, settled(1, true)).unwrap();
    notify_observer(&mut observer, &effects);

    let seen: Vec<_> = observer
        .changes
        .iter()
        .map(|change| (change.status, change.progress_percent))
        .collect();
    assert_eq!(
        seen,
        vec![
            (ItemStatus::Uploading, 0),
            (ItemStatus::Uploading, 10),
            (ItemStatus::Uploading, 40),
            (ItemStatus::Uploading, 90),
            (ItemStatus::Done, 100),
        ]
    );
    let last = observer.changes.last().unwrap();
    assert_eq!(
        last.link.as_ref().map(|link| link.raw_url.as_str()),
        Some("https://raw.example/images/1.png")
    );
    assert_eq!(last.error, None);
    assert_eq!(observer.settled, 1);
}

#[test]
fn settling_an_item_that_is_not_uploading_is_a_state_error() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png", "b.png"], 1);

    let err = update(&mut queue, settled(2, true)).unwrap_err();
    assert_eq!(
        err,
        QueueError::State(StateError::InvalidTransition {
            item_id: 2,
            from: ItemStatus::Queued,
            action: Action::Complete,
        })
    );
    assert_eq!(queue.running_count(), 1);
}

#[test]
fn view_reflects_queue_rows() {
    init_logging();
    let (mut queue, _) = started_queue(&["a.png", "b.png"], 1);
    update(&mut queue, settled(1, false)).unwrap();

    let view = queue.view();
    assert_eq!(view.running, 1);
    assert_eq!(view.concurrency_limit, 1);
    assert_eq!(view.target_directory.as_deref(), Some("images"));
    assert_eq!(view.rows.len(), 2);

    let failed = &view.rows[0];
    assert_eq!(failed.status, ItemStatus::Error);
    assert_eq!(failed.size_label, "2.0 KB");
    assert!(failed.can_retry);
    assert!(failed.can_remove);

    let running = &view.rows[1];
    assert_eq!(running.status, ItemStatus::Uploading);
    assert!(!running.can_retry);
    assert!(!running.can_remove);
}
