use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use imghost_logging::{imghost_debug, imghost_warn};

use crate::content::{read_source, ChannelProgressSink, ProgressSink};
use crate::store::ContentStore;
use crate::{EngineEvent, RemoteLink, TransferError, UploadJob};

enum EngineCommand {
    Upload(UploadJob),
}

/// Runs uploads on a background tokio runtime and hands events back over a
/// channel, so the caller can stay single threaded.
pub struct UploadEngine {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl UploadEngine {
    pub fn new(store: Arc<dyn ContentStore>) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("imghost-engine")
            .build()?;

        thread::Builder::new()
            .name("imghost-dispatch".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let store = store.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(store.as_ref(), command, event_tx).await;
                    });
                }
                imghost_debug!("upload engine shutting down");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, job: UploadJob) {
        let item_id = job.item_id;
        if self.cmd_tx.send(EngineCommand::Upload(job)).is_err() {
            imghost_warn!("upload engine stopped; dropped job for item {}", item_id);
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks for the next event, up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    store: &dyn ContentStore,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Upload(job) => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let item_id = job.item_id;
            let result = run_upload(store, &job, &sink).await;
            if let Err(err) = &result {
                imghost_warn!("upload of {} failed ({}): {}", job.filename, err.kind, err);
            }
            let _ = event_tx.send(EngineEvent::UploadCompleted { item_id, result });
        }
    }
}

async fn run_upload(
    store: &dyn ContentStore,
    job: &UploadJob,
    sink: &dyn ProgressSink,
) -> Result<RemoteLink, TransferError> {
    let bytes = read_source(job.item_id, &job.source, job.size_hint, sink).await?;
    imghost_debug!(
        "item {}: read {} bytes for {}",
        job.item_id,
        bytes.len(),
        job.filename
    );
    store
        .put_file(&job.target_dir, &job.filename, &bytes, &job.commit_message)
        .await
}
