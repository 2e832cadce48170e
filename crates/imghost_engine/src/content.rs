use std::sync::mpsc;

use futures_util::StreamExt;
use tokio_util::io::ReaderStream;

use crate::{EngineEvent, ItemId, TransferError, TransferErrorKind, UploadProgress, UploadSource};

/// Reading the source maps onto `1..=READ_PROGRESS_CEILING` percent; the rest
/// is reserved for the store write, which has no granular progress.
pub const READ_PROGRESS_CEILING: u8 = 90;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Loads the bytes of an upload, emitting monotonic progress as chunks arrive.
pub async fn read_source(
    item_id: ItemId,
    source: &UploadSource,
    size_hint: u64,
    sink: &dyn ProgressSink,
) -> Result<Vec<u8>, TransferError> {
    match source {
        UploadSource::Memory(bytes) => {
            emit(sink, item_id, READ_PROGRESS_CEILING);
            Ok(bytes.clone())
        }
        UploadSource::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|err| io_error(path, err))?;
            let total = match file.metadata().await {
                Ok(meta) => meta.len(),
                Err(_) => size_hint,
            };

            let mut bytes = Vec::with_capacity(total as usize);
            let mut last_percent = 1;
            emit(sink, item_id, last_percent);
            let mut stream = ReaderStream::new(file);
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|err| io_error(path, err))?;
                bytes.extend_from_slice(&chunk);
                let percent = read_percent(bytes.len() as u64, total);
                if percent > last_percent {
                    last_percent = percent;
                    emit(sink, item_id, percent);
                }
            }
            if last_percent < READ_PROGRESS_CEILING {
                emit(sink, item_id, READ_PROGRESS_CEILING);
            }
            Ok(bytes)
        }
    }
}

fn read_percent(read: u64, total: u64) -> u8 {
    if total == 0 {
        return READ_PROGRESS_CEILING;
    }
    let scaled = read.min(total) * u64::from(READ_PROGRESS_CEILING) / total;
    scaled.max(1) as u8
}

fn emit(sink: &dyn ProgressSink, item_id: ItemId, percent: u8) {
    sink.emit(EngineEvent::Progress(UploadProgress { item_id, percent }));
}

fn io_error(path: &std::path::Path, err: std::io::Error) -> TransferError {
    TransferError::new(
        TransferErrorKind::Io,
        format!("could not read {}: {}", path.display(), err),
    )
}
