use std::sync::Arc;
use std::time::Duration;

use imghost_core::{notify_observer, ContentSource, Effect, Msg, QueueObserver, UploadLink, UploadRequest};
use imghost_engine::{ContentStore, EngineEvent, UploadEngine, UploadJob, UploadSource};
use imghost_logging::{imghost_info, imghost_warn};

/// Carries effects out: launches go to the engine, the rest to the observer.
pub struct EffectRunner {
    engine: UploadEngine,
}

impl EffectRunner {
    pub fn new(store: Arc<dyn ContentStore>) -> std::io::Result<Self> {
        Ok(Self {
            engine: UploadEngine::new(store)?,
        })
    }

    pub fn run(&self, effects: Vec<Effect>, observer: &mut dyn QueueObserver) {
        notify_observer(observer, &effects);
        for effect in effects {
            if let Effect::StartUpload(request) = effect {
                imghost_info!(
                    "StartUpload item_id={} name={} dir={} size={}",
                    request.item_id,
                    request.filename,
                    request.target_dir,
                    request.size_bytes
                );
                self.engine.submit(to_job(request));
            }
        }
    }

    /// Next engine event as a queue message, waiting up to `timeout`.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(to_msg)
    }
}

fn to_job(request: UploadRequest) -> UploadJob {
    UploadJob {
        item_id: request.item_id,
        target_dir: request.target_dir,
        filename: request.filename,
        size_hint: request.size_bytes,
        source: match request.source {
            ContentSource::File(path) => UploadSource::File(path),
            ContentSource::Memory(bytes) => UploadSource::Memory(bytes.to_vec()),
        },
        commit_message: request.commit_message,
    }
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress(progress) => Msg::UploadProgress {
            item_id: progress.item_id,
            percent: progress.percent,
        },
        EngineEvent::UploadCompleted { item_id, result } => Msg::UploadSettled {
            item_id,
            outcome: match result {
                Ok(link) => Ok(UploadLink::new(link.path, link.raw_url, link.web_url)),
                Err(err) => {
                    imghost_warn!("Upload {} failed: {} ({})", item_id, err, err.kind);
                    Err(err.to_string())
                }
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imghost_engine::{RemoteLink, TransferError, TransferErrorKind, UploadProgress};
    use pretty_assertions::assert_eq;

    #[test]
    fn requests_become_jobs() {
        let request = UploadRequest {
            item_id: 4,
            target_dir: "images".to_string(),
            filename: "cat.png".to_string(),
            size_bytes: 3,
            source: ContentSource::Memory(Arc::from(vec![1u8, 2, 3])),
            commit_message: "feat: upload cat.png".to_string(),
        };

        let job = to_job(request);

        assert_eq!(job.item_id, 4);
        assert_eq!(job.size_hint, 3);
        assert_eq!(job.source, UploadSource::Memory(vec![1, 2, 3]));
        assert_eq!(job.commit_message, "feat: upload cat.png");
    }

    #[test]
    fn events_become_messages() {
        assert_eq!(
            to_msg(EngineEvent::Progress(UploadProgress {
                item_id: 2,
                percent: 45
            })),
            Msg::UploadProgress {
                item_id: 2,
                percent: 45
            }
        );
        assert_eq!(
            to_msg(EngineEvent::UploadCompleted {
                item_id: 2,
                result: Ok(RemoteLink {
                    path: "images/cat-1.png".to_string(),
                    raw_url: "https://raw.example/images/cat-1.png".to_string(),
                    web_url: "https://web.example/images/cat-1.png".to_string(),
                }),
            }),
            Msg::UploadSettled {
                item_id: 2,
                outcome: Ok(UploadLink::new(
                    "images/cat-1.png",
                    "https://raw.example/images/cat-1.png",
                    "https://web.example/images/cat-1.png",
                )),
            }
        );
        assert_eq!(
            to_msg(EngineEvent::UploadCompleted {
                item_id: 3,
                result: Err(TransferError {
                    kind: TransferErrorKind::RateLimited,
                    message: "GitHub 403: API rate limit exceeded".to_string(),
                }),
            }),
            Msg::UploadSettled {
                item_id: 3,
                outcome: Err("GitHub 403: API rate limit exceeded".to_string()),
            }
        );
    }
}
