use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::app::actions::{MutationKind, MutationQueue, MutationRequest};
use crate::model::{CheckId, CheckRecord};
use crate::storage::StorageHandle;

#[derive(Debug, Clone)]
pub enum MutationEvent {
    Applied {
        kind: MutationKind,
        ids: Vec<CheckId>,
        snapshot: Vec<CheckRecord>,
    },
    Failed {
        kind: MutationKind,
        ids: Vec<CheckId>,
        message: String,
    },
}

impl MutationEvent {
    pub fn ids(&self) -> &[CheckId] {
        match self {
            MutationEvent::Applied { ids, .. } | MutationEvent::Failed { ids, .. } => ids,
        }
    }
}

/// Background thread that applies queued mutations in order against storage.
pub struct MutationWorker {
    queue: Option<MutationQueue>,
    events: Receiver<MutationEvent>,
    handle: Option<JoinHandle<()>>,
}

impl MutationWorker {
    pub fn spawn(storage: StorageHandle) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<MutationRequest>();
        let (event_tx, event_rx) = unbounded::<MutationEvent>();
        let handle = thread::Builder::new()
            .name("checklist-mutations".into())
            .spawn(move || run(storage, request_rx, event_tx))
            .context("spawning mutation worker")?;
        Ok(Self {
            queue: Some(MutationQueue::new(request_tx)),
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Handle for issuing mutations. Cloning it is cheap.
    pub fn queue(&self) -> Option<&MutationQueue> {
        self.queue.as_ref()
    }

    pub fn try_recv(&self) -> Option<MutationEvent> {
        self.events.try_recv().ok()
    }

    /// Closes the queue and waits for outstanding requests to finish.
    pub fn shutdown(&mut self) {
        self.queue.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("mutation worker panicked");
            }
        }
    }
}

impl Drop for MutationWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(storage: StorageHandle, requests: Receiver<MutationRequest>, events: Sender<MutationEvent>) {
    for request in requests.iter() {
        let kind = request.kind();
        let ids = request.ids();
        let outcome = request
            .apply(&storage)
            .and_then(|()| storage.fetch_checks());
        let event = match outcome {
            Ok(snapshot) => {
                tracing::info!(%kind, count = ids.len(), "mutation applied");
                MutationEvent::Applied {
                    kind,
                    ids,
                    snapshot,
                }
            }
            Err(err) => {
                tracing::error!(?err, %kind, "mutation failed");
                MutationEvent::Failed {
                    kind,
                    ids,
                    message: format!("{err:#}"),
                }
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("mutation worker stopped");
}
