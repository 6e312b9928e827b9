//! Debounced autosave
//!
//! Coalesces rapid edits into a single save after a quiet period:
//! - every `schedule()` bumps a generation counter and spawns a timer task
//! - when a timer fires it saves only if no newer generation arrived
//! - `force_save()` supersedes all pending timers and writes immediately
//! - `cancel()` supersedes pending timers without writing
//!
//! Saves snapshot the document under its mutex, then write outside it, so
//! commands never wait on disk. A failed save keeps the in-memory document as
//! is, records the error and is retried by the next scheduled save.

use crate::document::SharedDocument;
use crate::error::OutlineResult;
use crate::services::DocumentStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Handle to a document's debounced save task
#[derive(Clone)]
pub struct Autosave {
    inner: Arc<AutosaveInner>,
}

struct AutosaveInner {
    document: SharedDocument,
    store: Arc<dyn DocumentStore>,
    debounce: Duration,
    generation: AtomicU64,
    saves: AtomicU64,
    last_error: Mutex<Option<String>>,
    // Serializes writes so a forced save never interleaves with a timed one
    write_lock: tokio::sync::Mutex<()>,
}

impl Autosave {
    pub fn new(document: SharedDocument, store: Arc<dyn DocumentStore>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(AutosaveInner {
                document,
                store,
                debounce,
                generation: AtomicU64::new(0),
                saves: AtomicU64::new(0),
                last_error: Mutex::new(None),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Debounce taken from the document's own configuration
    pub fn for_document(document: SharedDocument, store: Arc<dyn DocumentStore>) -> Self {
        let debounce = document.lock().config().autosave_debounce();
        Self::new(document, store, debounce)
    }

    /// Request a save after the quiet period; supersedes earlier requests
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("Autosave generation {} superseded", generation);
                return;
            }
            let _ = inner.save().await;
        });
    }

    /// Drop any pending save
    pub fn cancel(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Cancel pending saves and write now
    pub async fn force_save(&self) -> OutlineResult<()> {
        self.cancel();
        self.inner.save().await
    }

    /// Message of the most recent failed save, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// Spawn a task that schedules a save for every persistence-relevant
    /// document event until shut down
    pub fn spawn_watcher(&self) -> AutosaveWatcher {
        let mut events = self.inner.document.lock().subscribe();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let autosave = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased; // Check shutdown first

                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Autosave watcher shutting down");
                        break;
                    }

                    event = events.recv() => match event {
                        Ok(event) if event.affects_persistence() => autosave.schedule(),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!("Autosave watcher lagged by {} event(s)", skipped);
                            autosave.schedule();
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        AutosaveWatcher {
            shutdown_tx,
            handle,
        }
    }
}

impl AutosaveInner {
    async fn save(&self) -> OutlineResult<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let document = self.document.lock();
            document.snapshot()
        };
        match self.store.save(&snapshot).await {
            Ok(()) => {
                self.saves.fetch_add(1, Ordering::SeqCst);
                *self.last_error.lock() = None;
                tracing::info!("Outline saved");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Autosave failed, will retry on next change: {}", e);
                *self.last_error.lock() = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// Running event watcher; see [`Autosave::spawn_watcher`]
pub struct AutosaveWatcher {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl AutosaveWatcher {
    /// Stop watching and wait for the task to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}
