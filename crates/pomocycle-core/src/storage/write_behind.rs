//! Fire-and-forget wrapper around a [`KvStore`].
//!
//! The wrapped store lives on a dedicated writer thread. `set` queues the
//! write and returns at once, so a slow disk never stalls the tick driver.
//! A failed write is logged by the worker and handed back to the caller as
//! the result of the next `set`.

use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::KvStore;
use crate::error::PersistenceError;

type Reply<T> = mpsc::Sender<Result<T, PersistenceError>>;

enum StoreCommand {
    Set { key: String, value: String },
    Get { key: String, reply: Reply<Option<String>> },
    Flush { reply: Reply<()> },
    Shutdown,
}

pub struct WriteBehindStore {
    sender: mpsc::Sender<StoreCommand>,
    last_failure: Arc<Mutex<Option<PersistenceError>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteBehindStore {
    /// Move `store` onto a writer thread.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<S>(store: S) -> Result<Self, PersistenceError>
    where
        S: KvStore + 'static,
    {
        let (sender, receiver) = mpsc::channel::<StoreCommand>();
        let last_failure = Arc::new(Mutex::new(None));
        let failure_slot = last_failure.clone();

        let worker = thread::Builder::new()
            .name("pomocycle-store".into())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        StoreCommand::Set { key, value } => {
                            if let Err(err) = store.set(&key, &value) {
                                tracing::warn!(key = %key, error = %err, "queued write failed");
                                *lock(&failure_slot) = Some(err);
                            }
                        }
                        StoreCommand::Get { key, reply } => {
                            let _ = reply.send(store.get(&key));
                        }
                        StoreCommand::Flush { reply } => {
                            let _ = reply.send(Ok(()));
                        }
                        StoreCommand::Shutdown => break,
                    }
                }
                tracing::debug!("store writer thread shutting down");
            })
            .map_err(|e| PersistenceError::Unavailable(format!("failed to spawn writer: {e}")))?;

        Ok(Self {
            sender,
            last_failure,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Block until every queued write has been handed to the inner store.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let (reply, wait) = mpsc::channel();
        self.send(StoreCommand::Flush { reply })?;
        wait.recv().map_err(|_| worker_gone())??;
        match lock(&self.last_failure).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn send(&self, command: StoreCommand) -> Result<(), PersistenceError> {
        self.sender.send(command).map_err(|_| worker_gone())
    }
}

impl KvStore for WriteBehindStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let (reply, wait) = mpsc::channel();
        self.send(StoreCommand::Get {
            key: key.to_string(),
            reply,
        })?;
        wait.recv().map_err(|_| worker_gone())?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let previous = lock(&self.last_failure).take();

        self.send(StoreCommand::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
        .map_err(|_| PersistenceError::write(key, "store writer stopped"))?;

        match previous {
            Some(previous) => Err(previous),
            None => Ok(()),
        }
    }
}

impl Drop for WriteBehindStore {
    fn drop(&mut self) {
        let mut guard = lock(&self.worker);
        if let Some(handle) = guard.take() {
            if self.sender.send(StoreCommand::Shutdown).is_err() {
                tracing::error!("failed to send shutdown to store writer");
            }
            if let Err(err) = handle.join() {
                tracing::error!("failed to join store writer: {err:?}");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn worker_gone() -> PersistenceError {
    PersistenceError::Unavailable("store writer thread terminated".into())
}
