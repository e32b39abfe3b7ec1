use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::SessionController;

/// Background thread that calls [`SessionController::tick`] on a fixed poll
/// period. The controller decides whether a save is actually due, so the poll
/// period only bounds how late a save can be.
///
/// The thread stops when [`AutoSaver::stop`] is called or the saver is
/// dropped.
pub struct AutoSaver {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AutoSaver {
    pub fn spawn(controller: Arc<Mutex<SessionController>>, poll: Duration) -> Self {
        let (shutdown, receiver) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                match receiver.recv_timeout(poll) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut guard = match controller.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => {
                                warn!("Session controller lock poisoned, auto-saving anyway");
                                poisoned.into_inner()
                            }
                        };
                        if guard.tick() {
                            debug!("Auto-save tick saved the session");
                        }
                    }
                    // Stop requested or the saver was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Auto-save thread panicked");
            }
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
