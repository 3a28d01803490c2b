//! Application state shared between the caller and the event loop thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::debug;

use propviz_core::commands::ClientCommand;
use propviz_core::state::ClientSnapshot;
use propviz_sim::EngineConfig;

use crate::backend::Backend;
use crate::event_loop;

/// Commands sent to the event loop thread.
#[derive(Debug)]
pub enum LoopCommand {
    /// An operator command to forward to the engine.
    Input(ClientCommand),
    /// Shut down the event loop thread gracefully.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop already running")]
    AlreadyRunning,
    #[error("event loop not started")]
    NotStarted,
    #[error("event loop has stopped")]
    Disconnected,
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("shared state lock poisoned")]
    Poisoned,
}

/// Shared application state. `Send + Sync`, so one instance can serve
/// several input sources.
pub struct AppState {
    /// `None` before `start`.
    command_tx: Mutex<Option<mpsc::Sender<LoopCommand>>>,
    /// Updated by the event loop thread after each step.
    latest_snapshot: Arc<Mutex<Option<ClientSnapshot>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
            thread: Mutex::new(None),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.command_tx.lock().is_ok_and(|tx| tx.is_some())
    }

    /// Spawn the event loop. Snapshots that carry events or notices are
    /// delivered on the returned receiver.
    pub fn start<B>(
        &self,
        config: EngineConfig,
        backend: B,
    ) -> Result<mpsc::Receiver<ClientSnapshot>, AppError>
    where
        B: Backend + Send + 'static,
    {
        let mut tx_lock = self.command_tx.lock().map_err(|_| AppError::Poisoned)?;
        if tx_lock.is_some() {
            return Err(AppError::AlreadyRunning);
        }
        let handle = event_loop::spawn_event_loop(config, backend, self.latest_snapshot.clone())?;
        *tx_lock = Some(handle.commands);
        if let Ok(mut thread) = self.thread.lock() {
            *thread = Some(handle.thread);
        }
        Ok(handle.snapshots)
    }

    pub fn send(&self, command: ClientCommand) -> Result<(), AppError> {
        let tx_lock = self.command_tx.lock().map_err(|_| AppError::Poisoned)?;
        match tx_lock.as_ref() {
            Some(tx) => tx
                .send(LoopCommand::Input(command))
                .map_err(|_| AppError::Disconnected),
            None => Err(AppError::NotStarted),
        }
    }

    pub fn send_all(&self, commands: impl IntoIterator<Item = ClientCommand>) -> Result<(), AppError> {
        commands.into_iter().try_for_each(|c| self.send(c))
    }

    /// Latest snapshot for synchronous polling.
    pub fn snapshot(&self) -> Result<Option<ClientSnapshot>, AppError> {
        let lock = self.latest_snapshot.lock().map_err(|_| AppError::Poisoned)?;
        Ok(lock.clone())
    }

    /// Stop the event loop and wait for it to exit. No-op when not running.
    pub fn stop(&self) -> Result<(), AppError> {
        let tx = self
            .command_tx
            .lock()
            .map_err(|_| AppError::Poisoned)?
            .take();
        let Some(tx) = tx else {
            return Ok(());
        };
        // A send failure means the loop already exited.
        let _ = tx.send(LoopCommand::Shutdown);
        let thread = self.thread.lock().map_err(|_| AppError::Poisoned)?.take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                debug!("event loop thread panicked");
            }
        }
        Ok(())
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
