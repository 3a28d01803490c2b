//! Event loop thread: owns the client engine and steps it on input,
//! backend replies and playback deadlines.
//!
//! The engine is created inside this thread and never leaves it. Operator
//! commands arrive on an `mpsc` channel. Backend requests are handed to a
//! separate network worker so a slow backend never delays pointer input or
//! playback ticks; replies come back on their own channel.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use propviz_core::constants::FRAME_INTERVAL_MS;
use propviz_core::state::ClientSnapshot;
use propviz_sim::{BackendReply, BackendRequest, ClientEngine, EngineConfig};

use crate::backend::{execute, Backend};
use crate::state::LoopCommand;

/// Longest the loop sleeps when no deadline is pending.
const FRAME_INTERVAL: Duration = Duration::from_millis(FRAME_INTERVAL_MS);

pub struct LoopHandle {
    pub commands: mpsc::Sender<LoopCommand>,
    /// Snapshots carrying events or notices.
    pub snapshots: mpsc::Receiver<ClientSnapshot>,
    pub thread: JoinHandle<()>,
}

/// Spawns the event loop and its network worker.
pub fn spawn_event_loop<B>(
    config: EngineConfig,
    backend: B,
    latest_snapshot: Arc<Mutex<Option<ClientSnapshot>>>,
) -> io::Result<LoopHandle>
where
    B: Backend + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel::<LoopCommand>();
    let (req_tx, req_rx) = mpsc::channel::<BackendRequest>();
    let (reply_tx, reply_rx) = mpsc::channel::<BackendReply>();
    let (snap_tx, snap_rx) = mpsc::channel::<ClientSnapshot>();

    std::thread::Builder::new()
        .name("propviz-network".into())
        .spawn(move || run_network_worker(backend, req_rx, reply_tx))?;

    let thread = std::thread::Builder::new()
        .name("propviz-event-loop".into())
        .spawn(move || {
            let channels = LoopChannels {
                commands: cmd_rx,
                requests: req_tx,
                replies: reply_rx,
                snapshots: snap_tx,
            };
            run_event_loop(config, channels, &latest_snapshot);
        })?;

    Ok(LoopHandle {
        commands: cmd_tx,
        snapshots: snap_rx,
        thread,
    })
}

/// Serves requests in order until the event loop drops its sender.
fn run_network_worker<B: Backend>(
    backend: B,
    requests: mpsc::Receiver<BackendRequest>,
    replies: mpsc::Sender<BackendReply>,
) {
    for request in requests {
        let reply = execute(&backend, request);
        if replies.send(reply).is_err() {
            break;
        }
    }
    debug!("network worker exiting");
}

struct LoopChannels {
    commands: mpsc::Receiver<LoopCommand>,
    requests: mpsc::Sender<BackendRequest>,
    replies: mpsc::Receiver<BackendReply>,
    snapshots: mpsc::Sender<ClientSnapshot>,
}

/// The event loop. Runs until Shutdown or channel disconnect.
fn run_event_loop(
    config: EngineConfig,
    channels: LoopChannels,
    latest_snapshot: &Mutex<Option<ClientSnapshot>>,
) {
    let mut engine = ClientEngine::new(config);
    info!(mode = ?engine.mode(), "event loop started");

    loop {
        // 1. Drain pending commands
        loop {
            match channels.commands.try_recv() {
                Ok(LoopCommand::Input(cmd)) => engine.queue_command(cmd),
                Ok(LoopCommand::Shutdown) => return,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }

        // 2. Apply backend replies in arrival order
        while let Ok(reply) = channels.replies.try_recv() {
            engine.apply_reply(reply);
        }

        // 3. Step: commands, due playback tick, rendering
        let snapshot = engine.step(Instant::now());

        // 4. Hand new backend requests to the network worker
        for request in engine.take_requests() {
            if channels.requests.send(request).is_err() {
                warn!("network worker is gone");
                return;
            }
        }

        // 5. Publish; the polling slot is updated before listeners hear of it
        let notify = !snapshot.events.is_empty() || !snapshot.notices.is_empty();
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot.clone());
        }
        if notify {
            // Nobody listening is fine; polling still works.
            let _ = channels.snapshots.send(snapshot);
        }

        // 6. Sleep until the next command, the playback deadline or a frame
        let wait = engine.next_wakeup().map_or(FRAME_INTERVAL, |due| {
            due.saturating_duration_since(Instant::now()).min(FRAME_INTERVAL)
        });
        match channels.commands.recv_timeout(wait) {
            Ok(LoopCommand::Input(cmd)) => engine.queue_command(cmd),
            Ok(LoopCommand::Shutdown) => return,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propviz_core::commands::ClientCommand;
    use propviz_core::enums::EntityKind;
    use propviz_core::events::ClientEvent;
    use propviz_core::types::{Entity, Position, Scene};

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// The loop thread with every channel end held by the test.
    struct Harness {
        commands: mpsc::Sender<LoopCommand>,
        requests: mpsc::Receiver<BackendRequest>,
        replies: mpsc::Sender<BackendReply>,
        snapshots: mpsc::Receiver<ClientSnapshot>,
        latest: Arc<Mutex<Option<ClientSnapshot>>>,
        thread: JoinHandle<()>,
    }

    fn harness() -> Harness {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (req_tx, req_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let (snap_tx, snap_rx) = mpsc::channel();
        let latest: Arc<Mutex<Option<ClientSnapshot>>> = Arc::new(Mutex::new(None));
        let slot = latest.clone();
        let thread = std::thread::spawn(move || {
            let channels = LoopChannels {
                commands: cmd_rx,
                requests: req_tx,
                replies: reply_rx,
                snapshots: snap_tx,
            };
            run_event_loop(EngineConfig::default(), channels, &slot);
        });
        Harness {
            commands: cmd_tx,
            requests: req_rx,
            replies: reply_tx,
            snapshots: snap_rx,
            latest,
            thread,
        }
    }

    fn one_entity_scene() -> Scene {
        let mut scene = Scene::default();
        scene.entities = vec![Entity::new("fm1", EntityKind::Transmitter, Position::grid(5.0, 5.0))];
        scene
    }

    #[test]
    fn test_reply_applied_on_next_step() {
        let h = harness();
        h.replies
            .send(BackendReply::Scene(Ok(one_entity_scene())))
            .unwrap();

        let snapshot = h.snapshots.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(snapshot.events, vec![ClientEvent::SceneLoaded { entities: 1 }]);
        assert!(snapshot.scene.unwrap().find("fm1").is_some());

        let stored = h.latest.lock().unwrap().clone().unwrap();
        assert!(stored.step >= snapshot.step);
        assert!(stored.scene.is_some());

        h.commands.send(LoopCommand::Shutdown).unwrap();
        h.thread.join().unwrap();
    }

    #[test]
    fn test_requests_forwarded_to_worker() {
        let h = harness();
        h.commands
            .send(LoopCommand::Input(ClientCommand::Refresh))
            .unwrap();
        assert_eq!(
            h.requests.recv_timeout(TIMEOUT).unwrap(),
            BackendRequest::FetchScene
        );
        assert_eq!(
            h.requests.recv_timeout(TIMEOUT).unwrap(),
            BackendRequest::FetchStats
        );
        h.commands.send(LoopCommand::Shutdown).unwrap();
        h.thread.join().unwrap();
    }

    #[test]
    fn test_shutdown_joins_cleanly() {
        let h = harness();
        h.commands.send(LoopCommand::Shutdown).unwrap();
        h.thread.join().unwrap();
        // The loop dropped its receiving end on exit
        assert!(h
            .commands
            .send(LoopCommand::Input(ClientCommand::Refresh))
            .is_err());
    }

    #[test]
    fn test_worker_disconnect_ends_loop() {
        let h = harness();
        drop(h.requests);
        // Refresh issues a scene fetch that can no longer be handed off
        h.commands
            .send(LoopCommand::Input(ClientCommand::Refresh))
            .unwrap();
        h.thread.join().unwrap();
        assert!(h
            .commands
            .send(LoopCommand::Input(ClientCommand::ToggleLines))
            .is_err());
    }
}
