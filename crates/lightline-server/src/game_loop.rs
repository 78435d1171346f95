use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use lightline_core::net::actions::{ClientAction, ServerAction};
use lightline_core::net::connection::Connection;
use lightline_core::player::{ConnectionId, PlayerInfo};
use lightline_core::room::RoomPhase;
use lightline_core::time::TickClock;
use lightline_sim::{SimConfig, Simulation};

/// Commands sent from connection handlers and the API to a room's tick loop.
pub enum RoomCommand {
    /// Attach an observer. It is sent the lobby roster straight away.
    Connect(Box<dyn Connection<ServerAction>>),
    Disconnect {
        connection_id: ConnectionId,
    },
    Pause,
    Resume,
    Stop,
}

/// Published after every wake-up of a room loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomStatus {
    pub phase: RoomPhase,
    pub round: u32,
    pub tick: u64,
    pub paused: bool,
    pub connections: usize,
    pub players: Vec<PlayerInfo>,
}

impl RoomStatus {
    fn capture(sim: &Simulation, clock: &TickClock) -> Self {
        Self {
            phase: sim.phase(),
            round: sim.round().map_or(0, |r| r.number),
            tick: sim.round().map_or(0, |r| r.tick),
            paused: clock.is_paused(),
            connections: sim.observer_count(),
            players: sim.players().map(|p| p.info()).collect(),
        }
    }
}

impl Default for RoomStatus {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Lobby,
            round: 0,
            tick: 0,
            paused: false,
            connections: 0,
            players: Vec::new(),
        }
    }
}

/// Handles for talking to a running room loop.
#[derive(Clone)]
pub struct RoomChannels {
    pub commands: mpsc::UnboundedSender<RoomCommand>,
    /// Inbound client actions, tagged with their connection id.
    pub actions: mpsc::UnboundedSender<(ConnectionId, ClientAction)>,
    pub status: watch::Receiver<RoomStatus>,
}

/// Spawn a room's tick loop as a tokio task. The task owns the
/// [`Simulation`]; nothing else touches it.
pub fn spawn_room(name: String, config: SimConfig) -> (RoomChannels, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(RoomStatus::default());
    let sim = Simulation::new(config);

    let handle = tokio::spawn(async move {
        run_room_loop(name, sim, cmd_rx, action_rx, status_tx).await;
    });

    (
        RoomChannels {
            commands: cmd_tx,
            actions: action_tx,
            status: status_rx,
        },
        handle,
    )
}

/// Commands and actions are applied between ticks. Each wake-up runs
/// every tick that has come due, then sleeps until the next boundary.
/// The loop ends on `Stop` or once every command sender is gone; the
/// room manager sends `Stop` when it releases the last reserved
/// connection.
async fn run_room_loop(
    name: String,
    mut sim: Simulation,
    mut cmd_rx: mpsc::UnboundedReceiver<RoomCommand>,
    mut action_rx: mpsc::UnboundedReceiver<(ConnectionId, ClientAction)>,
    status_tx: watch::Sender<RoomStatus>,
) {
    let origin = Instant::now();
    let mut clock = TickClock::new(sim.config().tick_rate, Duration::ZERO);
    tracing::info!(room = %name, tick_rate = clock.tick_rate(), "Room loop started");

    loop {
        let deadline = origin + clock.next_deadline();
        tokio::select! {
            biased;
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(RoomCommand::Connect(connection)) => sim.add_observer(connection),
                    Some(RoomCommand::Disconnect { connection_id }) => {
                        sim.remove_connection(connection_id);
                    },
                    Some(RoomCommand::Pause) => {
                        clock.pause(origin.elapsed());
                        tracing::info!(room = %name, "Room paused");
                    },
                    Some(RoomCommand::Resume) => {
                        clock.resume(origin.elapsed());
                        tracing::info!(room = %name, "Room resumed");
                    },
                    Some(RoomCommand::Stop) | None => break,
                }
            }
            Some((from, action)) = action_rx.recv() => {
                if clock.is_paused() && matches!(action, ClientAction::Rotate { .. }) {
                    tracing::debug!(room = %name, from, "Dropped ROTATE while paused");
                } else {
                    sim.handle_action(from, action);
                }
            }
            _ = tokio::time::sleep_until(deadline), if !clock.is_paused() => {
                let due = clock.advance(origin.elapsed());
                for _ in 0..due {
                    sim.tick();
                }
                if due > 1 {
                    tracing::debug!(room = %name, due, "Ran late ticks back to back");
                }
            }
        }

        let next = RoomStatus::capture(&sim, &clock);
        status_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    sim.close_observers();
    tracing::info!(room = %name, ticks = clock.ticks(), "Room loop stopped");
}
