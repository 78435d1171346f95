use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tokio::task::JoinHandle;

use lightline_core::player::ConnectionId;
use lightline_core::room::normalize_room_name;
use lightline_sim::SimConfig;

use crate::config::LimitsConfig;
use crate::game_loop::{RoomChannels, RoomCommand, RoomStatus, spawn_room};

/// What a connection gets back from [`RoomManager::join`].
pub struct JoinTicket {
    pub room: String,
    pub connection_id: ConnectionId,
    /// Connections already in the room before this one.
    pub peers: usize,
    pub channels: RoomChannels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    InvalidName,
    TooManyRooms,
    RoomFull,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "invalid room name"),
            Self::TooManyRooms => write!(f, "room limit reached"),
            Self::RoomFull => write!(f, "room is full"),
        }
    }
}

impl std::error::Error for JoinError {}

/// Public view of one room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub name: String,
    #[serde(flatten)]
    pub status: RoomStatus,
}

struct RoomEntry {
    channels: RoomChannels,
    task: JoinHandle<()>,
    connections: BTreeSet<ConnectionId>,
}

impl RoomEntry {
    fn summary(&self, name: &str) -> RoomSummary {
        RoomSummary {
            name: name.to_string(),
            status: self.channels.status.borrow().clone(),
        }
    }
}

/// Named rooms, each backed by its own tick loop task.
pub struct RoomManager {
    rooms: BTreeMap<String, RoomEntry>,
    next_connection_id: ConnectionId,
    sim: SimConfig,
    max_rooms: usize,
    max_room_connections: usize,
}

impl RoomManager {
    pub fn new(sim: SimConfig, limits: &LimitsConfig) -> Self {
        Self {
            rooms: BTreeMap::new(),
            next_connection_id: 1,
            sim,
            max_rooms: limits.max_rooms,
            max_room_connections: limits.max_room_connections,
        }
    }

    /// Reserve a connection in the named room, creating the room and its
    /// simulation on first join.
    pub fn join(&mut self, raw_name: &str) -> Result<JoinTicket, JoinError> {
        let name = normalize_room_name(raw_name).ok_or(JoinError::InvalidName)?;
        self.reap_finished();

        if !self.rooms.contains_key(&name) {
            if self.rooms.len() >= self.max_rooms {
                return Err(JoinError::TooManyRooms);
            }
            let (channels, task) = spawn_room(name.clone(), self.sim.clone());
            tracing::info!(room = %name, "Room created");
            self.rooms.insert(
                name.clone(),
                RoomEntry {
                    channels,
                    task,
                    connections: BTreeSet::new(),
                },
            );
        }
        let Some(entry) = self.rooms.get_mut(&name) else {
            return Err(JoinError::InvalidName);
        };
        if entry.connections.len() >= self.max_room_connections {
            return Err(JoinError::RoomFull);
        }

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;
        let peers = entry.connections.len();
        entry.connections.insert(connection_id);
        Ok(JoinTicket {
            room: name,
            connection_id,
            peers,
            channels: entry.channels.clone(),
        })
    }

    /// Release a connection. Releasing the last reserved connection stops
    /// the room's loop and drops the entry.
    pub fn leave(&mut self, room: &str, connection_id: ConnectionId) {
        let Some(entry) = self.rooms.get_mut(room) else {
            return;
        };
        if !entry.connections.remove(&connection_id) {
            return;
        }
        let _ = entry
            .channels
            .commands
            .send(RoomCommand::Disconnect { connection_id });
        if entry.connections.is_empty() {
            let _ = entry.channels.commands.send(RoomCommand::Stop);
            self.rooms.remove(room);
            tracing::info!(room, "Room closed");
        }
    }

    /// Forward a command to a live room. Returns false if there is none.
    pub fn command(&self, room: &str, command: RoomCommand) -> bool {
        self.rooms
            .get(room)
            .filter(|e| !e.task.is_finished())
            .is_some_and(|e| e.channels.commands.send(command).is_ok())
    }

    pub fn room(&self, name: &str) -> Option<RoomSummary> {
        let name = normalize_room_name(name)?;
        self.rooms
            .get(&name)
            .filter(|e| !e.task.is_finished())
            .map(|e| e.summary(&name))
    }

    pub fn list(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .filter(|(_, e)| !e.task.is_finished())
            .map(|(name, e)| e.summary(name))
            .collect()
    }

    /// (live rooms, reserved connections)
    pub fn stats(&self) -> (usize, usize) {
        self.rooms
            .values()
            .filter(|e| !e.task.is_finished())
            .fold((0, 0), |(rooms, conns), e| (rooms + 1, conns + e.connections.len()))
    }

    /// Forget rooms whose loop was stopped from outside.
    fn reap_finished(&mut self) {
        self.rooms.retain(|name, e| {
            let live = !e.task.is_finished();
            if !live {
                tracing::debug!(room = %name, "Reaped stopped room");
            }
            live
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager() -> RoomManager {
        RoomManager::new(SimConfig::default(), &LimitsConfig::default())
    }

    #[tokio::test]
    async fn first_join_creates_room() {
        let mut rooms = manager();
        let a = rooms.join("Arena").unwrap();
        assert_eq!(a.room, "arena");
        assert_eq!(a.peers, 0);

        let b = rooms.join("arena").unwrap();
        assert_eq!(b.peers, 1);
        assert_ne!(a.connection_id, b.connection_id);
        assert_eq!(rooms.stats(), (1, 2));
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let mut rooms = manager();
        assert_eq!(rooms.join("no spaces").err(), Some(JoinError::InvalidName));
        assert_eq!(rooms.join("").err(), Some(JoinError::InvalidName));
        assert!(rooms.list().is_empty());
    }

    #[tokio::test]
    async fn limits_are_enforced() {
        let limits = LimitsConfig {
            max_rooms: 1,
            max_room_connections: 1,
            ..LimitsConfig::default()
        };
        let mut rooms = RoomManager::new(SimConfig::default(), &limits);
        rooms.join("one").unwrap();
        assert_eq!(rooms.join("one").err(), Some(JoinError::RoomFull));
        assert_eq!(rooms.join("two").err(), Some(JoinError::TooManyRooms));
    }

    #[tokio::test]
    async fn leaving_last_connection_closes_room() {
        let mut rooms = manager();
        let a = rooms.join("solo").unwrap();
        let commands = a.channels.commands.clone();
        rooms.leave("solo", a.connection_id);
        assert!(rooms.room("solo").is_none());
        assert_eq!(rooms.stats(), (0, 0));
        for _ in 0..100 {
            if commands.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(commands.is_closed(), "room loop should have stopped");

        // Unknown ids are ignored.
        rooms.leave("solo", 999);
    }

    #[tokio::test]
    async fn room_stays_up_while_a_reservation_is_pending() {
        let mut rooms = manager();
        let first = rooms.join("relay").unwrap();
        let second = rooms.join("relay").unwrap();

        // The first connection leaves before the second has attached.
        rooms.leave("relay", first.connection_id);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rooms.room("relay").is_some());
        assert!(!second.channels.commands.is_closed());

        rooms.leave("relay", second.connection_id);
        assert!(rooms.room("relay").is_none());
    }

    #[tokio::test]
    async fn stopped_room_is_reaped_on_next_join() {
        let mut rooms = manager();
        let first = rooms.join("halt").unwrap();
        assert!(rooms.command("halt", RoomCommand::Stop));
        for _ in 0..100 {
            if rooms.room("halt").is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(rooms.room("halt").is_none());
        assert!(!rooms.command("halt", RoomCommand::Pause));

        let second = rooms.join("halt").unwrap();
        assert_eq!(second.peers, 0);
        assert_ne!(first.connection_id, second.connection_id);
    }
}
