pub mod net;
pub mod player;
pub mod powerup;
pub mod room;
pub mod time;
pub mod trail;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use crate::net::actions::ServerAction;
    use crate::net::connection::{ActionSink, LocalConnection, local};
    use crate::player::{ConnectionId, Player, PlayerColor, PlayerId};

    /// Players `1..=n`, each bound to the connection with the same id.
    pub fn make_players(n: usize) -> BTreeMap<PlayerId, Player> {
        (1..=n as u64)
            .map(|id| {
                (
                    id,
                    Player {
                        id,
                        name: format!("Player{id}"),
                        color: PlayerColor::for_index(id as usize - 1),
                        connection_id: id,
                        score: 0,
                    },
                )
            })
            .collect()
    }

    /// Sink that keeps every delivered action for later inspection.
    pub struct RecordingSink<A> {
        received: Mutex<Vec<A>>,
    }

    impl<A> Default for RecordingSink<A> {
        fn default() -> Self {
            Self {
                received: Mutex::new(Vec::new()),
            }
        }
    }

    impl<A: Clone> RecordingSink<A> {
        pub fn new() -> Self {
            Self::default()
        }

        /// Copy of everything received so far.
        pub fn actions(&self) -> Vec<A> {
            self.received.lock().map(|v| v.clone()).unwrap_or_default()
        }

        /// Remove and return everything received so far.
        pub fn take(&self) -> Vec<A> {
            self.received
                .lock()
                .map(|mut v| std::mem::take(&mut *v))
                .unwrap_or_default()
        }
    }

    impl<A: Send> ActionSink<A> for RecordingSink<A> {
        fn deliver(&self, _from: ConnectionId, action: A) {
            if let Ok(mut v) = self.received.lock() {
                v.push(action);
            }
        }
    }

    /// A local observer connection whose deliveries land in the returned sink.
    pub fn recording_observer(
        id: ConnectionId,
    ) -> (
        LocalConnection<ServerAction>,
        Arc<RecordingSink<ServerAction>>,
    ) {
        let sink = Arc::new(RecordingSink::new());
        let conn = local(id, Arc::clone(&sink) as Arc<dyn ActionSink<ServerAction>>);
        (conn, sink)
    }

    /// Keep only actions with the given wire tag.
    pub fn of_kind<'a>(actions: &'a [ServerAction], kind: &str) -> Vec<&'a ServerAction> {
        actions.iter().filter(|a| a.kind() == kind).collect()
    }
}
