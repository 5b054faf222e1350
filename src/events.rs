// Game notifications: what happened to a session, fanned out to observers.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::engine::rules::PlayerStatistics;
use crate::engine::session::GameType;
use crate::engine::throw::ThrowRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        game_id: Uuid,
        game_type: GameType,
        players: Vec<Uuid>,
    },
    ThrowRegistered {
        game_id: Uuid,
        throw: ThrowRecord,
        /// Whose dart is next, `None` once the game is over.
        next_player: Option<Uuid>,
    },
    VisitBust {
        game_id: Uuid,
        player_id: Uuid,
        round_number: u32,
    },
    GameWon {
        game_id: Uuid,
        winner_id: Uuid,
        final_score: Option<i32>,
    },
    GameAbandoned {
        game_id: Uuid,
    },
    StatisticsUpdated {
        game_id: Uuid,
        statistics: Vec<PlayerStatistics>,
    },
}

impl GameEvent {
    pub fn game_id(&self) -> Uuid {
        match self {
            GameEvent::GameStarted { game_id, .. }
            | GameEvent::ThrowRegistered { game_id, .. }
            | GameEvent::VisitBust { game_id, .. }
            | GameEvent::GameWon { game_id, .. }
            | GameEvent::GameAbandoned { game_id }
            | GameEvent::StatisticsUpdated { game_id, .. } => *game_id,
        }
    }
}

/// Receives events after the state change they describe has been saved.
/// Publishing must not block: it runs while the game's lock is held.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: GameEvent);
}

/// Fans events out to every subscriber over a broadcast channel. Slow
/// subscribers lag and drop events rather than holding up the game.
pub struct BroadcastSink {
    tx: broadcast::Sender<GameEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: GameEvent) {
        // Err only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        assert_eq!(sink.subscriber_count(), 1);

        let game_id = Uuid::new_v4();
        sink.publish(GameEvent::GameAbandoned { game_id });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.game_id(), game_id);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let sink = BroadcastSink::new(4);
        sink.publish(GameEvent::GameAbandoned {
            game_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn test_wire_format() {
        let game_id = Uuid::new_v4();
        let json = serde_json::to_value(GameEvent::GameAbandoned { game_id }).unwrap();
        assert_eq!(json["type"], "game_abandoned");
        assert_eq!(json["game_id"], game_id.to_string());
    }
}
