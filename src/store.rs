// Session persistence contract and the in-memory implementation.

use std::future::Future;

use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::session::GameSession;
use crate::error::GameError;

/// Where game sessions live between operations. The pipeline only calls
/// these while holding the game's lock, so implementations need no
/// per-game coordination of their own.
pub trait SessionStore: Send + Sync + 'static {
    fn load(&self, id: Uuid) -> impl Future<Output = Result<Option<GameSession>, GameError>> + Send;

    /// Persist the session, including any throws appended since the last save.
    fn save(&self, session: &GameSession) -> impl Future<Output = Result<(), GameError>> + Send;

    fn insert(&self, session: GameSession) -> impl Future<Output = Result<(), GameError>> + Send;

    /// All sessions, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<GameSession>, GameError>> + Send;
}

#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<Uuid, GameSession>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    async fn load(&self, id: Uuid) -> Result<Option<GameSession>, GameError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn save(&self, session: &GameSession) -> Result<(), GameError> {
        match self.sessions.get_mut(&session.id) {
            Some(mut stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(GameError::game_not_found(session.id)),
        }
    }

    async fn insert(&self, session: GameSession) -> Result<(), GameError> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<GameSession>, GameError> {
        let mut sessions: Vec<GameSession> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}
