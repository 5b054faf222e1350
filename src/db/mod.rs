// Database access layer (SQLite via sqlx): game sessions plus their
// append-only throw log.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::engine::session::GameSession;
use crate::engine::throw::ThrowRecord;
use crate::error::GameError;
use crate::store::SessionStore;

#[derive(Debug, Clone, sqlx::FromRow)]
struct GameRow {
    id: String,
    data: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ThrowRow {
    data: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every in-memory connection is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                game_type TEXT NOT NULL,
                status TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS throws (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                player_id TEXT NOT NULL,
                round_number INTEGER NOT NULL,
                dart_number INTEGER NOT NULL,
                points INTEGER NOT NULL,
                data TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_throws_game ON throws(game_id, seq)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Session JSON without the throw log, which lives in its own table.
    fn session_json(session: &GameSession) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(session)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("throws".to_string(), serde_json::Value::Array(Vec::new()));
        }
        serde_json::to_string(&value)
    }

    fn status_label(session: &GameSession) -> String {
        serde_json::to_value(session.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    async fn throws_for(&self, game_id: &str) -> Result<Vec<ThrowRecord>, GameError> {
        let rows = sqlx::query_as::<_, ThrowRow>(
            "SELECT data FROM throws WHERE game_id = ? ORDER BY seq ASC",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| serde_json::from_str(&row.data).map_err(GameError::from))
            .collect()
    }

    async fn hydrate(&self, row: GameRow) -> Result<GameSession, GameError> {
        let mut session: GameSession = serde_json::from_str(&row.data)?;
        session.throws = self.throws_for(&row.id).await?;
        Ok(session)
    }
}

impl SessionStore for Database {
    async fn load(&self, id: Uuid) -> Result<Option<GameSession>, GameError> {
        let row = sqlx::query_as::<_, GameRow>("SELECT id, data FROM games WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &GameSession) -> Result<(), GameError> {
        let game_id = session.id.to_string();
        let data = Self::session_json(session)?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE games SET status = ?, data = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(Self::status_label(session))
        .bind(&data)
        .bind(&game_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(GameError::game_not_found(session.id));
        }

        // Throws are only ever appended, so everything past the stored count is new.
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM throws WHERE game_id = ?")
            .bind(&game_id)
            .fetch_one(&mut *tx)
            .await?;
        for throw in session.throws.iter().skip(stored.max(0) as usize) {
            sqlx::query(
                "INSERT INTO throws (id, game_id, player_id, round_number, dart_number, points, data) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(throw.id.to_string())
            .bind(&game_id)
            .bind(throw.player_id.to_string())
            .bind(throw.round_number as i64)
            .bind(throw.dart_number as i64)
            .bind(throw.score.points() as i64)
            .bind(serde_json::to_string(throw)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert(&self, session: GameSession) -> Result<(), GameError> {
        sqlx::query(
            "INSERT INTO games (id, game_type, status, data, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(session.game_type.label())
        .bind(Self::status_label(&session))
        .bind(Self::session_json(&session)?)
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<GameSession>, GameError> {
        let rows =
            sqlx::query_as::<_, GameRow>("SELECT id, data FROM games ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(self.hydrate(row).await?);
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::score::Score;
    use crate::engine::session::{GameOptions, GameStatus, GameType, NewPlayer, PlayerType};

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn new_session(game_type: GameType) -> GameSession {
        GameSession::new(
            game_type,
            None,
            vec![
                NewPlayer {
                    name: "Alice".to_string(),
                    user_id: None,
                    player_type: PlayerType::Human,
                    bot: None,
                },
                NewPlayer {
                    name: "Robo".to_string(),
                    user_id: None,
                    player_type: PlayerType::Bot,
                    bot: None,
                },
            ],
            GameOptions::default(),
        )
    }

    fn push_throw(session: &mut GameSession, score: Score) {
        let slot = session.next_slot();
        let player = session.players[slot.player_index].id;
        let record = ThrowRecord::new(
            session.id,
            player,
            slot.round_number,
            slot.dart_number,
            score,
            Some(serde_json::json!({ "source": "test" })),
        )
        .unwrap();
        session.throws.push(record);
    }

    #[tokio::test]
    async fn test_insert_and_load() {
        let db = test_db().await;
        let session = new_session(GameType::X01);
        db.insert(session.clone()).await.unwrap();

        let loaded = db.load(session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(loaded.players[1].bot.is_some());

        assert!(db.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_appends_throws_in_order() {
        let db = test_db().await;
        let mut session = new_session(GameType::Cricket);
        db.insert(session.clone()).await.unwrap();

        session.status = GameStatus::InProgress;
        push_throw(&mut session, Score::triple(20).unwrap());
        push_throw(&mut session, Score::single(19).unwrap());
        db.save(&session).await.unwrap();

        push_throw(&mut session, Score::miss());
        push_throw(&mut session, Score::double(25).unwrap());
        db.save(&session).await.unwrap();
        // Saving again without new throws writes nothing twice.
        db.save(&session).await.unwrap();

        let loaded = db.load(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, GameStatus::InProgress);
        assert_eq!(loaded.throws, session.throws);
    }

    #[tokio::test]
    async fn test_save_unknown_game() {
        let db = test_db().await;
        let err = db.save(&new_session(GameType::X01)).await.unwrap_err();
        assert!(matches!(err, GameError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let db = test_db().await;
        let first = new_session(GameType::X01);
        let mut second = new_session(GameType::AroundTheClock);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        db.insert(first.clone()).await.unwrap();
        db.insert(second.clone()).await.unwrap();

        let listed = db.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
