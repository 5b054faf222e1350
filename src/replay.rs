// Replay archives: a session and its full throw log, gzipped JSON, for
// download and offline replay through the engines.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::engine::session::GameSession;

pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayArchive {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub session: GameSession,
}

impl ReplayArchive {
    pub fn new(session: GameSession) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            exported_at: Utc::now(),
            session,
        }
    }

    /// Number of recorded darts, forfeited fillers included.
    pub fn dart_count(&self) -> usize {
        self.session.throws.len()
    }

    /// Serialize and compress the archive.
    pub fn compress(&self) -> Result<Vec<u8>, std::io::Error> {
        let json = serde_json::to_vec(self)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&json)?;
        encoder.finish()
    }
}

/// Decompress and parse an archive produced by [`ReplayArchive::compress`].
pub fn decompress_replay(data: &[u8]) -> Result<ReplayArchive, std::io::Error> {
    let mut decoder = GzDecoder::new(data);
    let mut json = String::new();
    decoder.read_to_string(&mut json)?;
    let archive: ReplayArchive = serde_json::from_str(&json)?;
    if archive.version != ARCHIVE_VERSION {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unsupported replay version {}", archive.version),
        ));
    }
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::engine_of;
    use crate::engine::score::Score;
    use crate::engine::session::{GameOptions, GameStatus, GameType, NewPlayer, PlayerType};
    use crate::engine::throw::ThrowRecord;

    fn played_session() -> GameSession {
        let mut session = GameSession::new(
            GameType::X01,
            Some(301),
            vec![NewPlayer {
                name: "Alice".to_string(),
                user_id: None,
                player_type: PlayerType::Human,
                bot: None,
            }],
            GameOptions::default(),
        );
        session.status = GameStatus::InProgress;
        let player = session.players[0].id;
        for dart in 1..=3 {
            let score = Score::triple(20).unwrap();
            let record = ThrowRecord::new(session.id, player, 1, dart, score, None).unwrap();
            session.throws.push(record);
        }
        session
    }

    #[test]
    fn test_archive_and_restore() {
        let session = played_session();
        let archive = ReplayArchive::new(session.clone());
        assert_eq!(archive.dart_count(), 3);

        let compressed = archive.compress().unwrap();
        assert!(!compressed.is_empty());

        let restored = decompress_replay(&compressed).unwrap();
        assert_eq!(restored.session, session);

        let player = restored.session.players[0].id;
        let engine = engine_of(&restored.session);
        assert_eq!(engine.calculate_current_score(&restored.session, player), 121);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decompress_replay(b"not gzip").is_err());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut archive = ReplayArchive::new(played_session());
        archive.version = 99;
        let compressed = archive.compress().unwrap();
        assert!(decompress_replay(&compressed).is_err());
    }
}
