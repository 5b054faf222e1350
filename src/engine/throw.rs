// Throw records: the append-only history every game state is replayed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::score::{validate_dart_number, Score, ScoreError};

/// One recorded dart. Never mutated after it is appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowRecord {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub round_number: u32,
    pub dart_number: u8,
    pub score: Score,
    pub thrown_at: DateTime<Utc>,
    /// Filler dart appended after a bust ended the visit early.
    #[serde(default)]
    pub forfeited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,
}

impl ThrowRecord {
    pub fn new(
        game_id: Uuid,
        player_id: Uuid,
        round_number: u32,
        dart_number: u8,
        score: Score,
        raw_data: Option<serde_json::Value>,
    ) -> Result<Self, ScoreError> {
        Ok(Self {
            id: Uuid::new_v4(),
            game_id,
            player_id,
            round_number,
            dart_number: validate_dart_number(dart_number)?,
            score,
            thrown_at: Utc::now(),
            forfeited: false,
            raw_data,
        })
    }

    /// A miss that fills the rest of a busted visit.
    pub fn forfeit(
        game_id: Uuid,
        player_id: Uuid,
        round_number: u32,
        dart_number: u8,
    ) -> Result<Self, ScoreError> {
        let mut record = Self::new(
            game_id,
            player_id,
            round_number,
            dart_number,
            Score::miss(),
            None,
        )?;
        record.forfeited = true;
        Ok(record)
    }

    /// Ordering key used by every replay.
    pub fn sequence_key(&self) -> (u32, u8) {
        (self.round_number, self.dart_number)
    }
}

/// Where the next dart of a game lands in the (round, dart) numbering, and
/// which player in turn order throws it. Derived purely from the number of
/// darts already recorded: every visit is three darts, busts included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnSlot {
    pub player_index: usize,
    pub round_number: u32,
    pub dart_number: u8,
}

impl TurnSlot {
    pub fn for_dart_index(dart_index: usize, player_count: usize) -> Self {
        let visit = dart_index / 3;
        let player_count = player_count.max(1);
        Self {
            player_index: visit % player_count,
            round_number: (visit / player_count) as u32 + 1,
            dart_number: (dart_index % 3) as u8 + 1,
        }
    }

    /// Darts left in this visit, including this one.
    pub fn darts_left(&self) -> u8 {
        4 - self.dart_number
    }
}
