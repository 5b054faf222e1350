// Game session aggregate: configuration, participants, status and throw log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bot::BotProfile;
use super::throw::{ThrowRecord, TurnSlot};

pub const DEFAULT_X01_START: u32 = 501;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    X01,
    Cricket,
    AroundTheClock,
    JdcChallenge,
}

impl GameType {
    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            GameType::X01 => "x01",
            GameType::Cricket => "cricket",
            GameType::AroundTheClock => "around_the_clock",
            GameType::JdcChallenge => "jdc_challenge",
        }
    }
}

/// What opens scoring in X01.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InMode {
    #[default]
    Straight,
    Double,
    /// Double or triple.
    Master,
}

/// What finishes an X01 leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutMode {
    Straight,
    #[default]
    Double,
    /// Double or triple.
    Master,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CricketMode {
    #[default]
    Standard,
    CutThroat,
    NoScore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    #[serde(default)]
    pub in_mode: InMode,
    #[serde(default)]
    pub out_mode: OutMode,
    #[serde(default)]
    pub cricket_mode: CricketMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    WaitingForPlayers,
    InProgress,
    Completed,
    Abandoned,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Abandoned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerType {
    Human,
    Bot,
    Guest,
}

impl PlayerType {
    pub fn label(&self) -> &'static str {
        match self {
            PlayerType::Human => "human",
            PlayerType::Bot => "bot",
            PlayerType::Guest => "guest",
        }
    }
}

/// A participant as requested at session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub player_type: PlayerType,
    /// Required for bots; ignored otherwise.
    #[serde(default)]
    pub bot: Option<BotProfile>,
}

/// A participant in one session. The counters are caches rebuilt from the
/// throw log by the statistics flush, never incremented on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub player_type: PlayerType,
    pub player_order: usize,
    pub darts_thrown: u32,
    pub points_scored: u32,
    pub ppd: f64,
    pub is_winner: bool,
    pub bot: Option<BotProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: Uuid,
    pub game_type: GameType,
    pub starting_score: Option<u32>,
    pub options: GameOptions,
    pub status: GameStatus,
    pub players: Vec<GamePlayer>,
    pub throws: Vec<ThrowRecord>,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// Build a session waiting for its start. X01 without a starting score
    /// defaults to 501; other game types never carry one.
    pub fn new(
        game_type: GameType,
        starting_score: Option<u32>,
        players: Vec<NewPlayer>,
        options: GameOptions,
    ) -> Self {
        let starting_score = match game_type {
            GameType::X01 => Some(starting_score.unwrap_or(DEFAULT_X01_START)),
            _ => None,
        };
        let players = players
            .into_iter()
            .enumerate()
            .map(|(order, p)| GamePlayer {
                id: Uuid::new_v4(),
                user_id: p.user_id,
                name: p.name,
                player_type: p.player_type,
                player_order: order,
                darts_thrown: 0,
                points_scored: 0,
                ppd: 0.0,
                is_winner: false,
                bot: match p.player_type {
                    PlayerType::Bot => Some(p.bot.unwrap_or_default()),
                    _ => None,
                },
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            game_type,
            starting_score,
            options,
            status: GameStatus::WaitingForPlayers,
            players,
            throws: Vec::new(),
            winner_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn player(&self, player_id: Uuid) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_index(&self, player_id: Uuid) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    /// Slot the next recorded dart will occupy.
    pub fn next_slot(&self) -> TurnSlot {
        TurnSlot::for_dart_index(self.throws.len(), self.players.len())
    }

    /// Player expected to throw next, if the session has any players.
    pub fn acting_player(&self) -> Option<&GamePlayer> {
        self.players.get(self.next_slot().player_index)
    }

    /// All throws in deterministic replay order: round, then turn order, then
    /// dart. Independent of the order a store hands them back in.
    pub fn ordered_throws(&self) -> Vec<&ThrowRecord> {
        let mut throws: Vec<&ThrowRecord> = self.throws.iter().collect();
        throws.sort_by_key(|t| {
            let order = self.player_index(t.player_id).unwrap_or(usize::MAX);
            (t.round_number, order, t.dart_number)
        });
        throws
    }

    /// One player's throws in (round, dart) order.
    pub fn player_throws(&self, player_id: Uuid) -> Vec<&ThrowRecord> {
        let mut throws: Vec<&ThrowRecord> = self
            .throws
            .iter()
            .filter(|t| t.player_id == player_id)
            .collect();
        throws.sort_by_key(|t| t.sequence_key());
        throws
    }

    pub fn opponents(&self, player_id: Uuid) -> impl Iterator<Item = &GamePlayer> {
        self.players.iter().filter(move |p| p.id != player_id)
    }
}
