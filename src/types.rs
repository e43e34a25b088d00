use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable, content-derived player id (hex).
pub type PlayerId = String;

// ---------------------------------------------------------------------------
// Hand records (produced by the external parser)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    pub fn is_postflop(self) -> bool {
        self != Street::Preflop
    }
}

impl std::fmt::Display for Street {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Forced blind or straddle.
    Post,
    Fold,
    Check,
    Call,
    Bet,
    Raise,
}

impl ActionKind {
    pub fn is_aggressive(self) -> bool {
        matches!(self, ActionKind::Bet | ActionKind::Raise)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::Post => "post",
            ActionKind::Fold => "fold",
            ActionKind::Check => "check",
            ActionKind::Call => "call",
            ActionKind::Bet => "bet",
            ActionKind::Raise => "raise",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    pub player: String,
    pub street: Street,
    pub kind: ActionKind,
    /// Street total the player is putting in ("raises to"). Absent for folds and checks.
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub all_in: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowdownEntry {
    pub player: String,
    /// Amount collected at showdown; 0 for players who showed and lost.
    #[serde(default)]
    pub won: f64,
    #[serde(default)]
    pub shown: bool,
}

/// One completed hand. Immutable once produced by the ingestion side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandRecord {
    pub id: String,
    /// seat number → raw player handle
    pub seats: BTreeMap<u8, String>,
    pub button_seat: u8,
    pub actions: Vec<RawAction>,
    #[serde(default)]
    pub showdown: Vec<ShowdownEntry>,
}

impl HandRecord {
    pub fn seat_of(&self, handle: &str) -> Option<u8> {
        self.seats
            .iter()
            .find(|(_, h)| h.as_str() == handle)
            .map(|(&seat, _)| seat)
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Declaration order is the display order used by the position breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "SB")]
    SmallBlind,
    #[serde(rename = "BB")]
    BigBlind,
    #[serde(rename = "UTG")]
    Utg,
    #[serde(rename = "UTG+1")]
    Utg1,
    #[serde(rename = "UTG+2")]
    Utg2,
    #[serde(rename = "LJ")]
    Lojack,
    #[serde(rename = "HJ")]
    Hijack,
    #[serde(rename = "CO")]
    Cutoff,
    #[serde(rename = "BTN")]
    Button,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::SmallBlind,
        Position::BigBlind,
        Position::Utg,
        Position::Utg1,
        Position::Utg2,
        Position::Lojack,
        Position::Hijack,
        Position::Cutoff,
        Position::Button,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Position::SmallBlind => "SB",
            Position::BigBlind => "BB",
            Position::Utg => "UTG",
            Position::Utg1 => "UTG+1",
            Position::Utg2 => "UTG+2",
            Position::Lojack => "LJ",
            Position::Hijack => "HJ",
            Position::Cutoff => "CO",
            Position::Button => "BTN",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Classified actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedAction {
    pub player: String,
    pub street: Street,
    /// Normalized kind: short all-in raises become calls, preflop bets become raises.
    pub kind: ActionKind,
    /// Counts toward VPIP.
    pub is_voluntary: bool,
    /// For raises, the level reached (open=1, 3-bet=2, ...). For every other kind, the
    /// level being responded to.
    pub ladder_level: u8,
    pub all_in: bool,
}
