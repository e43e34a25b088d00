use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::types::{ActionKind, ClassifiedAction, HandRecord, Street};

/// Betting state of the street currently being replayed.
struct StreetState {
    street: Street,
    /// Raises seen this street (open=1, 3-bet=2, ...).
    level: u8,
    /// Highest street total anyone has put in, blinds included.
    facing: f64,
}

impl StreetState {
    fn new(street: Street) -> Self {
        Self {
            street,
            level: 0,
            facing: 0.0,
        }
    }
}

/// Replay a hand's actions in file order and tag each one with its street, normalized
/// kind, VPIP flag and raise-ladder level.
///
/// The ladder resets at every street boundary. Calls, checks and folds carry the level
/// they respond to, so a fold at level 2 is a fold to a 3-bet. An all-in raise that does
/// not beat the current facing amount is a call; short all-in calls stay calls.
///
/// A handle may hold only one seat per hand.
pub fn classify(hand: &HandRecord) -> Result<Vec<ClassifiedAction>> {
    let mut seated: HashSet<&str> = HashSet::with_capacity(hand.seats.len());
    for (seat, handle) in &hand.seats {
        if !seated.insert(handle.as_str()) {
            return Err(AppError::malformed(
                &hand.id,
                format!("player {handle:?} also holds seat {seat}"),
            ));
        }
    }

    let mut state = StreetState::new(Street::Preflop);
    let mut folded: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(hand.actions.len());

    for (idx, action) in hand.actions.iter().enumerate() {
        if hand.seat_of(&action.player).is_none() {
            return Err(AppError::malformed(
                &hand.id,
                format!("action #{idx}: player {:?} has no recorded seat", action.player),
            ));
        }

        if action.street < state.street {
            return Err(AppError::malformed(
                &hand.id,
                format!(
                    "action #{idx}: {} action after {} actions began",
                    action.street, state.street
                ),
            ));
        }
        if action.street > state.street {
            state = StreetState::new(action.street);
        }

        if folded.contains(action.player.as_str()) {
            return Err(AppError::malformed(
                &hand.id,
                format!("action #{idx}: {:?} acts after folding", action.player),
            ));
        }

        let preflop = state.street == Street::Preflop;
        let amount = action.amount.unwrap_or(0.0);

        let (kind, ladder_level) = match action.kind {
            ActionKind::Post => {
                if !preflop {
                    return Err(AppError::malformed(
                        &hand.id,
                        format!("action #{idx}: blind posted on the {}", state.street),
                    ));
                }
                state.facing = state.facing.max(amount);
                (ActionKind::Post, state.level)
            }
            ActionKind::Fold => {
                folded.insert(action.player.as_str());
                (ActionKind::Fold, state.level)
            }
            ActionKind::Check => (ActionKind::Check, state.level),
            ActionKind::Call => (ActionKind::Call, state.level),
            ActionKind::Bet | ActionKind::Raise => {
                let short_all_in =
                    action.all_in && action.amount.is_some() && amount <= state.facing;
                if short_all_in {
                    (ActionKind::Call, state.level)
                } else {
                    state.level = state.level.saturating_add(1);
                    state.facing = state.facing.max(amount);
                    let kind = if preflop || state.level > 1 {
                        ActionKind::Raise
                    } else {
                        ActionKind::Bet
                    };
                    (kind, state.level)
                }
            }
        };

        let is_voluntary =
            preflop && matches!(kind, ActionKind::Call | ActionKind::Bet | ActionKind::Raise);

        out.push(ClassifiedAction {
            player: action.player.clone(),
            street: state.street,
            kind,
            is_voluntary,
            ladder_level,
            all_in: action.all_in,
        });
    }

    Ok(out)
}
