use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::error::{AppError, Result};
use crate::identity::IdentityRegistry;
use crate::stats::counters::StatCounters;
use crate::types::{ActionKind, ClassifiedAction, HandRecord, PlayerId, Position, Street};

/// Highest preflop ladder level tracked for "facing" decisions (a 5-bet).
const MAX_TRACKED_LEVEL: usize = 4;

/// Per-player, per-position counters. A pure additive sink: it never deduplicates hands,
/// and the all-position view is always derived by summing the position buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatAccumulator {
    players: HashMap<PlayerId, BTreeMap<Position, StatCounters>>,
    hands_ingested: u64,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one classified hand into the counters, keyed by the ids the registry resolves
    /// for each seated handle.
    pub fn ingest(
        &mut self,
        hand: &HandRecord,
        actions: &[ClassifiedAction],
        positions: &BTreeMap<u8, Position>,
        registry: &IdentityRegistry,
    ) -> Result<()> {
        let deltas = hand_deltas(hand, actions);

        // Resolve every position before touching the counters so a bad hand adds nothing.
        let mut placed = Vec::with_capacity(deltas.len());
        for (seat, handle) in &hand.seats {
            let position = positions.get(seat).copied().ok_or_else(|| {
                AppError::malformed(&hand.id, format!("seat {seat} has no assigned position"))
            })?;
            if let Some(delta) = deltas.get(handle.as_str()) {
                placed.push((handle, position, delta));
            }
        }

        for (handle, position, delta) in placed {
            let id = registry.resolve(handle).id;
            *self
                .players
                .entry(id)
                .or_default()
                .entry(position)
                .or_default() += delta;
        }
        self.hands_ingested += 1;
        debug!(hand_id = %hand.id, players = hand.seats.len(), "hand ingested");
        Ok(())
    }

    pub fn hands_ingested(&self) -> u64 {
        self.hands_ingested
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.keys()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    /// Raw per-position buckets for one id.
    pub fn by_position(&self, id: &str) -> Option<&BTreeMap<Position, StatCounters>> {
        self.players.get(id)
    }

    /// All-position total for one id, summed from its position buckets.
    pub fn total(&self, id: &str) -> Option<StatCounters> {
        let buckets = self.players.get(id)?;
        let mut total = StatCounters::default();
        for counters in buckets.values() {
            total += counters;
        }
        Some(total)
    }

    /// Position buckets summed across several ids, as used when handles report under
    /// one display name. Returns None when none of the ids has counters.
    pub fn group_by_position(&self, ids: &[PlayerId]) -> Option<BTreeMap<Position, StatCounters>> {
        let mut merged: BTreeMap<Position, StatCounters> = BTreeMap::new();
        let mut found = false;
        for id in ids {
            if let Some(buckets) = self.players.get(id) {
                found = true;
                for (position, counters) in buckets {
                    *merged.entry(*position).or_default() += counters;
                }
            }
        }
        found.then_some(merged)
    }
}

/// Decisions one player made in one hand, gathered while replaying the actions.
#[derive(Debug, Default)]
struct PlayerHand {
    vpip: bool,
    pfr: bool,
    /// First preflop decision facing each ladder level made by someone else.
    facing: [Option<ActionKind>; MAX_TRACKED_LEVEL + 1],
    folded_preflop: bool,
    folded: bool,
    /// Some(bet) when the player had a continuation-bet decision.
    cbet: Option<bool>,
    /// Some(folded) when the player's first decision faced a continuation bet.
    faced_cbet: Option<bool>,
    aggression: u64,
    calls: u64,
}

/// Level a decision responds to: raises record the level they reach.
fn faced_level(action: &ClassifiedAction) -> u8 {
    if action.kind.is_aggressive() {
        action.ladder_level.saturating_sub(1)
    } else {
        action.ladder_level
    }
}

/// Per-hand counter deltas for every seated handle. Opportunities are gated on the
/// decision actually being reached in this hand.
fn hand_deltas<'a>(
    hand: &'a HandRecord,
    actions: &[ClassifiedAction],
) -> HashMap<&'a str, StatCounters> {
    let mut players: HashMap<&str, PlayerHand> = hand
        .seats
        .values()
        .map(|h| (h.as_str(), PlayerHand::default()))
        .collect();

    // Preflop: VPIP, PFR and the raise ladder.
    let mut level_maker: Option<&str> = None;
    for action in actions.iter().filter(|a| a.street == Street::Preflop) {
        let Some(p) = players.get_mut(action.player.as_str()) else {
            continue;
        };
        p.vpip |= action.is_voluntary;
        if action.kind == ActionKind::Post {
            continue;
        }
        if action.kind == ActionKind::Raise {
            p.pfr = true;
        }

        let faced = faced_level(action) as usize;
        let own_raise = level_maker == Some(action.player.as_str());
        if (1..=MAX_TRACKED_LEVEL).contains(&faced) && !own_raise && p.facing[faced].is_none() {
            p.facing[faced] = Some(action.kind);
        }

        match action.kind {
            ActionKind::Raise => {
                level_maker = hand
                    .seats
                    .values()
                    .find(|h| h.as_str() == action.player)
                    .map(String::as_str);
            }
            ActionKind::Fold => {
                p.folded_preflop = true;
                p.folded = true;
            }
            _ => {}
        }
    }
    let aggressor = level_maker;

    let remaining_after_preflop = players.values().filter(|p| !p.folded_preflop).count();

    // Flop: continuation bets.
    let mut cbet_made = false;
    let mut aggressor_acted = false;
    let mut answered_cbet: HashSet<&str> = HashSet::new();
    for action in actions.iter().filter(|a| a.street == Street::Flop) {
        let player = action.player.as_str();
        let Some(p) = players.get_mut(player) else {
            continue;
        };
        let faced = faced_level(action);

        if Some(player) == aggressor {
            if !aggressor_acted && faced == 0 {
                let bet = action.kind == ActionKind::Bet;
                p.cbet = Some(bet);
                cbet_made = bet;
            }
            aggressor_acted = true;
        } else if cbet_made && faced == 1 && answered_cbet.insert(player) {
            p.faced_cbet = Some(action.kind == ActionKind::Fold);
        }
    }

    // Postflop aggression and folds.
    for action in actions.iter().filter(|a| a.street.is_postflop()) {
        let Some(p) = players.get_mut(action.player.as_str()) else {
            continue;
        };
        match action.kind {
            ActionKind::Bet | ActionKind::Raise => p.aggression += 1,
            ActionKind::Call => p.calls += 1,
            ActionKind::Fold => p.folded = true,
            _ => {}
        }
    }

    let never_folded = players.values().filter(|p| !p.folded).count();
    let contested = never_folded >= 2;

    players
        .into_iter()
        .map(|(handle, p)| {
            let mut c = StatCounters {
                hands: 1,
                ..Default::default()
            };
            c.vpip.observe(true, p.vpip);
            c.pfr.observe(true, p.pfr);

            let faced = |level: usize| p.facing[level];
            c.three_bet.observe(faced(1).is_some(), faced(1) == Some(ActionKind::Raise));
            c.four_bet.observe(faced(2).is_some(), faced(2) == Some(ActionKind::Raise));
            c.fold_to_3bet.observe(faced(2).is_some(), faced(2) == Some(ActionKind::Fold));
            c.five_bet.observe(faced(3).is_some(), faced(3) == Some(ActionKind::Raise));
            c.fold_to_4bet.observe(faced(3).is_some(), faced(3) == Some(ActionKind::Fold));
            c.fold_to_5bet.observe(faced(4).is_some(), faced(4) == Some(ActionKind::Fold));

            c.c_bet.observe(p.cbet.is_some(), p.cbet == Some(true));
            c.fold_to_cbet.observe(p.faced_cbet.is_some(), p.faced_cbet == Some(true));

            let saw_flop = !p.folded_preflop && remaining_after_preflop >= 2;
            let showdown = contested && !p.folded;
            let won = showdown
                && hand
                    .showdown
                    .iter()
                    .any(|s| s.player == handle && s.won > 0.0);
            c.wtsd.observe(saw_flop, showdown);
            c.wtsd_won.observe(showdown, won);

            c.aggression_actions = p.aggression;
            c.call_actions = p.calls;
            (handle, c)
        })
        .collect()
}
