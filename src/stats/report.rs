use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::identity::IdentityRegistry;
use crate::stats::accumulator::StatAccumulator;
use crate::stats::counters::StatCounters;
use crate::types::{PlayerId, Position};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Raw "count / opportunity" pairs behind every percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawCounts {
    pub vpip_count: u64,
    pub pfr_count: u64,
    pub three_bet_count: u64,
    pub three_bet_opp: u64,
    pub fold_to_3bet_count: u64,
    pub faced_3bet_count: u64,
    pub four_bet_count: u64,
    pub four_bet_opp: u64,
    pub fold_to_4bet_count: u64,
    pub faced_4bet_count: u64,
    pub five_bet_count: u64,
    pub five_bet_opp: u64,
    pub fold_to_5bet_count: u64,
    pub faced_5bet_count: u64,
    pub c_bet_count: u64,
    pub c_bet_opp: u64,
    pub fold_to_cbet_count: u64,
    pub faced_cbet_count: u64,
    pub wtsd_count: u64,
    pub wtsd_opp: u64,
    pub wtsd_won_count: u64,
    pub showdown_count: u64,
    pub aggression_actions: u64,
    pub call_actions: u64,
}

/// Percentages for one counter set, plus the raw counts they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLine {
    pub hands: u64,
    pub vpip: f64,
    pub pfr: f64,
    pub three_bet: f64,
    pub fold_to_3bet: f64,
    pub four_bet: f64,
    pub fold_to_4bet: f64,
    pub five_bet: f64,
    pub fold_to_5bet: f64,
    pub c_bet: f64,
    pub fold_to_cbet: f64,
    pub af: f64,
    pub wtsd: f64,
    pub wtsd_won: f64,
    #[serde(flatten)]
    pub counts: RawCounts,
}

impl From<&StatCounters> for StatLine {
    fn from(c: &StatCounters) -> Self {
        Self {
            hands: c.hands,
            vpip: c.vpip.percent(),
            pfr: c.pfr.percent(),
            three_bet: c.three_bet.percent(),
            fold_to_3bet: c.fold_to_3bet.percent(),
            four_bet: c.four_bet.percent(),
            fold_to_4bet: c.fold_to_4bet.percent(),
            five_bet: c.five_bet.percent(),
            fold_to_5bet: c.fold_to_5bet.percent(),
            c_bet: c.c_bet.percent(),
            fold_to_cbet: c.fold_to_cbet.percent(),
            af: c.aggression_factor(),
            wtsd: c.wtsd.percent(),
            wtsd_won: c.wtsd_won.percent(),
            counts: RawCounts {
                vpip_count: c.vpip.occurrences,
                pfr_count: c.pfr.occurrences,
                three_bet_count: c.three_bet.occurrences,
                three_bet_opp: c.three_bet.opportunities,
                fold_to_3bet_count: c.fold_to_3bet.occurrences,
                faced_3bet_count: c.fold_to_3bet.opportunities,
                four_bet_count: c.four_bet.occurrences,
                four_bet_opp: c.four_bet.opportunities,
                fold_to_4bet_count: c.fold_to_4bet.occurrences,
                faced_4bet_count: c.fold_to_4bet.opportunities,
                five_bet_count: c.five_bet.occurrences,
                five_bet_opp: c.five_bet.opportunities,
                fold_to_5bet_count: c.fold_to_5bet.occurrences,
                faced_5bet_count: c.fold_to_5bet.opportunities,
                c_bet_count: c.c_bet.occurrences,
                c_bet_opp: c.c_bet.opportunities,
                fold_to_cbet_count: c.fold_to_cbet.occurrences,
                faced_cbet_count: c.fold_to_cbet.opportunities,
                wtsd_count: c.wtsd.occurrences,
                wtsd_opp: c.wtsd.opportunities,
                wtsd_won_count: c.wtsd_won.occurrences,
                showdown_count: c.wtsd_won.opportunities,
                aggression_actions: c.aggression_actions,
                call_actions: c.call_actions,
            },
        }
    }
}

/// One row of the stats table: every id sharing a display name, summed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReport {
    /// Smallest member id; any member id resolves back to this report.
    pub id: PlayerId,
    pub name: String,
    pub member_ids: Vec<PlayerId>,
    #[serde(flatten)]
    pub overall: StatLine,
    pub position_stats: BTreeMap<Position, StatLine>,
}

impl PlayerReport {
    fn build(name: String, mut member_ids: Vec<PlayerId>, acc: &StatAccumulator) -> Option<Self> {
        member_ids.sort();
        let buckets = acc.group_by_position(&member_ids)?;

        let mut total = StatCounters::default();
        for counters in buckets.values() {
            total += counters;
        }
        let position_stats = buckets
            .iter()
            .map(|(position, counters)| (*position, StatLine::from(counters)))
            .collect();

        Some(Self {
            id: member_ids.first()?.clone(),
            name,
            member_ids,
            overall: StatLine::from(&total),
            position_stats,
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Group every id with counters by its current display name.
fn display_groups(
    acc: &StatAccumulator,
    registry: &IdentityRegistry,
) -> BTreeMap<String, Vec<PlayerId>> {
    let mut groups: BTreeMap<String, Vec<PlayerId>> = BTreeMap::new();
    for id in acc.player_ids() {
        let name = registry.display_name(id).unwrap_or_else(|| id.clone());
        groups.entry(name).or_default().push(id.clone());
    }
    groups
}

/// All player reports, most hands first (ties by name).
pub fn player_reports(acc: &StatAccumulator, registry: &IdentityRegistry) -> Vec<PlayerReport> {
    let mut reports: Vec<PlayerReport> = display_groups(acc, registry)
        .into_iter()
        .filter_map(|(name, ids)| PlayerReport::build(name, ids, acc))
        .collect();
    reports.sort_by(|a, b| {
        b.overall
            .hands
            .cmp(&a.overall.hands)
            .then_with(|| a.name.cmp(&b.name))
    });
    reports
}

/// Report for the display group containing `id`.
pub fn player_report(
    acc: &StatAccumulator,
    registry: &IdentityRegistry,
    id: &str,
) -> Result<PlayerReport> {
    let unknown = || AppError::UnknownPlayer { id: id.to_string() };
    let name = registry.display_name(id).ok_or_else(unknown)?;
    let ids = display_groups(acc, registry).remove(&name).ok_or_else(unknown)?;
    PlayerReport::build(name, ids, acc).ok_or_else(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{assign_hand, classify};
    use crate::types::{ActionKind, HandRecord, RawAction, Street};

    fn act(player: &str, kind: ActionKind, amount: Option<f64>) -> RawAction {
        RawAction {
            player: player.to_string(),
            street: Street::Preflop,
            kind,
            amount,
            all_in: false,
        }
    }

    fn hand(id: &str, seats: &[(u8, &str)], button: u8, actions: Vec<RawAction>) -> HandRecord {
        HandRecord {
            id: id.to_string(),
            seats: seats.iter().map(|(s, p)| (*s, p.to_string())).collect(),
            button_seat: button,
            actions,
            showdown: vec![],
        }
    }

    fn ingest(hands: &[HandRecord]) -> (StatAccumulator, IdentityRegistry) {
        let registry = IdentityRegistry::new();
        let mut acc = StatAccumulator::new();
        for h in hands {
            let actions = classify(h).unwrap();
            let positions = assign_hand(h).unwrap();
            acc.ingest(h, &actions, &positions, &registry).unwrap();
        }
        (acc, registry)
    }

    fn sample() -> (StatAccumulator, IdentityRegistry) {
        let seats = [(1, "Bob_2341"), (2, "Bob2341"), (3, "Zed")];
        ingest(&[
            hand("h1", &seats, 1, vec![
                act("Bob2341", ActionKind::Post, Some(1.0)),
                act("Zed", ActionKind::Post, Some(2.0)),
                act("Bob_2341", ActionKind::Raise, Some(6.0)),
                act("Bob2341", ActionKind::Fold, None),
                act("Zed", ActionKind::Fold, None),
            ]),
            hand("h2", &seats, 2, vec![
                act("Zed", ActionKind::Post, Some(1.0)),
                act("Bob_2341", ActionKind::Post, Some(2.0)),
                act("Bob2341", ActionKind::Call, Some(2.0)),
                act("Zed", ActionKind::Fold, None),
                act("Bob_2341", ActionKind::Check, None),
            ]),
        ])
    }

    #[test]
    fn each_handle_reports_separately_without_alias() {
        let (acc, registry) = sample();
        let reports = player_reports(&acc, &registry);
        assert_eq!(reports.len(), 3);
        let bob = reports.iter().find(|r| r.name == "Bob_2341").unwrap();
        assert_eq!(bob.overall.hands, 2);
        assert_eq!(bob.overall.pfr, 50.0);
        assert_eq!(bob.overall.counts.pfr_count, 1);
        assert_eq!(bob.position_stats[&Position::Button].hands, 1);
        assert_eq!(bob.position_stats[&Position::BigBlind].hands, 1);
    }

    #[test]
    fn aliased_handles_aggregate_under_one_name() {
        let (acc, registry) = sample();
        let a = registry.resolve("Bob_2341").id;
        let b = registry.resolve("Bob2341").id;
        registry.set_alias(&a, "Bob").unwrap();
        registry.set_alias(&b, "Bob").unwrap();

        let reports = player_reports(&acc, &registry);
        assert_eq!(reports.len(), 2);
        let bob = &reports[0];
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.overall.hands, 4);
        assert_eq!(bob.overall.counts.vpip_count, 2);
        assert_eq!(bob.member_ids.len(), 2);

        // Either member id resolves to the same group.
        let via_a = player_report(&acc, &registry, &a).unwrap();
        let via_b = player_report(&acc, &registry, &b).unwrap();
        assert_eq!(via_a, via_b);

        // Position breakdown still sums to the overall line.
        let hands: u64 = bob.position_stats.values().map(|l| l.hands).sum();
        assert_eq!(hands, bob.overall.hands);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let (acc, registry) = sample();
        let err = player_report(&acc, &registry, "nope").unwrap_err();
        assert!(matches!(err, AppError::UnknownPlayer { .. }));
    }

    #[test]
    fn serialized_shape_matches_dashboard_fields() {
        let (acc, registry) = sample();
        let report = player_report(&acc, &registry, &registry.resolve("Zed").id).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        let keys = [
            "id",
            "name",
            "hands",
            "vpip",
            "fold_to_3bet",
            "af",
            "wtsd_won",
            "position_stats",
        ];
        for key in keys {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        let sb = &json["position_stats"]["SB"];
        assert_eq!(sb["hands"], 1);
        assert!(sb.get("faced_3bet_count").is_some());
    }
}
