use std::ops::AddAssign;

use serde::Serialize;

use crate::config::{AF_DECIMALS, STAT_DECIMALS};

/// An (occurrences, opportunities) pair. Occurrences are only recorded together with an
/// opportunity, so `occurrences <= opportunities` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Ratio {
    pub occurrences: u64,
    pub opportunities: u64,
}

impl Ratio {
    pub const fn new(occurrences: u64, opportunities: u64) -> Self {
        Self {
            occurrences,
            opportunities,
        }
    }

    /// Record one hand's outcome. `occurred` is ignored without an opportunity.
    pub fn observe(&mut self, opportunity: bool, occurred: bool) {
        if opportunity {
            self.opportunities += 1;
            if occurred {
                self.occurrences += 1;
            }
        }
    }

    /// occurrences / opportunities × 100, one decimal. 0/0 reports 0.
    pub fn percent(&self) -> f64 {
        if self.opportunities == 0 {
            return 0.0;
        }
        round_to(
            self.occurrences as f64 / self.opportunities as f64 * 100.0,
            STAT_DECIMALS,
        )
    }
}

impl AddAssign for Ratio {
    fn add_assign(&mut self, rhs: Self) {
        self.occurrences += rhs.occurrences;
        self.opportunities += rhs.opportunities;
    }
}

/// Running counters for one player in one position bucket (or summed across buckets).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCounters {
    pub hands: u64,
    pub vpip: Ratio,
    pub pfr: Ratio,
    pub three_bet: Ratio,
    pub fold_to_3bet: Ratio,
    pub four_bet: Ratio,
    pub fold_to_4bet: Ratio,
    pub five_bet: Ratio,
    pub fold_to_5bet: Ratio,
    pub c_bet: Ratio,
    pub fold_to_cbet: Ratio,
    pub wtsd: Ratio,
    pub wtsd_won: Ratio,
    /// Postflop bets + raises.
    pub aggression_actions: u64,
    /// Postflop calls.
    pub call_actions: u64,
}

impl StatCounters {
    /// Every ratio statistic with its report name.
    pub fn ratios(&self) -> [(&'static str, Ratio); 12] {
        [
            ("vpip", self.vpip),
            ("pfr", self.pfr),
            ("three_bet", self.three_bet),
            ("fold_to_3bet", self.fold_to_3bet),
            ("four_bet", self.four_bet),
            ("fold_to_4bet", self.fold_to_4bet),
            ("five_bet", self.five_bet),
            ("fold_to_5bet", self.fold_to_5bet),
            ("c_bet", self.c_bet),
            ("fold_to_cbet", self.fold_to_cbet),
            ("wtsd", self.wtsd),
            ("wtsd_won", self.wtsd_won),
        ]
    }

    /// Postflop (bets + raises) / max(1, calls), two decimals.
    pub fn aggression_factor(&self) -> f64 {
        round_to(
            self.aggression_actions as f64 / self.call_actions.max(1) as f64,
            AF_DECIMALS,
        )
    }
}

impl AddAssign<&StatCounters> for StatCounters {
    fn add_assign(&mut self, rhs: &StatCounters) {
        self.hands += rhs.hands;
        self.vpip += rhs.vpip;
        self.pfr += rhs.pfr;
        self.three_bet += rhs.three_bet;
        self.fold_to_3bet += rhs.fold_to_3bet;
        self.four_bet += rhs.four_bet;
        self.fold_to_4bet += rhs.fold_to_4bet;
        self.five_bet += rhs.five_bet;
        self.fold_to_5bet += rhs.fold_to_5bet;
        self.c_bet += rhs.c_bet;
        self.fold_to_cbet += rhs.fold_to_cbet;
        self.wtsd += rhs.wtsd;
        self.wtsd_won += rhs.wtsd_won;
        self.aggression_actions += rhs.aggression_actions;
        self.call_actions += rhs.call_actions;
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
