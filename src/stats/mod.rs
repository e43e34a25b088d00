pub mod accumulator;
pub mod counters;
pub mod report;

pub use accumulator::StatAccumulator;
pub use counters::{Ratio, StatCounters};
pub use report::{player_report, player_reports, PlayerReport, StatLine};
