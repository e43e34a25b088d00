pub mod engine;

pub use engine::{BatchReport, PendingBatch, SkippedHand, StatsEngine};
