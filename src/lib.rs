//! Poker hand-history statistics: positions, street action classification, per-player
//! counters, identity resolution and merge-candidate scanning, served over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod hand;
pub mod identity;
pub mod state;
pub mod stats;
pub mod types;
