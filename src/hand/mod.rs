pub mod classifier;
pub mod position;

pub use classifier::classify;
pub use position::{assign, assign_hand};
