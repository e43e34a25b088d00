pub mod merge;
pub mod registry;

pub use merge::{scan, MergeCandidate, MergeMember};
pub use registry::{AliasAssignment, IdentityRegistry, PlayerIdentity};
