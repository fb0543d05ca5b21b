//! Contest lifecycle data and the leaderboard workflows built on top of it.

pub mod domain;
pub mod leaderboard;
pub mod roster;

pub use domain::{Contest, ContestId, ContestStatus, ContestWindow};
