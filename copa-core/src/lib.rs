pub mod ordering;
pub mod scoring;
pub mod totals;

pub use ordering::{MvpKey, StandingKey, sort_mvp, sort_standings};
pub use scoring::{Placement, PlacementError, RoundTally, clamp_kills, position_points};
pub use totals::TeamTotals;
