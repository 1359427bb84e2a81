/// Points awarded for finishing positions 1 through 12. Anything worse scores nothing.
pub const POSITION_POINTS: [u32; 12] = [20, 17, 15, 13, 11, 9, 6, 5, 4, 3, 2, 1];

/// Position recorded for every team that finished 13th or worse.
pub const UNPLACED_POSITION: u32 = 13;

pub fn position_points(position: u32) -> u32 {
    match position {
        1..=12 => POSITION_POINTS[(position - 1) as usize],
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("position required")]
    Missing,
}

/// A validated finishing position. Positions past the scoring table collapse
/// into a single "13th or worse" placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placement(u32);

impl Placement {
    pub const UNPLACED: Placement = Placement(UNPLACED_POSITION);

    pub fn from_position(position: u32) -> Result<Self, PlacementError> {
        match position {
            0 => Err(PlacementError::Missing),
            p => Ok(Placement(p.min(UNPLACED_POSITION))),
        }
    }

    pub fn position(&self) -> u32 {
        self.0
    }

    pub fn points(&self) -> u32 {
        position_points(self.0)
    }

    pub fn is_booyah(&self) -> bool {
        self.0 == 1
    }

    pub fn is_unplaced(&self) -> bool {
        self.0 == UNPLACED_POSITION
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unplaced() {
            write!(f, "{}º+", UNPLACED_POSITION)
        } else {
            write!(f, "{}º", self.0)
        }
    }
}

/// Kill counts typed in by an administrator are never negative; anything below
/// zero is recorded as zero.
pub fn clamp_kills(raw: i64) -> u32 {
    raw.clamp(0, u32::MAX as i64) as u32
}

/// What a single team earned in a single round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTally {
    pub placement: Placement,
    pub kills: u32,
}

impl RoundTally {
    pub fn new(placement: Placement, kills: u32) -> Self {
        Self { placement, kills }
    }

    pub fn from_player_kills(placement: Placement, player_kills: impl IntoIterator<Item = i64>) -> Self {
        let kills = player_kills
            .into_iter()
            .map(clamp_kills)
            .fold(0u32, |acc, k| acc.saturating_add(k));
        Self { placement, kills }
    }

    pub fn position_points(&self) -> u32 {
        self.placement.points()
    }

    pub fn booyah(&self) -> bool {
        self.placement.is_booyah()
    }

    pub fn points(&self) -> u32 {
        self.kills.saturating_add(self.position_points())
    }
}
