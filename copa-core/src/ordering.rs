use std::cmp::Ordering;

/// Sort key of the general standings: total points, then BOOYAH count, then
/// team kills, all descending. Registration order (ascending id) settles the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StandingKey {
    pub total_points: i64,
    pub booyahs: u32,
    pub team_kills: u32,
    pub id: i64,
}

impl Ord for StandingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total_points
            .cmp(&self.total_points)
            .then_with(|| other.booyahs.cmp(&self.booyahs))
            .then_with(|| other.team_kills.cmp(&self.team_kills))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for StandingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MvpKey {
    pub kills: u32,
    pub id: i64,
}

impl Ord for MvpKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other.kills.cmp(&self.kills).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for MvpKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn sort_standings<T>(items: &mut [T], key: impl Fn(&T) -> StandingKey) {
    items.sort_by_key(key);
}

pub fn sort_mvp<T>(items: &mut [T], key: impl Fn(&T) -> MvpKey) {
    items.sort_by_key(key);
}
