use crate::scoring::RoundTally;

/// Aggregate standing of a team. Always computed from the full set of its
/// rounds, never patched incrementally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeamTotals {
    pub team_kills: u32,
    pub position_points: u32,
    pub booyahs: u32,
    pub penalty_points: u32,
    pub total_points: i64,
}

impl TeamTotals {
    pub fn from_rounds<I>(rounds: I, penalty_points: u32) -> Self
    where
        I: IntoIterator<Item = RoundTally>,
    {
        let mut totals = TeamTotals {
            penalty_points,
            ..Default::default()
        };
        for round in rounds {
            totals.team_kills = totals.team_kills.saturating_add(round.kills);
            totals.position_points = totals
                .position_points
                .saturating_add(round.position_points());
            if round.booyah() {
                totals.booyahs += 1;
            }
        }
        totals.total_points = Self::total(totals.team_kills, totals.position_points, penalty_points);
        totals
    }

    /// Totals of a team that has no recorded rounds.
    pub fn empty(penalty_points: u32) -> Self {
        Self::from_rounds(std::iter::empty(), penalty_points)
    }

    /// `kills + position points - penalty`, the single formula used by every view.
    pub fn total(team_kills: u32, position_points: u32, penalty_points: u32) -> i64 {
        team_kills as i64 + position_points as i64 - penalty_points as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Placement;

    fn tally(position: u32, kills: u32) -> RoundTally {
        RoundTally::new(Placement::from_position(position).unwrap(), kills)
    }

    #[test]
    fn test_single_round_totals() {
        let totals = TeamTotals::from_rounds([tally(1, 10)], 0);
        assert_eq!(
            totals,
            TeamTotals {
                team_kills: 10,
                position_points: 20,
                booyahs: 1,
                penalty_points: 0,
                total_points: 30,
            }
        );
    }

    #[test]
    fn test_multiple_rounds_with_penalty() {
        let totals = TeamTotals::from_rounds([tally(1, 4), tally(3, 6), tally(13, 2), tally(1, 0)], 5);
        assert_eq!(totals.team_kills, 12);
        assert_eq!(totals.position_points, 20 + 15 + 0 + 20);
        assert_eq!(totals.booyahs, 2);
        assert_eq!(totals.total_points, 12 + 55 - 5);
    }

    #[test]
    fn test_empty_totals_can_go_negative() {
        let totals = TeamTotals::empty(3);
        assert_eq!(totals.team_kills, 0);
        assert_eq!(totals.booyahs, 0);
        assert_eq!(totals.total_points, -3);
    }
}
