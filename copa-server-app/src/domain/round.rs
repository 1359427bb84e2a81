use chrono::{DateTime, Utc};
use copa_core::{Placement, RoundTally, clamp_kills};

use crate::domain::{
    PlayerId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, RoundId,
    RoundResultId, TeamId,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    pub id: RoundId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerRoundResult {
    pub player_id: PlayerId,
    pub kills: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoundResult {
    pub id: RoundResultId,
    pub round_id: RoundId,
    pub team_id: TeamId,
    pub position: u32,
    pub position_points: u32,
    pub kills: u32,
    pub booyah: bool,
    pub player_results: Vec<PlayerRoundResult>,
}

impl RoundResult {
    /// Tally derived from the stored position and the per-player rows, ignoring the
    /// denormalized `position_points`, `kills` and `booyah` columns.
    pub fn tally(&self) -> RoundTally {
        let placement = Placement::from_position(self.position).unwrap_or(Placement::UNPLACED);
        let kills = self
            .player_results
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.kills));
        RoundTally::new(placement, kills)
    }
}

/// Everything needed to upsert one team's result in one round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundResultWrite {
    pub round_id: RoundId,
    pub team_id: TeamId,
    pub position: u32,
    pub position_points: u32,
    pub kills: u32,
    pub booyah: bool,
    pub player_kills: Vec<(PlayerId, u32)>,
}

impl RoundResultWrite {
    pub fn new(
        round_id: RoundId,
        team_id: TeamId,
        placement: Placement,
        player_kills: impl IntoIterator<Item = (PlayerId, i64)>,
    ) -> Self {
        let mut player_kills: Vec<(PlayerId, u32)> = player_kills
            .into_iter()
            .map(|(id, kills)| (id, clamp_kills(kills)))
            .collect();
        player_kills.sort_by_key(|(id, _)| *id);
        let tally = RoundTally::from_player_kills(
            placement,
            player_kills.iter().map(|(_, kills)| *kills as i64),
        );
        Self {
            round_id,
            team_id,
            position: placement.position(),
            position_points: tally.position_points(),
            kills: tally.kills,
            booyah: tally.booyah(),
            player_kills,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RoundResultQuery {
    pub round_id: Option<RoundId>,
    pub team_id: Option<TeamId>,
}

impl RoundResultQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_round(round_id: RoundId) -> Self {
        Self {
            round_id: Some(round_id),
            team_id: None,
        }
    }

    pub fn for_team(team_id: TeamId) -> Self {
        Self {
            round_id: None,
            team_id: Some(team_id),
        }
    }
}

/// What happens to per-player kill baselines when the rounds are cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// `baseline_kills = baseline_kills + Σ round kills`, read from the rows being
    /// cleared; the MVP ranking survives the reset.
    KeepMvp,
    /// `baseline_kills = 0` and `kills = 0`.
    Clear,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub rounds_removed: u64,
    pub round_results_removed: u64,
    pub player_round_results_removed: u64,
    pub players_rebased: u64,
}

#[async_trait::async_trait]
pub trait RoundRepository {
    async fn create_round(&self, name: String) -> Result<Round, RepoCreateError>;
    async fn get_round(&self, round_id: RoundId) -> Result<Round, RepoRetrieveError>;
    /// Oldest first.
    async fn list_rounds(&self) -> Result<Vec<Round>, RepoError>;
    /// Removes the round's player results, then its results, then the round, and
    /// re-derives the kills of the players who had rows in it, in one transaction.
    async fn delete_round(&self, round_id: RoundId) -> Result<(), RepoUpdateError>;
    /// Upserts the result keyed by `(round_id, team_id)` and its player rows keyed by
    /// `(round_result_id, player_id)` in one transaction. Player rows of the result
    /// that are absent from the write are removed. The kills of every player on the
    /// team are re-derived as `baseline_kills + Σ round kills` before commit.
    async fn upsert_round_result(
        &self,
        write: RoundResultWrite,
    ) -> Result<RoundResult, RepoUpdateError>;
    async fn query_round_results(
        &self,
        query: RoundResultQuery,
    ) -> Result<Vec<RoundResult>, RepoError>;
    /// Rebases player kills according to `policy`, deletes every player result, result
    /// and round, and zeroes the team aggregates. All or nothing.
    async fn reset_rounds(&self, policy: BaselinePolicy) -> Result<ResetSummary, RepoUpdateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_result_write_computes_tally() {
        let write = RoundResultWrite::new(
            RoundId(1),
            TeamId(7),
            Placement::from_position(1).unwrap(),
            [
                (PlayerId(4), 2),
                (PlayerId(1), 5),
                (PlayerId(3), 0),
                (PlayerId(2), 3),
            ],
        );
        assert_eq!(write.position, 1);
        assert_eq!(write.position_points, 20);
        assert_eq!(write.kills, 10);
        assert!(write.booyah);
        assert_eq!(write.player_kills[0], (PlayerId(1), 5));
    }

    #[test]
    fn test_round_result_write_unplaced() {
        let write = RoundResultWrite::new(
            RoundId(1),
            TeamId(7),
            Placement::from_position(13).unwrap(),
            [(PlayerId(1), -4), (PlayerId(2), 1)],
        );
        assert_eq!(write.position_points, 0);
        assert!(!write.booyah);
        assert_eq!(write.kills, 1);
        assert_eq!(write.player_kills, vec![(PlayerId(1), 0), (PlayerId(2), 1)]);
    }
}
