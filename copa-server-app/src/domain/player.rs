use crate::domain::{PlayerId, RepoError, RepoUpdateError, TeamId};

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub team_id: TeamId,
    pub name: String,
    /// Lifetime kills: `baseline_kills` plus everything recorded in the current rounds.
    pub kills: u32,
    pub is_reserve: bool,
    /// Kills carried over from rounds that were cleared by a reset keeping the MVP ranking.
    pub baseline_kills: u32,
}

#[async_trait::async_trait]
pub trait PlayerRepository {
    async fn list_players(&self) -> Result<Vec<Player>, RepoError>;
    async fn list_team_players(&self, team_id: TeamId) -> Result<Vec<Player>, RepoError>;
    async fn store_kills(&self, kills: Vec<(PlayerId, u32)>) -> Result<(), RepoUpdateError>;
    /// Sets `kills` to `target` by moving the baseline to `target - Σ round kills`,
    /// reading the round rows in the same transaction. `Conflict` when the recorded
    /// rounds alone already exceed `target`.
    async fn rebase_kills(&self, player_id: PlayerId, target: u32)
    -> Result<Player, RepoUpdateError>;
}
