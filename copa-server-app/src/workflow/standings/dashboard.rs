use std::sync::Arc;

use crate::{
    domain::{
        player::{Player, PlayerRepository},
        team::{Team, TeamRepository, TeamStatus},
    },
    error::AppError,
    services::deadline::StoreDeadline,
};

pub const RECENT_TEAMS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardSummary {
    pub total_teams: usize,
    pub confirmed_teams: usize,
    pub pending_teams: usize,
    pub total_players: usize,
    pub total_kills: u64,
    pub total_booyahs: u64,
    pub recent_teams: Vec<Team>,
}

/// Counters shown on the public home page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicStats {
    pub teams: usize,
    pub players: usize,
    /// Lifetime kills of every player, so it survives a reset that keeps the MVP ranking.
    pub total_kills: u64,
}

#[async_trait::async_trait]
pub trait DashboardUseCase {
    async fn summary(&self) -> Result<DashboardSummary, AppError>;
    async fn public_stats(&self) -> Result<PublicStats, AppError>;
}

pub struct DashboardUseCaseImpl<T: TeamRepository, P: PlayerRepository> {
    team_repository: Arc<T>,
    player_repository: Arc<P>,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, P: PlayerRepository> DashboardUseCaseImpl<T, P> {
    pub fn new(team_repository: Arc<T>, player_repository: Arc<P>, deadline: StoreDeadline) -> Self {
        Self {
            team_repository,
            player_repository,
            deadline,
        }
    }
}

impl<T: TeamRepository + Send + Sync + 'static, P: PlayerRepository + Send + Sync + 'static>
    DashboardUseCaseImpl<T, P>
{
    async fn load(&self) -> Result<(Vec<Team>, Vec<Player>), AppError> {
        futures::try_join!(
            async {
                self.deadline
                    .run(self.team_repository.list_teams())
                    .await?
                    .map_err(AppError::read)
            },
            async {
                self.deadline
                    .run(self.player_repository.list_players())
                    .await?
                    .map_err(AppError::read)
            },
        )
    }
}

#[async_trait::async_trait]
impl<T: TeamRepository + Send + Sync + 'static, P: PlayerRepository + Send + Sync + 'static>
    DashboardUseCase for DashboardUseCaseImpl<T, P>
{
    async fn summary(&self) -> Result<DashboardSummary, AppError> {
        let (mut teams, players) = self.load().await?;

        let count = |status: TeamStatus| teams.iter().filter(|t| t.status == status).count();
        let confirmed_teams = count(TeamStatus::Confirmed);
        let pending_teams = count(TeamStatus::Pending);
        let total_kills = teams.iter().map(|t| t.team_kills as u64).sum();
        let total_booyahs = teams.iter().map(|t| t.booyahs as u64).sum();
        let total_teams = teams.len();

        teams.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        teams.truncate(RECENT_TEAMS);

        Ok(DashboardSummary {
            total_teams,
            confirmed_teams,
            pending_teams,
            total_players: players.len(),
            total_kills,
            total_booyahs,
            recent_teams: teams,
        })
    }

    async fn public_stats(&self) -> Result<PublicStats, AppError> {
        let (teams, players) = self.load().await?;
        Ok(PublicStats {
            teams: teams.len(),
            players: players.len(),
            total_kills: players.iter().map(|p| p.kills as u64).sum(),
        })
    }
}
