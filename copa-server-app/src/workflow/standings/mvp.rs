use std::sync::Arc;

use crate::{
    domain::{
        player::{Player, PlayerRepository},
        standings::{MvpEntry, MvpQuery, StandingsService, TeamKillsEntry},
        team::{Team, TeamRepository},
    },
    error::AppError,
    services::deadline::StoreDeadline,
};

#[async_trait::async_trait]
pub trait MvpUseCase {
    /// The first entry is the headline MVP.
    async fn mvp_ranking(&self, query: MvpQuery) -> Result<Vec<MvpEntry>, AppError>;
    async fn team_kills(&self) -> Result<Vec<TeamKillsEntry>, AppError>;
}

pub struct MvpUseCaseImpl<T: TeamRepository, P: PlayerRepository, S: StandingsService> {
    team_repository: Arc<T>,
    player_repository: Arc<P>,
    standings_service: Arc<S>,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, P: PlayerRepository, S: StandingsService> MvpUseCaseImpl<T, P, S> {
    pub fn new(
        team_repository: Arc<T>,
        player_repository: Arc<P>,
        standings_service: Arc<S>,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            team_repository,
            player_repository,
            standings_service,
            deadline,
        }
    }
}

impl<
    T: TeamRepository + Send + Sync + 'static,
    P: PlayerRepository + Send + Sync + 'static,
    S: StandingsService,
> MvpUseCaseImpl<T, P, S>
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
impl<
    T: TeamRepository + Send + Sync + 'static,
    P: PlayerRepository + Send + Sync + 'static,
    S: StandingsService + Send + Sync + 'static,
> MvpUseCase for MvpUseCaseImpl<T, P, S>
{
    async fn mvp_ranking(&self, query: MvpQuery) -> Result<Vec<MvpEntry>, AppError> {
        let (teams, players) = self.load().await?;
        Ok(self.standings_service.mvp_ranking(&players, &teams, &query))
    }

    async fn team_kills(&self) -> Result<Vec<TeamKillsEntry>, AppError> {
        let (teams, players) = self.load().await?;
        Ok(self.standings_service.team_kills(&players, &teams))
    }
}
