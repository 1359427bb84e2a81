use std::{collections::HashMap, sync::Arc};

use crate::{
    domain::{
        TeamId,
        player::{Player, PlayerRepository},
        team::{Team, TeamRepository, TeamStatus},
    },
    error::AppError,
    services::deadline::StoreDeadline,
};

#[derive(Clone, Debug, PartialEq)]
pub struct TeamWithPlayers {
    pub team: Team,
    pub players: Vec<Player>,
}

#[async_trait::async_trait]
pub trait ListTeamsUseCase {
    /// Newest registrations first.
    async fn list_teams(&self, status: Option<TeamStatus>)
    -> Result<Vec<TeamWithPlayers>, AppError>;
}

pub struct ListTeamsUseCaseImpl<T: TeamRepository, P: PlayerRepository> {
    team_repository: Arc<T>,
    player_repository: Arc<P>,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, P: PlayerRepository> ListTeamsUseCaseImpl<T, P> {
    pub fn new(team_repository: Arc<T>, player_repository: Arc<P>, deadline: StoreDeadline) -> Self {
        Self {
            team_repository,
            player_repository,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<T: TeamRepository + Send + Sync + 'static, P: PlayerRepository + Send + Sync + 'static>
    ListTeamsUseCase for ListTeamsUseCaseImpl<T, P>
{
    async fn list_teams(
        &self,
        status: Option<TeamStatus>,
    ) -> Result<Vec<TeamWithPlayers>, AppError> {
        let (teams, players) = futures::try_join!(
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
        )?;

        let mut rosters: HashMap<TeamId, Vec<Player>> = HashMap::new();
        for player in players {
            rosters.entry(player.team_id).or_default().push(player);
        }

        let mut listed: Vec<TeamWithPlayers> = teams
            .into_iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .map(|team| {
                let mut players = rosters.remove(&team.id).unwrap_or_default();
                players.sort_by_key(|p| p.id);
                TeamWithPlayers { team, players }
            })
            .collect();
        listed.sort_by(|a, b| {
            b.team
                .created_at
                .cmp(&a.team.created_at)
                .then_with(|| b.team.id.cmp(&a.team.id))
        });
        Ok(listed)
    }
}
