use std::sync::Arc;

use copa_core::TeamTotals;

use crate::{
    domain::{
        round::{RoundRepository, RoundResultQuery},
        standings::{StandingsFilter, StandingsService, TeamStanding},
        team::{Team, TeamRepository},
    },
    error::AppError,
    services::deadline::StoreDeadline,
};

#[async_trait::async_trait]
pub trait GetStandingsUseCase {
    /// Totals are rebuilt from the round results on every call; stored
    /// aggregates that disagree are logged, not trusted.
    async fn standings(&self, filter: StandingsFilter) -> Result<Vec<TeamStanding>, AppError>;
    async fn groups(&self) -> Result<Vec<String>, AppError>;
}

pub struct GetStandingsUseCaseImpl<T: TeamRepository, R: RoundRepository, S: StandingsService> {
    team_repository: Arc<T>,
    round_repository: Arc<R>,
    standings_service: Arc<S>,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, R: RoundRepository, S: StandingsService> GetStandingsUseCaseImpl<T, R, S> {
    pub fn new(
        team_repository: Arc<T>,
        round_repository: Arc<R>,
        standings_service: Arc<S>,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            team_repository,
            round_repository,
            standings_service,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<
    T: TeamRepository + Send + Sync + 'static,
    R: RoundRepository + Send + Sync + 'static,
    S: StandingsService + Send + Sync + 'static,
> GetStandingsUseCase for GetStandingsUseCaseImpl<T, R, S>
{
    async fn standings(&self, filter: StandingsFilter) -> Result<Vec<TeamStanding>, AppError> {
        let (teams, results) = futures::try_join!(
            async {
                self.deadline
                    .run(self.team_repository.list_teams())
                    .await?
                    .map_err(AppError::read)
            },
            async {
                self.deadline
                    .run(
                        self.round_repository
                            .query_round_results(RoundResultQuery::all()),
                    )
                    .await?
                    .map_err(AppError::read)
            },
        )?;

        let with_totals: Vec<(Team, TeamTotals)> = teams
            .into_iter()
            .map(|team| {
                let computed = self.standings_service.compute_totals(&team, &results);
                if let Some(warning) = self.standings_service.check_team(&team, &computed) {
                    log::warn!("Inconsistent aggregate: {}", warning);
                }
                (team, computed)
            })
            .collect();
        Ok(self.standings_service.rank_teams(with_totals, &filter))
    }

    async fn groups(&self) -> Result<Vec<String>, AppError> {
        let teams = self
            .deadline
            .run(self.team_repository.list_teams())
            .await?
            .map_err(AppError::read)?;
        Ok(self.standings_service.group_names(&teams))
    }
}

#[cfg(test)]
mod tests {
    use copa_core::Placement;

    use super::*;
    use crate::{
        domain::{
            PlayerId, TeamId, round::RoundResultWrite, standings::StandingsServiceImpl,
            team::TeamStatus,
        },
        testing::InMemoryStore,
    };

    fn use_case(
        store: &InMemoryStore,
    ) -> GetStandingsUseCaseImpl<InMemoryStore, InMemoryStore, StandingsServiceImpl> {
        GetStandingsUseCaseImpl::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(StandingsServiceImpl::new()),
            StoreDeadline::default(),
        )
    }

    async fn record(store: &InMemoryStore, round: &str, entries: &[(TeamId, u32, PlayerId, i64)]) {
        let round = store.seed_round(round).await;
        for (team_id, position, player_id, kills) in entries {
            store
                .upsert_round_result(RoundResultWrite::new(
                    round.id,
                    *team_id,
                    Placement::from_position(*position).unwrap(),
                    vec![(*player_id, *kills)],
                ))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_booyahs_break_point_ties() {
        let store = InMemoryStore::new();
        let (a, a_players) = store.seed_team("AAA", 4).await;
        let (b, b_players) = store.seed_team("BBB", 4).await;
        // A: 20 + 17 + 13 = 50 points with 0 kills, one booyah.
        // B: two booyahs (40) and 10 kills = 50 points.
        record(
            &store,
            "Queda 1",
            &[(a.id, 1, a_players[0].id, 0), (b.id, 1, b_players[0].id, 5)],
        )
        .await;
        record(
            &store,
            "Queda 2",
            &[(a.id, 2, a_players[0].id, 0), (b.id, 1, b_players[0].id, 5)],
        )
        .await;
        record(&store, "Queda 3", &[(a.id, 4, a_players[0].id, 0)]).await;

        let standings = use_case(&store)
            .standings(StandingsFilter::Overall)
            .await
            .unwrap();
        assert_eq!(standings[0].totals.total_points, 50);
        assert_eq!(standings[1].totals.total_points, 50);
        assert_eq!(standings[0].team.id, b.id);
        assert_eq!(standings[0].rank, 1);
        assert_eq!(standings[1].team.id, a.id);
        assert_eq!(standings[1].rank, 2);
    }

    #[tokio::test]
    async fn test_group_filter_and_rejected_teams() {
        let store = InMemoryStore::new();
        let (a, _) = store.seed_team("AAA", 4).await;
        let (b, _) = store.seed_team("BBB", 4).await;
        let (c, _) = store.seed_team("CCC", 4).await;
        store
            .set_group(a.id, Some("GRUPO A".to_string()))
            .await
            .unwrap();
        store
            .set_group(b.id, Some("GRUPO B".to_string()))
            .await
            .unwrap();
        store
            .set_group(c.id, Some("GRUPO A".to_string()))
            .await
            .unwrap();
        store
            .set_status(c.id, TeamStatus::Rejected)
            .await
            .unwrap();
        let use_case = use_case(&store);

        assert_eq!(
            use_case.groups().await.unwrap(),
            vec!["GRUPO A".to_string(), "GRUPO B".to_string()]
        );
        let overall = use_case
            .standings(StandingsFilter::from_label(Some("GERAL")))
            .await
            .unwrap();
        assert_eq!(overall.len(), 2);
        let group_a = use_case
            .standings(StandingsFilter::Group("GRUPO A".to_string()))
            .await
            .unwrap();
        assert_eq!(group_a.len(), 1);
        assert_eq!(group_a[0].team.id, a.id);
    }
}
