use std::sync::Arc;

use crate::{
    domain::{
        EntityRef, RoundId,
        round::{Round, RoundRepository, RoundResultQuery},
        standings::{RoundStandingEntry, StandingsService},
        team::TeamRepository,
    },
    error::AppError,
    services::deadline::StoreDeadline,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RoundStandings {
    pub round: Round,
    pub entries: Vec<RoundStandingEntry>,
}

#[async_trait::async_trait]
pub trait RoundStandingsUseCase {
    async fn round_standings(&self, round_id: RoundId) -> Result<RoundStandings, AppError>;
}

pub struct RoundStandingsUseCaseImpl<T: TeamRepository, R: RoundRepository, S: StandingsService> {
    team_repository: Arc<T>,
    round_repository: Arc<R>,
    standings_service: Arc<S>,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, R: RoundRepository, S: StandingsService> RoundStandingsUseCaseImpl<T, R, S> {
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
> RoundStandingsUseCase for RoundStandingsUseCaseImpl<T, R, S>
{
    async fn round_standings(&self, round_id: RoundId) -> Result<RoundStandings, AppError> {
        let round = self
            .deadline
            .run(self.round_repository.get_round(round_id))
            .await?
            .map_err(|e| AppError::retrieve(EntityRef::Round(round_id), e))?;
        let teams = self
            .deadline
            .run(self.team_repository.list_teams())
            .await?
            .map_err(AppError::read)?;
        let results = self
            .deadline
            .run(
                self.round_repository
                    .query_round_results(RoundResultQuery::for_round(round_id)),
            )
            .await?
            .map_err(AppError::read)?;

        Ok(RoundStandings {
            round,
            entries: self.standings_service.round_view(&teams, &results),
        })
    }
}

#[cfg(test)]
mod tests {
    use copa_core::Placement;

    use super::*;
    use crate::{
        domain::{
            round::RoundResultWrite,
            standings::{RoundOutcome, StandingsServiceImpl},
        },
        testing::InMemoryStore,
    };

    #[tokio::test]
    async fn test_round_view_lists_recorded_then_pending() {
        let store = InMemoryStore::new();
        let (qw, qw_players) = store.seed_team("QW", 4).await;
        let (ks, _) = store.seed_team("KS", 4).await;
        let round = store.seed_round("Queda 1").await;
        let other_round = store.seed_round("Queda 2").await;
        store
            .upsert_round_result(RoundResultWrite::new(
                round.id,
                qw.id,
                Placement::from_position(2).unwrap(),
                vec![(qw_players[0].id, 6)],
            ))
            .await
            .unwrap();

        let use_case = RoundStandingsUseCaseImpl::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(StandingsServiceImpl::new()),
            StoreDeadline::default(),
        );

        let view = use_case.round_standings(round.id).await.unwrap();
        assert_eq!(view.round.name, "Queda 1");
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.entries[0].team_id, qw.id);
        assert_eq!(
            view.entries[0].outcome,
            RoundOutcome::Recorded {
                position: 2,
                position_points: 17,
                kills: 6,
                booyah: false
            }
        );
        assert_eq!(view.entries[1].team_id, ks.id);
        assert_eq!(view.entries[1].outcome, RoundOutcome::Pending);

        let empty = use_case.round_standings(other_round.id).await.unwrap();
        assert!(
            empty
                .entries
                .iter()
                .all(|e| e.outcome == RoundOutcome::Pending)
        );

        let err = use_case.round_standings(RoundId(77)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(EntityRef::Round(RoundId(77)))));
    }
}
