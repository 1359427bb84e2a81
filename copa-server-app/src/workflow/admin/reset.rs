use std::sync::Arc;

use crate::{
    domain::{
        EntityRef,
        round::{BaselinePolicy, ResetSummary, RoundRepository},
    },
    error::AppError,
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
};

/// Clears every round in a single store transaction. Nothing is removed when
/// any step fails.
#[async_trait::async_trait]
pub trait ResetTournamentWorkflow {
    /// Folds each player's recorded round kills into `baseline_kills` before clearing.
    async fn reset_keeping_mvp(&self) -> Result<ResetSummary, AppError>;
    /// Clears rounds and every player's kill count.
    async fn reset_system(&self) -> Result<ResetSummary, AppError>;
}

pub struct ResetTournamentWorkflowImpl<R: RoundRepository> {
    round_repository: Arc<R>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<R: RoundRepository> ResetTournamentWorkflowImpl<R> {
    pub fn new(round_repository: Arc<R>, write_guard: WriteGuard, deadline: StoreDeadline) -> Self {
        Self {
            round_repository,
            write_guard,
            deadline,
        }
    }
}

impl<R: RoundRepository + Send + Sync + 'static> ResetTournamentWorkflowImpl<R> {
    async fn reset(&self, policy: BaselinePolicy) -> Result<ResetSummary, AppError> {
        let _permit = self.write_guard.acquire(WriteKey::Reset)?;
        let summary = self
            .deadline
            .run(self.round_repository.reset_rounds(policy))
            .await?
            .map_err(|e| AppError::update(EntityRef::Rounds, e))?;
        log::info!(
            "Tournament reset ({:?}): {} rounds, {} results, {} player results removed, {} players rebased",
            policy,
            summary.rounds_removed,
            summary.round_results_removed,
            summary.player_round_results_removed,
            summary.players_rebased
        );
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl<R: RoundRepository + Send + Sync + 'static> ResetTournamentWorkflow
    for ResetTournamentWorkflowImpl<R>
{
    async fn reset_keeping_mvp(&self) -> Result<ResetSummary, AppError> {
        self.reset(BaselinePolicy::KeepMvp).await
    }

    async fn reset_system(&self) -> Result<ResetSummary, AppError> {
        self.reset(BaselinePolicy::Clear).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        domain::{player::Player, team::Team},
        testing::{InMemoryStore, recompute_workflow},
        workflow::scoring::record_result::{
            RecordRoundResult, RecordRoundResultUseCase, RecordRoundResultUseCaseImpl,
        },
    };

    async fn played() -> (InMemoryStore, Team, Vec<Player>) {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let shared = Arc::new(store.clone());
        let record = RecordRoundResultUseCaseImpl::new(
            shared.clone(),
            shared.clone(),
            shared,
            recompute_workflow(&store),
            WriteGuard::new(),
            StoreDeadline::default(),
        );
        for (name, position, kills) in [("Queda 1", 1, 6), ("Queda 2", 5, 3)] {
            let round = store.seed_round(name).await;
            record
                .record_round_result(RecordRoundResult {
                    round_id: round.id,
                    team_id: team.id,
                    position,
                    player_kills: HashMap::from([(players[0].id, kills)]),
                })
                .await
                .unwrap();
        }
        (store, team, players)
    }

    fn workflow(store: &InMemoryStore) -> ResetTournamentWorkflowImpl<InMemoryStore> {
        ResetTournamentWorkflowImpl::new(
            Arc::new(store.clone()),
            WriteGuard::new(),
            StoreDeadline::default(),
        )
    }

    #[tokio::test]
    async fn test_reset_keeping_mvp_preserves_kills() {
        let (store, team, players) = played().await;
        assert_eq!(store.player(players[0].id).kills, 9);

        let summary = workflow(&store).reset_keeping_mvp().await.unwrap();
        assert_eq!(summary.rounds_removed, 2);
        assert_eq!(summary.round_results_removed, 2);
        assert_eq!(summary.player_round_results_removed, 2);

        assert_eq!(store.round_count(), 0);
        assert_eq!(store.result_count(), 0);
        let stored = store.team(team.id);
        assert_eq!(stored.total_points, 0);
        assert_eq!(stored.booyahs, 0);
        let player = store.player(players[0].id);
        assert_eq!(player.kills, 9);
        assert_eq!(player.baseline_kills, 9);

        let shared = Arc::new(store.clone());
        let round = store.seed_round("Queda 3").await;
        RecordRoundResultUseCaseImpl::new(
            shared.clone(),
            shared.clone(),
            shared,
            recompute_workflow(&store),
            WriteGuard::new(),
            StoreDeadline::default(),
        )
        .record_round_result(RecordRoundResult {
            round_id: round.id,
            team_id: team.id,
            position: 2,
            player_kills: HashMap::from([(players[0].id, 2)]),
        })
        .await
        .unwrap();
        assert_eq!(store.player(players[0].id).kills, 11);
        assert_eq!(store.team(team.id).total_points, 17 + 2);
    }

    #[tokio::test]
    async fn test_reset_keeping_mvp_ignores_stale_stored_kills() {
        let (store, _, players) = played().await;
        store.corrupt_player_kills(players[0].id, 0);

        workflow(&store).reset_keeping_mvp().await.unwrap();

        let player = store.player(players[0].id);
        assert_eq!(player.baseline_kills, 9);
        assert_eq!(player.kills, 9);
    }

    #[tokio::test]
    async fn test_reset_system_clears_kills() {
        let (store, team, players) = played().await;

        workflow(&store).reset_system().await.unwrap();

        assert_eq!(store.round_count(), 0);
        assert_eq!(store.team(team.id).team_kills, 0);
        let player = store.player(players[0].id);
        assert_eq!(player.kills, 0);
        assert_eq!(player.baseline_kills, 0);
    }

    #[tokio::test]
    async fn test_failed_reset_changes_nothing_and_is_reported() {
        let (store, team, players) = played().await;
        store.fail_writes(true);

        let err = workflow(&store).reset_system().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::StoreWrite {
                entity: EntityRef::Rounds,
                ..
            }
        ));
        assert_eq!(store.round_count(), 2);
        assert_eq!(store.result_count(), 2);
        assert_eq!(store.team(team.id).total_points, 20 + 11 + 9);
        assert_eq!(store.player(players[0].id).kills, 9);
    }
}
