use std::sync::Arc;

use crate::{
    domain::{
        EntityRef, PlayerId, RepoUpdateError,
        player::{Player, PlayerRepository},
        round::{RoundRepository, RoundResultQuery},
    },
    error::{AppError, ValidationError},
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
};

/// Manual correction of a player's lifetime kill count from the MVP panel.
///
/// Round rows stay untouched; the difference is absorbed by `baseline_kills`,
/// so later results and resets keep adding on top of the corrected value.
#[async_trait::async_trait]
pub trait CorrectKillsUseCase {
    async fn correct_kills(&self, player_id: PlayerId, kills: u32) -> Result<Player, AppError>;
}

pub struct CorrectKillsUseCaseImpl<P: PlayerRepository, R: RoundRepository> {
    player_repository: Arc<P>,
    round_repository: Arc<R>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<P: PlayerRepository, R: RoundRepository> CorrectKillsUseCaseImpl<P, R> {
    pub fn new(
        player_repository: Arc<P>,
        round_repository: Arc<R>,
        write_guard: WriteGuard,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            player_repository,
            round_repository,
            write_guard,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<P: PlayerRepository + Send + Sync + 'static, R: RoundRepository + Send + Sync + 'static>
    CorrectKillsUseCase for CorrectKillsUseCaseImpl<P, R>
{
    async fn correct_kills(&self, player_id: PlayerId, kills: u32) -> Result<Player, AppError> {
        let _permit = self.write_guard.acquire(WriteKey::Player(player_id))?;

        let player = self
            .deadline
            .run(self.player_repository.list_players())
            .await?
            .map_err(AppError::read)?
            .into_iter()
            .find(|p| p.id == player_id)
            .ok_or(AppError::NotFound(EntityRef::Player(player_id)))?;
        let recorded: u32 = self
            .deadline
            .run(
                self.round_repository
                    .query_round_results(RoundResultQuery::for_team(player.team_id)),
            )
            .await?
            .map_err(AppError::read)?
            .iter()
            .flat_map(|r| r.player_results.iter())
            .filter(|p| p.player_id == player_id)
            .map(|p| p.kills)
            .sum();
        if kills < recorded {
            return Err(ValidationError::KillsBelowRecorded { recorded }.into());
        }

        let corrected = self
            .deadline
            .run(self.player_repository.rebase_kills(player_id, kills))
            .await?
            .map_err(|e| match e {
                RepoUpdateError::Conflict => {
                    AppError::Validation(ValidationError::KillsBelowRecorded { recorded })
                }
                e => AppError::update(EntityRef::Player(player_id), e),
            })?;
        log::info!(
            "Corrected kills of player {} from {} to {} (baseline {})",
            player_id,
            player.kills,
            corrected.kills,
            corrected.baseline_kills
        );
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        domain::RoundId,
        testing::{InMemoryStore, recompute_workflow},
        workflow::scoring::recompute::RecomputeStandingsWorkflow,
        workflow::scoring::record_result::{
            RecordRoundResult, RecordRoundResultUseCase, RecordRoundResultUseCaseImpl,
        },
    };

    fn use_case(store: &InMemoryStore) -> CorrectKillsUseCaseImpl<InMemoryStore, InMemoryStore> {
        CorrectKillsUseCaseImpl::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            WriteGuard::new(),
            StoreDeadline::default(),
        )
    }

    async fn record(store: &InMemoryStore, round_id: RoundId, player: &Player, kills: i64) {
        let shared = Arc::new(store.clone());
        RecordRoundResultUseCaseImpl::new(
            shared.clone(),
            shared.clone(),
            shared,
            recompute_workflow(store),
            WriteGuard::new(),
            StoreDeadline::default(),
        )
        .record_round_result(RecordRoundResult {
            round_id,
            team_id: player.team_id,
            position: 3,
            player_kills: HashMap::from([(player.id, kills)]),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_correction_moves_the_baseline() {
        let store = InMemoryStore::new();
        let (_, players) = store.seed_team("QW", 4).await;
        let first = store.seed_round("Queda 1").await;
        record(&store, first.id, &players[0], 4).await;

        let corrected = use_case(&store).correct_kills(players[0].id, 10).await.unwrap();
        assert_eq!(corrected.kills, 10);
        assert_eq!(corrected.baseline_kills, 6);

        let second = store.seed_round("Queda 2").await;
        record(&store, second.id, &players[0], 3).await;
        assert_eq!(store.player(players[0].id).kills, 13);

        let report = recompute_workflow(&store).recompute_all().await.unwrap();
        assert_eq!(report.players_updated, 0);
    }

    #[tokio::test]
    async fn test_correction_below_recorded_kills_is_rejected() {
        let store = InMemoryStore::new();
        let (_, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;
        record(&store, round.id, &players[1], 7).await;

        let err = use_case(&store).correct_kills(players[1].id, 5).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::KillsBelowRecorded { recorded: 7 })
        ));
        assert_eq!(store.player(players[1].id).kills, 7);
        assert_eq!(store.player(players[1].id).baseline_kills, 0);
    }

    #[tokio::test]
    async fn test_correction_of_unknown_player() {
        let store = InMemoryStore::new();
        let err = use_case(&store).correct_kills(PlayerId(77), 1).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFound(EntityRef::Player(PlayerId(77)))
        ));
    }
}
