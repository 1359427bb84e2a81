use std::{collections::HashMap, sync::Arc};

use copa_core::{Placement, TeamTotals};

use crate::{
    domain::{
        EntityRef, PlayerId, RoundId, TeamId,
        player::PlayerRepository,
        round::{RoundRepository, RoundResult, RoundResultWrite},
        team::TeamRepository,
    },
    error::{AppError, ValidationError},
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
    workflow::scoring::recompute::{RecomputeReport, RecomputeStandingsWorkflow},
};

#[derive(Clone, Debug)]
pub struct RecordRoundResult {
    pub round_id: RoundId,
    pub team_id: TeamId,
    /// Finishing position as entered; 0 means the field was left empty.
    pub position: u32,
    pub player_kills: HashMap<PlayerId, i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedResult {
    pub result: RoundResult,
    pub totals: TeamTotals,
    pub report: RecomputeReport,
}

#[async_trait::async_trait]
pub trait RecordRoundResultUseCase {
    async fn record_round_result(
        &self,
        command: RecordRoundResult,
    ) -> Result<RecordedResult, AppError>;
}

pub struct RecordRoundResultUseCaseImpl<
    T: TeamRepository,
    P: PlayerRepository,
    R: RoundRepository,
    RW: RecomputeStandingsWorkflow,
> {
    team_repository: Arc<T>,
    player_repository: Arc<P>,
    round_repository: Arc<R>,
    recompute_workflow: Arc<RW>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, P: PlayerRepository, R: RoundRepository, RW: RecomputeStandingsWorkflow>
    RecordRoundResultUseCaseImpl<T, P, R, RW>
{
    pub fn new(
        team_repository: Arc<T>,
        player_repository: Arc<P>,
        round_repository: Arc<R>,
        recompute_workflow: Arc<RW>,
        write_guard: WriteGuard,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            team_repository,
            player_repository,
            round_repository,
            recompute_workflow,
            write_guard,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<
    T: TeamRepository + Send + Sync + 'static,
    P: PlayerRepository + Send + Sync + 'static,
    R: RoundRepository + Send + Sync + 'static,
    RW: RecomputeStandingsWorkflow + Send + Sync + 'static,
> RecordRoundResultUseCase for RecordRoundResultUseCaseImpl<T, P, R, RW>
{
    async fn record_round_result(
        &self,
        command: RecordRoundResult,
    ) -> Result<RecordedResult, AppError> {
        let RecordRoundResult {
            round_id,
            team_id,
            position,
            player_kills,
        } = command;

        let placement =
            Placement::from_position(position).map_err(|_| ValidationError::PositionRequired)?;
        if player_kills.is_empty() {
            return Err(ValidationError::PlayerKillsRequired.into());
        }

        let _permit = self
            .write_guard
            .acquire(WriteKey::RoundResult(round_id, team_id))?;

        self.deadline
            .run(self.round_repository.get_round(round_id))
            .await?
            .map_err(|e| AppError::retrieve(EntityRef::Round(round_id), e))?;
        self.deadline
            .run(self.team_repository.get_team(team_id))
            .await?
            .map_err(|e| AppError::retrieve(EntityRef::Team(team_id), e))?;

        let roster = self
            .deadline
            .run(self.player_repository.list_team_players(team_id))
            .await?
            .map_err(AppError::read)?;
        if let Some(stranger) = player_kills
            .keys()
            .find(|id| !roster.iter().any(|p| p.id == **id))
        {
            return Err(ValidationError::PlayerNotOnRoster {
                player_id: *stranger,
                team_id,
            }
            .into());
        }

        let write = RoundResultWrite::new(round_id, team_id, placement, player_kills);
        let result = self
            .deadline
            .run(self.round_repository.upsert_round_result(write))
            .await?
            .map_err(|e| AppError::update(EntityRef::RoundResult { round_id, team_id }, e))?;
        log::info!(
            "Recorded team {} in round {}: position {}, {} kills, {} points",
            team_id,
            round_id,
            result.position,
            result.kills,
            result.position_points
        );

        let report = self.recompute_workflow.recompute_team(team_id).await?;
        let totals = self
            .deadline
            .run(self.team_repository.get_team(team_id))
            .await?
            .map_err(|e| AppError::retrieve(EntityRef::Team(team_id), e))?
            .stored_totals();

        Ok(RecordedResult {
            result,
            totals,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        testing::{InMemoryStore, TestRecompute, recompute_workflow},
        workflow::admin::reset::{ResetTournamentWorkflow, ResetTournamentWorkflowImpl},
    };

    fn use_case(
        store: &InMemoryStore,
    ) -> RecordRoundResultUseCaseImpl<InMemoryStore, InMemoryStore, InMemoryStore, TestRecompute>
    {
        let recompute = recompute_workflow(store);
        let store = Arc::new(store.clone());
        RecordRoundResultUseCaseImpl::new(
            store.clone(),
            store.clone(),
            store,
            recompute,
            WriteGuard::new(),
            StoreDeadline::default(),
        )
    }

    fn command(
        round_id: RoundId,
        team_id: TeamId,
        position: u32,
        kills: &[(PlayerId, i64)],
    ) -> RecordRoundResult {
        RecordRoundResult {
            round_id,
            team_id,
            position,
            player_kills: kills.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn test_queen_warriors_booyah_with_ten_kills() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;

        let recorded = use_case(&store)
            .record_round_result(command(
                round.id,
                team.id,
                1,
                &[(players[0].id, 4), (players[1].id, 3), (players[2].id, 3)],
            ))
            .await
            .unwrap();

        assert_eq!(recorded.result.position_points, 20);
        assert_eq!(recorded.result.kills, 10);
        assert!(recorded.result.booyah);
        assert_eq!(recorded.totals.total_points, 30);
        assert_eq!(recorded.totals.booyahs, 1);
        assert_eq!(store.player(players[0].id).kills, 4);
        assert_eq!(store.player(players[3].id).kills, 0);
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;
        let use_case = use_case(&store);
        let entry = command(round.id, team.id, 3, &[(players[0].id, 2), (players[1].id, 5)]);

        let first = use_case.record_round_result(entry.clone()).await.unwrap();
        let second = use_case.record_round_result(entry).await.unwrap();

        assert_eq!(first.result.id, second.result.id);
        assert_eq!(first.totals, second.totals);
        assert_eq!(second.totals.total_points, 15 + 7);
        assert_eq!(store.result_count(), 1);
        assert_eq!(store.player_result_count(), 2);
        assert_eq!(store.player(players[1].id).kills, 5);
    }

    #[tokio::test]
    async fn test_resubmission_replaces_previous_entry() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 5).await;
        let round = store.seed_round("Queda 1").await;
        let use_case = use_case(&store);

        use_case
            .record_round_result(command(
                round.id,
                team.id,
                1,
                &[(players[0].id, 8), (players[4].id, 2)],
            ))
            .await
            .unwrap();
        let corrected = use_case
            .record_round_result(command(round.id, team.id, 4, &[(players[0].id, 3)]))
            .await
            .unwrap();

        assert_eq!(corrected.totals.total_points, 13 + 3);
        assert_eq!(corrected.totals.booyahs, 0);
        assert_eq!(store.player_result_count(), 1);
        assert_eq!(store.player(players[4].id).kills, 0);
    }

    #[tokio::test]
    async fn test_thirteenth_or_worse_scores_kills_only() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;

        let recorded = use_case(&store)
            .record_round_result(command(round.id, team.id, 40, &[(players[0].id, 5)]))
            .await
            .unwrap();

        assert_eq!(recorded.result.position, 13);
        assert_eq!(recorded.result.position_points, 0);
        assert_eq!(recorded.totals.total_points, 5);
    }

    #[tokio::test]
    async fn test_negative_kills_are_clamped() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;

        let recorded = use_case(&store)
            .record_round_result(command(
                round.id,
                team.id,
                2,
                &[(players[0].id, -3), (players[1].id, 2)],
            ))
            .await
            .unwrap();

        assert_eq!(recorded.result.kills, 2);
        assert_eq!(store.player(players[0].id).kills, 0);
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_write() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let (other, other_players) = store.seed_team("KS", 4).await;
        let round = store.seed_round("Queda 1").await;
        let use_case = use_case(&store);

        let err = use_case
            .record_round_result(command(round.id, team.id, 0, &[(players[0].id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PositionRequired)
        ));

        let err = use_case
            .record_round_result(command(round.id, team.id, 2, &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PlayerKillsRequired)
        ));

        let err = use_case
            .record_round_result(command(round.id, other.id, 2, &[(players[0].id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PlayerNotOnRoster { .. })
        ));

        let err = use_case
            .record_round_result(command(
                RoundId(999),
                other.id,
                2,
                &[(other_players[0].id, 1)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(EntityRef::Round(RoundId(999)))));

        assert_eq!(store.result_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_names_the_row() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;
        store.fail_writes(true);

        let err = use_case(&store)
            .record_round_result(command(round.id, team.id, 1, &[(players[0].id, 1)]))
            .await
            .unwrap_err();
        match err {
            AppError::StoreWrite { entity, .. } => assert_eq!(
                entity,
                EntityRef::RoundResult {
                    round_id: round.id,
                    team_id: team.id
                }
            ),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(store.result_count(), 0);
    }

    #[tokio::test]
    async fn test_player_kills_commit_with_the_result() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;
        store.fail_player_writes(true);

        use_case(&store)
            .record_round_result(command(round.id, team.id, 2, &[(players[0].id, 5)]))
            .await
            .unwrap();
        assert_eq!(store.player(players[0].id).kills, 5);

        ResetTournamentWorkflowImpl::new(
            Arc::new(store.clone()),
            WriteGuard::new(),
            StoreDeadline::default(),
        )
        .reset_keeping_mvp()
        .await
        .unwrap();

        let player = store.player(players[0].id);
        assert_eq!(player.kills, 5);
        assert_eq!(player.baseline_kills, 5);
    }

    #[tokio::test]
    async fn test_duplicate_submission_in_flight_is_rejected() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;
        let use_case = use_case(&store);
        store.delay_writes(Some(Duration::from_millis(100)));

        let entry = command(round.id, team.id, 1, &[(players[0].id, 1)]);
        let (first, second) = tokio::join!(
            use_case.record_round_result(entry.clone()),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                use_case.record_round_result(entry.clone()).await
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::OperationInProgress(_))));
        assert_eq!(store.result_count(), 1);
    }
}
