use std::sync::Arc;

use crate::{
    domain::{
        EntityRef, RoundId, TeamId,
        confirmation::{ConfirmationService, ConfirmationTicket, ConfirmationToken, DestructiveAction},
        round::{ResetSummary, RoundRepository},
        team::TeamRepository,
    },
    error::AppError,
    services::deadline::StoreDeadline,
    workflow::{
        admin::reset::ResetTournamentWorkflow,
        rounds::delete::DeleteRoundWorkflow,
        scoring::recompute::RecomputeReport,
        teams::delete::DeleteTeamWorkflow,
    },
};

#[derive(Clone, Debug, PartialEq)]
pub enum ConfirmedAction {
    TeamDeleted(TeamId),
    RoundDeleted {
        round_id: RoundId,
        report: RecomputeReport,
    },
    Reset {
        keep_mvp: bool,
        summary: ResetSummary,
    },
}

/// Destructive operations run in two steps: `request` hands out a short-lived
/// token describing the action and `confirm` executes it.
#[async_trait::async_trait]
pub trait ConfirmActionUseCase {
    async fn request(&self, action: DestructiveAction) -> Result<ConfirmationTicket, AppError>;
    async fn confirm(&self, token: ConfirmationToken) -> Result<ConfirmedAction, AppError>;
}

pub struct ConfirmActionUseCaseImpl<
    C: ConfirmationService,
    T: TeamRepository,
    R: RoundRepository,
    DT: DeleteTeamWorkflow,
    DR: DeleteRoundWorkflow,
    RS: ResetTournamentWorkflow,
> {
    confirmation_service: Arc<C>,
    team_repository: Arc<T>,
    round_repository: Arc<R>,
    delete_team_workflow: Arc<DT>,
    delete_round_workflow: Arc<DR>,
    reset_workflow: Arc<RS>,
    deadline: StoreDeadline,
}

impl<
    C: ConfirmationService,
    T: TeamRepository,
    R: RoundRepository,
    DT: DeleteTeamWorkflow,
    DR: DeleteRoundWorkflow,
    RS: ResetTournamentWorkflow,
> ConfirmActionUseCaseImpl<C, T, R, DT, DR, RS>
{
    pub fn new(
        confirmation_service: Arc<C>,
        team_repository: Arc<T>,
        round_repository: Arc<R>,
        delete_team_workflow: Arc<DT>,
        delete_round_workflow: Arc<DR>,
        reset_workflow: Arc<RS>,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            confirmation_service,
            team_repository,
            round_repository,
            delete_team_workflow,
            delete_round_workflow,
            reset_workflow,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<
    C: ConfirmationService + Send + Sync + 'static,
    T: TeamRepository + Send + Sync + 'static,
    R: RoundRepository + Send + Sync + 'static,
    DT: DeleteTeamWorkflow + Send + Sync + 'static,
    DR: DeleteRoundWorkflow + Send + Sync + 'static,
    RS: ResetTournamentWorkflow + Send + Sync + 'static,
> ConfirmActionUseCase for ConfirmActionUseCaseImpl<C, T, R, DT, DR, RS>
{
    async fn request(&self, action: DestructiveAction) -> Result<ConfirmationTicket, AppError> {
        match &action {
            DestructiveAction::DeleteTeam(team_id) => {
                self.deadline
                    .run(self.team_repository.get_team(*team_id))
                    .await?
                    .map_err(|e| AppError::retrieve(EntityRef::Team(*team_id), e))?;
            }
            DestructiveAction::DeleteRound(round_id) => {
                self.deadline
                    .run(self.round_repository.get_round(*round_id))
                    .await?
                    .map_err(|e| AppError::retrieve(EntityRef::Round(*round_id), e))?;
            }
            DestructiveAction::ResetKeepingMvp | DestructiveAction::ResetSystem => {}
        }
        Ok(self.confirmation_service.request(action))
    }

    async fn confirm(&self, token: ConfirmationToken) -> Result<ConfirmedAction, AppError> {
        let Some(action) = self.confirmation_service.redeem(token) else {
            return Err(AppError::ConfirmationExpired);
        };
        log::info!("Executing confirmed action: {}", action);

        match action {
            DestructiveAction::DeleteTeam(team_id) => {
                self.delete_team_workflow.delete_team(team_id).await?;
                Ok(ConfirmedAction::TeamDeleted(team_id))
            }
            DestructiveAction::DeleteRound(round_id) => {
                let report = self.delete_round_workflow.delete_round(round_id).await?;
                Ok(ConfirmedAction::RoundDeleted { round_id, report })
            }
            DestructiveAction::ResetKeepingMvp => Ok(ConfirmedAction::Reset {
                keep_mvp: true,
                summary: self.reset_workflow.reset_keeping_mvp().await?,
            }),
            DestructiveAction::ResetSystem => Ok(ConfirmedAction::Reset {
                keep_mvp: false,
                summary: self.reset_workflow.reset_system().await?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::confirmation::ConfirmationServiceImpl,
        services::write_guard::WriteGuard,
        testing::{InMemoryStore, TestRecompute, recompute_workflow},
        workflow::{
            admin::reset::ResetTournamentWorkflowImpl, rounds::delete::DeleteRoundWorkflowImpl,
            teams::delete::DeleteTeamWorkflowImpl,
        },
    };

    type TestConfirm = ConfirmActionUseCaseImpl<
        ConfirmationServiceImpl,
        InMemoryStore,
        InMemoryStore,
        DeleteTeamWorkflowImpl<InMemoryStore>,
        DeleteRoundWorkflowImpl<InMemoryStore, TestRecompute>,
        ResetTournamentWorkflowImpl<InMemoryStore>,
    >;

    fn use_case(store: &InMemoryStore, ttl: Duration) -> TestConfirm {
        let shared = Arc::new(store.clone());
        let guard = WriteGuard::new();
        let deadline = StoreDeadline::default();
        ConfirmActionUseCaseImpl::new(
            Arc::new(ConfirmationServiceImpl::new(ttl)),
            shared.clone(),
            shared.clone(),
            Arc::new(DeleteTeamWorkflowImpl::new(
                shared.clone(),
                guard.clone(),
                deadline,
            )),
            Arc::new(DeleteRoundWorkflowImpl::new(
                shared.clone(),
                recompute_workflow(store),
                guard.clone(),
                deadline,
            )),
            Arc::new(ResetTournamentWorkflowImpl::new(shared, guard, deadline)),
            deadline,
        )
    }

    #[tokio::test]
    async fn test_nothing_happens_until_confirmed() {
        let store = InMemoryStore::new();
        let round = store.seed_round("Queda 1").await;
        let use_case = use_case(&store, Duration::from_secs(60));

        let ticket = use_case
            .request(DestructiveAction::DeleteRound(round.id))
            .await
            .unwrap();
        assert_eq!(store.round_count(), 1);

        let done = use_case.confirm(ticket.token).await.unwrap();
        assert!(matches!(done, ConfirmedAction::RoundDeleted { round_id, .. } if round_id == round.id));
        assert_eq!(store.round_count(), 0);

        let again = use_case.confirm(ticket.token).await.unwrap_err();
        assert!(matches!(again, AppError::ConfirmationExpired));
    }

    #[tokio::test]
    async fn test_request_for_missing_target_fails() {
        let store = InMemoryStore::new();
        let err = use_case(&store, Duration::from_secs(60))
            .request(DestructiveAction::DeleteTeam(TeamId(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(EntityRef::Team(TeamId(3)))));
    }

    #[tokio::test]
    async fn test_expired_ticket_is_refused() {
        let store = InMemoryStore::new();
        store.seed_team("QW", 4).await;
        let use_case = use_case(&store, Duration::from_millis(20));

        let ticket = use_case
            .request(DestructiveAction::ResetSystem)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let err = use_case.confirm(ticket.token).await.unwrap_err();
        assert!(matches!(err, AppError::ConfirmationExpired));
    }
}
