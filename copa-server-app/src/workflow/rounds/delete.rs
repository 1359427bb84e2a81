use std::{collections::BTreeSet, sync::Arc};

use crate::{
    domain::{
        EntityRef, RoundId, TeamId,
        round::{RoundRepository, RoundResultQuery},
    },
    error::AppError,
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
    workflow::scoring::recompute::{RecomputeReport, RecomputeStandingsWorkflow},
};

/// Removes a round with all of its results and rebuilds the totals of every
/// team that had played it.
#[async_trait::async_trait]
pub trait DeleteRoundWorkflow {
    async fn delete_round(&self, round_id: RoundId) -> Result<RecomputeReport, AppError>;
}

pub struct DeleteRoundWorkflowImpl<R: RoundRepository, RW: RecomputeStandingsWorkflow> {
    round_repository: Arc<R>,
    recompute_workflow: Arc<RW>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<R: RoundRepository, RW: RecomputeStandingsWorkflow> DeleteRoundWorkflowImpl<R, RW> {
    pub fn new(
        round_repository: Arc<R>,
        recompute_workflow: Arc<RW>,
        write_guard: WriteGuard,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            round_repository,
            recompute_workflow,
            write_guard,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<
    R: RoundRepository + Send + Sync + 'static,
    RW: RecomputeStandingsWorkflow + Send + Sync + 'static,
> DeleteRoundWorkflow for DeleteRoundWorkflowImpl<R, RW>
{
    async fn delete_round(&self, round_id: RoundId) -> Result<RecomputeReport, AppError> {
        let _permit = self.write_guard.acquire(WriteKey::Round(round_id))?;

        let affected: BTreeSet<TeamId> = self
            .deadline
            .run(
                self.round_repository
                    .query_round_results(RoundResultQuery::for_round(round_id)),
            )
            .await?
            .map_err(AppError::read)?
            .into_iter()
            .map(|r| r.team_id)
            .collect();

        self.deadline
            .run(self.round_repository.delete_round(round_id))
            .await?
            .map_err(|e| AppError::update(EntityRef::Round(round_id), e))?;
        log::info!(
            "Deleted round {}, recomputing {} teams",
            round_id,
            affected.len()
        );

        let mut report = RecomputeReport::default();
        for team_id in affected {
            report.merge(self.recompute_workflow.recompute_team(team_id).await?);
        }
        Ok(report)
    }
}
