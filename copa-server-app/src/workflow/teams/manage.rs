use std::sync::Arc;

use crate::{
    domain::{
        EntityRef, TeamId,
        team::{Team, TeamRepository, TeamStatus},
    },
    error::{AppError, ValidationError},
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
    workflow::scoring::recompute::RecomputeStandingsWorkflow,
};

#[async_trait::async_trait]
pub trait ManageTeamUseCase {
    async fn set_status(&self, team_id: TeamId, status: TeamStatus) -> Result<Team, AppError>;
    /// `None` or a blank label removes the team from its group.
    async fn assign_group(&self, team_id: TeamId, group: Option<String>)
    -> Result<Team, AppError>;
    async fn set_penalty(&self, team_id: TeamId, penalty_points: u32) -> Result<Team, AppError>;
}

pub struct ManageTeamUseCaseImpl<T: TeamRepository, RW: RecomputeStandingsWorkflow> {
    team_repository: Arc<T>,
    recompute_workflow: Arc<RW>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, RW: RecomputeStandingsWorkflow> ManageTeamUseCaseImpl<T, RW> {
    pub fn new(
        team_repository: Arc<T>,
        recompute_workflow: Arc<RW>,
        write_guard: WriteGuard,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            team_repository,
            recompute_workflow,
            write_guard,
            deadline,
        }
    }
}

impl<T: TeamRepository + Send + Sync + 'static, RW: RecomputeStandingsWorkflow>
    ManageTeamUseCaseImpl<T, RW>
{
    async fn load(&self, team_id: TeamId) -> Result<Team, AppError> {
        self.deadline
            .run(self.team_repository.get_team(team_id))
            .await?
            .map_err(|e| AppError::retrieve(EntityRef::Team(team_id), e))
    }
}

#[async_trait::async_trait]
impl<
    T: TeamRepository + Send + Sync + 'static,
    RW: RecomputeStandingsWorkflow + Send + Sync + 'static,
> ManageTeamUseCase for ManageTeamUseCaseImpl<T, RW>
{
    async fn set_status(&self, team_id: TeamId, status: TeamStatus) -> Result<Team, AppError> {
        let _permit = self.write_guard.acquire(WriteKey::Team(team_id))?;
        let team = self.load(team_id).await?;
        if team.status == status {
            return Ok(team);
        }
        if !team.status.can_transition_to(status) {
            return Err(ValidationError::InvalidStatusTransition {
                from: team.status,
                to: status,
            }
            .into());
        }

        self.deadline
            .run(self.team_repository.set_status(team_id, status))
            .await?
            .map_err(|e| AppError::update(EntityRef::Team(team_id), e))?;
        log::info!("Team {} moved from {} to {}", team_id, team.status, status);
        Ok(Team { status, ..team })
    }

    async fn assign_group(
        &self,
        team_id: TeamId,
        group: Option<String>,
    ) -> Result<Team, AppError> {
        let group_name = group
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());
        let _permit = self.write_guard.acquire(WriteKey::Team(team_id))?;

        self.deadline
            .run(self.team_repository.set_group(team_id, group_name.clone()))
            .await?
            .map_err(|e| AppError::update(EntityRef::Team(team_id), e))?;
        self.load(team_id).await
    }

    async fn set_penalty(&self, team_id: TeamId, penalty_points: u32) -> Result<Team, AppError> {
        let _permit = self.write_guard.acquire(WriteKey::Team(team_id))?;

        self.deadline
            .run(self.team_repository.set_penalty(team_id, penalty_points))
            .await?
            .map_err(|e| AppError::update(EntityRef::Team(team_id), e))?;
        self.recompute_workflow.recompute_team(team_id).await?;
        log::info!("Team {} penalty set to {}", team_id, penalty_points);
        self.load(team_id).await
    }
}
