use std::sync::Arc;

use crate::{
    domain::{EntityRef, TeamId, team::TeamRepository},
    error::AppError,
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
};

/// Deletes a team together with its players and every result it recorded.
/// Other teams' totals do not depend on it and are left alone.
#[async_trait::async_trait]
pub trait DeleteTeamWorkflow {
    async fn delete_team(&self, team_id: TeamId) -> Result<(), AppError>;
}

pub struct DeleteTeamWorkflowImpl<T: TeamRepository> {
    team_repository: Arc<T>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<T: TeamRepository> DeleteTeamWorkflowImpl<T> {
    pub fn new(team_repository: Arc<T>, write_guard: WriteGuard, deadline: StoreDeadline) -> Self {
        Self {
            team_repository,
            write_guard,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<T: TeamRepository + Send + Sync + 'static> DeleteTeamWorkflow for DeleteTeamWorkflowImpl<T> {
    async fn delete_team(&self, team_id: TeamId) -> Result<(), AppError> {
        let _permit = self.write_guard.acquire(WriteKey::Team(team_id))?;
        self.deadline
            .run(self.team_repository.delete_team(team_id))
            .await?
            .map_err(|e| AppError::update(EntityRef::Team(team_id), e))?;
        log::info!("Deleted team {}", team_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use copa_core::Placement;

    use super::*;
    use crate::{
        domain::round::{RoundRepository, RoundResultWrite},
        testing::InMemoryStore,
    };

    #[tokio::test]
    async fn test_delete_team_cascades() {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let (other, _) = store.seed_team("KS", 4).await;
        let round = store.seed_round("Queda 1").await;
        store
            .upsert_round_result(RoundResultWrite::new(
                round.id,
                team.id,
                Placement::from_position(3).unwrap(),
                vec![(players[0].id, 2)],
            ))
            .await
            .unwrap();

        let workflow = DeleteTeamWorkflowImpl::new(
            Arc::new(store.clone()),
            WriteGuard::new(),
            StoreDeadline::default(),
        );
        workflow.delete_team(team.id).await.unwrap();

        assert_eq!(store.result_count(), 0);
        assert!(store.get_team(team.id).await.is_err());
        assert!(store.get_team(other.id).await.is_ok());

        let err = workflow.delete_team(team.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(EntityRef::Team(_))));
    }
}
