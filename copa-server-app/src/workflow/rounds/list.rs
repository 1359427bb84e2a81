use std::sync::Arc;

use crate::{
    domain::round::{Round, RoundRepository},
    error::AppError,
    services::deadline::StoreDeadline,
};

#[async_trait::async_trait]
pub trait ListRoundsUseCase {
    /// Oldest first.
    async fn list_rounds(&self) -> Result<Vec<Round>, AppError>;
    /// Most recently created round; ties on `created_at` go to the greater id.
    async fn latest_round(&self) -> Result<Option<Round>, AppError>;
}

pub struct ListRoundsUseCaseImpl<R: RoundRepository> {
    round_repository: Arc<R>,
    deadline: StoreDeadline,
}

impl<R: RoundRepository> ListRoundsUseCaseImpl<R> {
    pub fn new(round_repository: Arc<R>, deadline: StoreDeadline) -> Self {
        Self {
            round_repository,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<R: RoundRepository + Send + Sync + 'static> ListRoundsUseCase for ListRoundsUseCaseImpl<R> {
    async fn list_rounds(&self) -> Result<Vec<Round>, AppError> {
        self.deadline
            .run(self.round_repository.list_rounds())
            .await?
            .map_err(AppError::read)
    }

    async fn latest_round(&self) -> Result<Option<Round>, AppError> {
        let rounds = self.list_rounds().await?;
        Ok(rounds
            .into_iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))))
    }
}
