use std::sync::Arc;

use crate::{
    domain::{
        EntityRef,
        round::{Round, RoundRepository},
    },
    error::{AppError, ValidationError},
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
};

#[async_trait::async_trait]
pub trait CreateRoundUseCase {
    async fn create_round(&self, name: String) -> Result<Round, AppError>;
}

pub struct CreateRoundUseCaseImpl<R: RoundRepository> {
    round_repository: Arc<R>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<R: RoundRepository> CreateRoundUseCaseImpl<R> {
    pub fn new(round_repository: Arc<R>, write_guard: WriteGuard, deadline: StoreDeadline) -> Self {
        Self {
            round_repository,
            write_guard,
            deadline,
        }
    }
}

#[async_trait::async_trait]
impl<R: RoundRepository + Send + Sync + 'static> CreateRoundUseCase for CreateRoundUseCaseImpl<R> {
    async fn create_round(&self, name: String) -> Result<Round, AppError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::RoundNameRequired.into());
        }
        let _permit = self.write_guard.acquire(WriteKey::NewRound(name.clone()))?;

        let round = self
            .deadline
            .run(self.round_repository.create_round(name.clone()))
            .await?
            .map_err(|e| AppError::create(EntityRef::NewRound { name }, e))?;
        log::info!("Created round {} ({})", round.id, round.name);
        Ok(round)
    }
}
