use std::time::Duration;

use crate::domain::{
    EntityRef, PlayerId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, TeamId,
    team::TeamStatus,
};

/// Rejections raised before anything is sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("position required")]
    PositionRequired,
    #[error("player kills required")]
    PlayerKillsRequired,
    #[error("player {player_id} is not on the roster of team {team_id}")]
    PlayerNotOnRoster { player_id: PlayerId, team_id: TeamId },
    #[error("team name required")]
    TeamNameRequired,
    #[error("team tag required")]
    TeamTagRequired,
    #[error("team tag must be at most {max} characters")]
    TeamTagTooLong { max: usize },
    #[error("team needs at least {min} players")]
    RosterTooSmall { min: usize },
    #[error("team can have at most {max} players")]
    RosterTooLarge { max: usize },
    #[error("tag {0} is already taken")]
    DuplicateTag(String),
    #[error("round name required")]
    RoundNameRequired,
    #[error("cannot move team from {from} to {to}")]
    InvalidStatusTransition { from: TeamStatus, to: TeamStatus },
    #[error("player already has {recorded} kills in the current rounds")]
    KillsBelowRecorded { recorded: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(EntityRef),
    #[error("failed to write {entity}: {message}")]
    StoreWrite { entity: EntityRef, message: String },
    #[error("failed to read from store: {0}")]
    StoreRead(String),
    #[error("store did not answer within {0:?}")]
    StoreTimeout(Duration),
    #[error("{0} is already in progress")]
    OperationInProgress(String),
    #[error("confirmation expired or unknown")]
    ConfirmationExpired,
}

impl AppError {
    /// Timeouts are the only failures where repeating the identical request is expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreTimeout(_))
    }

    pub fn read(err: RepoError) -> Self {
        match err {
            RepoError::StorageError(e) => {
                log::error!("Store read failed: {}", e);
                AppError::StoreRead(e)
            }
        }
    }

    pub fn retrieve(entity: EntityRef, err: RepoRetrieveError) -> Self {
        match err {
            RepoRetrieveError::NotFound => AppError::NotFound(entity),
            RepoRetrieveError::StorageError(e) => {
                log::error!("Store read of {} failed: {}", entity, e);
                AppError::StoreRead(e)
            }
        }
    }

    pub fn create(entity: EntityRef, err: RepoCreateError) -> Self {
        match err {
            RepoCreateError::Conflict => AppError::StoreWrite {
                entity,
                message: "conflicts with an existing row".to_string(),
            },
            RepoCreateError::StorageError(e) => {
                log::error!("Store write of {} failed: {}", entity, e);
                AppError::StoreWrite { entity, message: e }
            }
        }
    }

    pub fn update(entity: EntityRef, err: RepoUpdateError) -> Self {
        match err {
            RepoUpdateError::NotFound => AppError::NotFound(entity),
            RepoUpdateError::Conflict => AppError::StoreWrite {
                entity,
                message: "conflicts with an existing row".to_string(),
            },
            RepoUpdateError::StorageError(e) => {
                log::error!("Store write of {} failed: {}", entity, e);
                AppError::StoreWrite { entity, message: e }
            }
        }
    }
}
