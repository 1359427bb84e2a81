use std::sync::Arc;

use crate::{
    domain::{
        EntityRef, RepoCreateError,
        player::Player,
        team::{Team, TeamRegistration, TeamRepository, TeamStatus},
    },
    error::{AppError, ValidationError},
    services::{
        deadline::StoreDeadline,
        write_guard::{WriteGuard, WriteKey},
    },
};

#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredTeam {
    pub team: Team,
    pub players: Vec<Player>,
}

#[async_trait::async_trait]
pub trait RegisterTeamUseCase {
    /// Public sign-up form. The team waits for an administrator as `pending`.
    async fn register_team(&self, registration: TeamRegistration)
    -> Result<RegisteredTeam, AppError>;
    /// Administrator shortcut; `confirmed` unless another status is given.
    async fn create_team(
        &self,
        registration: TeamRegistration,
        status: Option<TeamStatus>,
    ) -> Result<RegisteredTeam, AppError>;
}

pub struct RegisterTeamUseCaseImpl<T: TeamRepository> {
    team_repository: Arc<T>,
    write_guard: WriteGuard,
    deadline: StoreDeadline,
}

impl<T: TeamRepository> RegisterTeamUseCaseImpl<T> {
    pub fn new(team_repository: Arc<T>, write_guard: WriteGuard, deadline: StoreDeadline) -> Self {
        Self {
            team_repository,
            write_guard,
            deadline,
        }
    }
}

impl<T: TeamRepository + Send + Sync + 'static> RegisterTeamUseCaseImpl<T> {
    async fn insert(
        &self,
        registration: TeamRegistration,
        status: TeamStatus,
    ) -> Result<RegisteredTeam, AppError> {
        let new_team = registration.into_new_team(status)?;
        let tag = new_team.tag.clone();
        let _permit = self.write_guard.acquire(WriteKey::NewTeam(tag.clone()))?;

        let (team, players) = match self
            .deadline
            .run(self.team_repository.create_team(new_team))
            .await?
        {
            Ok(created) => created,
            Err(RepoCreateError::Conflict) => {
                return Err(ValidationError::DuplicateTag(tag).into());
            }
            Err(e) => return Err(AppError::create(EntityRef::NewTeam { tag }, e)),
        };
        log::info!(
            "Registered team {} [{}] as {} with {} players",
            team.name,
            team.tag,
            team.status,
            players.len()
        );
        Ok(RegisteredTeam { team, players })
    }
}

#[async_trait::async_trait]
impl<T: TeamRepository + Send + Sync + 'static> RegisterTeamUseCase for RegisterTeamUseCaseImpl<T> {
    async fn register_team(
        &self,
        registration: TeamRegistration,
    ) -> Result<RegisteredTeam, AppError> {
        self.insert(registration, TeamStatus::Pending).await
    }

    async fn create_team(
        &self,
        registration: TeamRegistration,
        status: Option<TeamStatus>,
    ) -> Result<RegisteredTeam, AppError> {
        self.insert(registration, status.unwrap_or(TeamStatus::Confirmed))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;

    fn use_case(store: &InMemoryStore) -> RegisterTeamUseCaseImpl<InMemoryStore> {
        RegisterTeamUseCaseImpl::new(
            Arc::new(store.clone()),
            WriteGuard::new(),
            StoreDeadline::default(),
        )
    }

    fn registration(tag: &str, players: &[&str]) -> TeamRegistration {
        TeamRegistration {
            name: "Queen Warriors".to_string(),
            tag: tag.to_string(),
            players: players.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_public_registration_is_pending_with_reserves() {
        let store = InMemoryStore::new();
        let registered = use_case(&store)
            .register_team(registration(
                "qw",
                &["Ana", "Bia", "Caio", "Duda", "Enzo", ""],
            ))
            .await
            .unwrap();

        assert_eq!(registered.team.status, TeamStatus::Pending);
        assert_eq!(registered.team.tag, "QW");
        assert_eq!(registered.players.len(), 5);
        assert!(!registered.players[3].is_reserve);
        assert!(registered.players[4].is_reserve);
    }

    #[tokio::test]
    async fn test_admin_creation_defaults_to_confirmed() {
        let store = InMemoryStore::new();
        let use_case = use_case(&store);
        let confirmed = use_case
            .create_team(registration("QW", &["A", "B", "C", "D"]), None)
            .await
            .unwrap();
        assert_eq!(confirmed.team.status, TeamStatus::Confirmed);

        let pending = use_case
            .create_team(
                registration("KS", &["A", "B", "C", "D"]),
                Some(TeamStatus::Pending),
            )
            .await
            .unwrap();
        assert_eq!(pending.team.status, TeamStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_tag_is_rejected() {
        let store = InMemoryStore::new();
        let use_case = use_case(&store);
        use_case
            .register_team(registration("QW", &["A", "B", "C", "D"]))
            .await
            .unwrap();
        let err = use_case
            .register_team(registration("qw", &["E", "F", "G", "H"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::DuplicateTag(tag)) if tag == "QW"
        ));
    }

    #[tokio::test]
    async fn test_short_roster_is_rejected() {
        let store = InMemoryStore::new();
        let err = use_case(&store)
            .register_team(registration("QW", &["A", "B", " "]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::RosterTooSmall { min: 4 })
        ));
    }
}
