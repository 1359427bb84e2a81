use std::{sync::Arc, time::Duration};

use crate::{
    domain::{
        confirmation::ConfirmationServiceImpl, player::PlayerRepository, round::RoundRepository,
        standings::StandingsServiceImpl, team::TeamRepository,
    },
    services::{
        deadline::{DEFAULT_STORE_TIMEOUT, StoreDeadline},
        write_guard::WriteGuard,
    },
    workflow::{
        admin::{
            confirm::{ConfirmActionUseCase, ConfirmActionUseCaseImpl},
            reset::ResetTournamentWorkflowImpl,
        },
        players::correct_kills::{CorrectKillsUseCase, CorrectKillsUseCaseImpl},
        rounds::{
            create::{CreateRoundUseCase, CreateRoundUseCaseImpl},
            delete::DeleteRoundWorkflowImpl,
            list::{ListRoundsUseCase, ListRoundsUseCaseImpl},
            standings::{RoundStandingsUseCase, RoundStandingsUseCaseImpl},
        },
        scoring::{
            recompute::{RecomputeStandingsWorkflow, RecomputeStandingsWorkflowImpl},
            record_result::{RecordRoundResultUseCase, RecordRoundResultUseCaseImpl},
        },
        standings::{
            dashboard::{DashboardUseCase, DashboardUseCaseImpl},
            get::{GetStandingsUseCase, GetStandingsUseCaseImpl},
            mvp::{MvpUseCase, MvpUseCaseImpl},
        },
        teams::{
            delete::DeleteTeamWorkflowImpl,
            list::{ListTeamsUseCase, ListTeamsUseCaseImpl},
            manage::{ManageTeamUseCase, ManageTeamUseCaseImpl},
            register::{RegisterTeamUseCase, RegisterTeamUseCaseImpl},
        },
    },
};

pub mod domain;
pub mod error;
pub mod services;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub const DEFAULT_CONFIRMATION_TTL: Duration = Duration::from_secs(120);

#[derive(Clone, Copy, Debug)]
pub struct AppConfig {
    pub store_timeout: Duration,
    pub confirmation_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            confirmation_ttl: DEFAULT_CONFIRMATION_TTL,
        }
    }
}

pub struct Application {
    pub record_round_result_use_case: Box<dyn RecordRoundResultUseCase + Send + Sync + 'static>,
    pub recompute_standings_workflow: Arc<dyn RecomputeStandingsWorkflow + Send + Sync + 'static>,

    pub round_create_use_case: Box<dyn CreateRoundUseCase + Send + Sync + 'static>,
    pub round_list_use_case: Box<dyn ListRoundsUseCase + Send + Sync + 'static>,
    pub round_standings_use_case: Box<dyn RoundStandingsUseCase + Send + Sync + 'static>,

    pub team_register_use_case: Box<dyn RegisterTeamUseCase + Send + Sync + 'static>,
    pub team_list_use_case: Box<dyn ListTeamsUseCase + Send + Sync + 'static>,
    pub team_manage_use_case: Box<dyn ManageTeamUseCase + Send + Sync + 'static>,

    pub standings_use_case: Box<dyn GetStandingsUseCase + Send + Sync + 'static>,
    pub mvp_use_case: Box<dyn MvpUseCase + Send + Sync + 'static>,
    pub dashboard_use_case: Box<dyn DashboardUseCase + Send + Sync + 'static>,
    pub correct_kills_use_case: Box<dyn CorrectKillsUseCase + Send + Sync + 'static>,

    pub confirm_action_use_case: Box<dyn ConfirmActionUseCase + Send + Sync + 'static>,
}

pub fn build_application<
    T: TeamRepository + Send + Sync + 'static,
    P: PlayerRepository + Send + Sync + 'static,
    R: RoundRepository + Send + Sync + 'static,
>(
    team_repository: Arc<T>,
    player_repository: Arc<P>,
    round_repository: Arc<R>,
    config: AppConfig,
) -> Application {
    let standings_service = Arc::new(StandingsServiceImpl::new());
    let confirmation_service = Arc::new(ConfirmationServiceImpl::new(config.confirmation_ttl));
    let write_guard = WriteGuard::new();
    let deadline = StoreDeadline::new(config.store_timeout);

    let recompute_standings_workflow = Arc::new(RecomputeStandingsWorkflowImpl::new(
        team_repository.clone(),
        player_repository.clone(),
        round_repository.clone(),
        standings_service.clone(),
        deadline,
    ));

    let delete_team_workflow = Arc::new(DeleteTeamWorkflowImpl::new(
        team_repository.clone(),
        write_guard.clone(),
        deadline,
    ));
    let delete_round_workflow = Arc::new(DeleteRoundWorkflowImpl::new(
        round_repository.clone(),
        recompute_standings_workflow.clone(),
        write_guard.clone(),
        deadline,
    ));
    let reset_workflow = Arc::new(ResetTournamentWorkflowImpl::new(
        round_repository.clone(),
        write_guard.clone(),
        deadline,
    ));

    Application {
        record_round_result_use_case: Box::new(RecordRoundResultUseCaseImpl::new(
            team_repository.clone(),
            player_repository.clone(),
            round_repository.clone(),
            recompute_standings_workflow.clone(),
            write_guard.clone(),
            deadline,
        )),
        recompute_standings_workflow: recompute_standings_workflow.clone(),

        round_create_use_case: Box::new(CreateRoundUseCaseImpl::new(
            round_repository.clone(),
            write_guard.clone(),
            deadline,
        )),
        round_list_use_case: Box::new(ListRoundsUseCaseImpl::new(
            round_repository.clone(),
            deadline,
        )),
        round_standings_use_case: Box::new(RoundStandingsUseCaseImpl::new(
            team_repository.clone(),
            round_repository.clone(),
            standings_service.clone(),
            deadline,
        )),

        team_register_use_case: Box::new(RegisterTeamUseCaseImpl::new(
            team_repository.clone(),
            write_guard.clone(),
            deadline,
        )),
        team_list_use_case: Box::new(ListTeamsUseCaseImpl::new(
            team_repository.clone(),
            player_repository.clone(),
            deadline,
        )),
        team_manage_use_case: Box::new(ManageTeamUseCaseImpl::new(
            team_repository.clone(),
            recompute_standings_workflow,
            write_guard.clone(),
            deadline,
        )),

        standings_use_case: Box::new(GetStandingsUseCaseImpl::new(
            team_repository.clone(),
            round_repository.clone(),
            standings_service.clone(),
            deadline,
        )),
        mvp_use_case: Box::new(MvpUseCaseImpl::new(
            team_repository.clone(),
            player_repository.clone(),
            standings_service,
            deadline,
        )),
        dashboard_use_case: Box::new(DashboardUseCaseImpl::new(
            team_repository.clone(),
            player_repository.clone(),
            deadline,
        )),
        correct_kills_use_case: Box::new(CorrectKillsUseCaseImpl::new(
            player_repository,
            round_repository.clone(),
            write_guard,
            deadline,
        )),

        confirm_action_use_case: Box::new(ConfirmActionUseCaseImpl::new(
            confirmation_service,
            team_repository,
            round_repository,
            delete_team_workflow,
            delete_round_workflow,
            reset_workflow,
            deadline,
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        domain::{confirmation::DestructiveAction, standings::StandingsFilter, team::TeamRegistration},
        testing::InMemoryStore,
        workflow::{admin::confirm::ConfirmedAction, scoring::record_result::RecordRoundResult},
    };

    #[tokio::test]
    async fn test_tournament_flow_through_application() {
        let store = Arc::new(InMemoryStore::new());
        let app = build_application(
            store.clone(),
            store.clone(),
            store.clone(),
            AppConfig::default(),
        );

        let registered = app
            .team_register_use_case
            .register_team(TeamRegistration {
                name: "Queen Warriors".to_string(),
                tag: "QW".to_string(),
                players: vec!["Ana".into(), "Bia".into(), "Caio".into(), "Duda".into()],
            })
            .await
            .unwrap();
        let team = app
            .team_manage_use_case
            .set_status(registered.team.id, domain::team::TeamStatus::Confirmed)
            .await
            .unwrap();
        let round = app
            .round_create_use_case
            .create_round("Queda 1".to_string())
            .await
            .unwrap();

        app.record_round_result_use_case
            .record_round_result(RecordRoundResult {
                round_id: round.id,
                team_id: team.id,
                position: 1,
                player_kills: HashMap::from([
                    (registered.players[0].id, 4),
                    (registered.players[1].id, 6),
                ]),
            })
            .await
            .unwrap();

        let standings = app
            .standings_use_case
            .standings(StandingsFilter::Overall)
            .await
            .unwrap();
        assert_eq!(standings[0].totals.total_points, 30);

        let mvp = app
            .mvp_use_case
            .mvp_ranking(Default::default())
            .await
            .unwrap();
        assert_eq!(mvp[0].player_name, "Bia");

        let ticket = app
            .confirm_action_use_case
            .request(DestructiveAction::ResetKeepingMvp)
            .await
            .unwrap();
        let done = app
            .confirm_action_use_case
            .confirm(ticket.token)
            .await
            .unwrap();
        assert!(matches!(done, ConfirmedAction::Reset { keep_mvp: true, .. }));

        let standings = app
            .standings_use_case
            .standings(StandingsFilter::Overall)
            .await
            .unwrap();
        assert_eq!(standings[0].totals.total_points, 0);
        let mvp = app
            .mvp_use_case
            .mvp_ranking(Default::default())
            .await
            .unwrap();
        assert_eq!(mvp[0].kills, 6);
        assert!(app.round_list_use_case.latest_round().await.unwrap().is_none());
    }
}
