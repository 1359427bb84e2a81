use std::sync::Arc;

use copa_core::TeamTotals;

use crate::{
    domain::{
        EntityRef, PlayerId, TeamId,
        player::{Player, PlayerRepository},
        round::{RoundRepository, RoundResult, RoundResultQuery},
        standings::{ConsistencyWarning, StandingsService},
        team::{Team, TeamRepository},
    },
    error::AppError,
    services::deadline::StoreDeadline,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecomputeReport {
    pub teams_updated: usize,
    pub players_updated: usize,
    pub warnings: Vec<ConsistencyWarning>,
}

impl RecomputeReport {
    pub fn merge(&mut self, other: RecomputeReport) {
        self.teams_updated += other.teams_updated;
        self.players_updated += other.players_updated;
        self.warnings.extend(other.warnings);
    }
}

/// Rebuilds stored team totals and player kills from the round-level rows.
#[async_trait::async_trait]
pub trait RecomputeStandingsWorkflow {
    /// Called after a mutation touching one team. Stale totals are expected here,
    /// so only malformed result rows are reported.
    async fn recompute_team(&self, team_id: TeamId) -> Result<RecomputeReport, AppError>;
    /// Full audit: every drifted aggregate is reported and then corrected.
    async fn recompute_all(&self) -> Result<RecomputeReport, AppError>;
}

pub struct RecomputeStandingsWorkflowImpl<
    T: TeamRepository,
    P: PlayerRepository,
    R: RoundRepository,
    S: StandingsService,
> {
    team_repository: Arc<T>,
    player_repository: Arc<P>,
    round_repository: Arc<R>,
    standings_service: Arc<S>,
    deadline: StoreDeadline,
}

impl<T: TeamRepository, P: PlayerRepository, R: RoundRepository, S: StandingsService>
    RecomputeStandingsWorkflowImpl<T, P, R, S>
{
    pub fn new(
        team_repository: Arc<T>,
        player_repository: Arc<P>,
        round_repository: Arc<R>,
        standings_service: Arc<S>,
        deadline: StoreDeadline,
    ) -> Self {
        Self {
            team_repository,
            player_repository,
            round_repository,
            standings_service,
            deadline,
        }
    }
}

impl<
    T: TeamRepository + Send + Sync + 'static,
    P: PlayerRepository + Send + Sync + 'static,
    R: RoundRepository + Send + Sync + 'static,
    S: StandingsService + Send + Sync + 'static,
> RecomputeStandingsWorkflowImpl<T, P, R, S>
{
    async fn apply(
        &self,
        team: &Team,
        results: &[RoundResult],
        players: &[Player],
        audit: bool,
    ) -> Result<RecomputeReport, AppError> {
        let mut report = RecomputeReport::default();
        report.warnings.extend(
            results
                .iter()
                .filter(|r| r.team_id == team.id)
                .filter_map(|r| self.standings_service.check_result(r)),
        );

        let computed: TeamTotals = self.standings_service.compute_totals(team, results);
        if let Some(warning) = self.standings_service.check_team(team, &computed) {
            if audit {
                report.warnings.push(warning);
            }
            self.deadline
                .run(self.team_repository.store_totals(team.id, computed))
                .await?
                .map_err(|e| AppError::update(EntityRef::Team(team.id), e))?;
            report.teams_updated += 1;
        }

        let changed: Vec<(PlayerId, u32)> = self
            .standings_service
            .derive_player_kills(players, results)
            .into_iter()
            .zip(players.iter())
            .filter(|((_, derived), player)| *derived != player.kills)
            .map(|((player_id, derived), player)| {
                if audit {
                    report.warnings.push(ConsistencyWarning::PlayerKills {
                        player_id,
                        stored: player.kills,
                        computed: derived,
                    });
                }
                (player_id, derived)
            })
            .collect();
        if !changed.is_empty() {
            report.players_updated += changed.len();
            self.deadline
                .run(self.player_repository.store_kills(changed))
                .await?
                .map_err(|e| AppError::update(EntityRef::Players, e))?;
        }

        for warning in &report.warnings {
            log::warn!("Inconsistent aggregate: {}", warning);
        }
        Ok(report)
    }
}

#[async_trait::async_trait]
impl<
    T: TeamRepository + Send + Sync + 'static,
    P: PlayerRepository + Send + Sync + 'static,
    R: RoundRepository + Send + Sync + 'static,
    S: StandingsService + Send + Sync + 'static,
> RecomputeStandingsWorkflow for RecomputeStandingsWorkflowImpl<T, P, R, S>
{
    async fn recompute_team(&self, team_id: TeamId) -> Result<RecomputeReport, AppError> {
        let team = self
            .deadline
            .run(self.team_repository.get_team(team_id))
            .await?
            .map_err(|e| AppError::retrieve(EntityRef::Team(team_id), e))?;
        let results = self
            .deadline
            .run(
                self.round_repository
                    .query_round_results(RoundResultQuery::for_team(team_id)),
            )
            .await?
            .map_err(AppError::read)?;
        let players = self
            .deadline
            .run(self.player_repository.list_team_players(team_id))
            .await?
            .map_err(AppError::read)?;

        self.apply(&team, &results, &players, false).await
    }

    async fn recompute_all(&self) -> Result<RecomputeReport, AppError> {
        let (teams, players, results) = futures::try_join!(
            async {
                self.deadline
                    .run(self.team_repository.list_teams())
                    .await?
                    .map_err(AppError::read)
            },
            async {
                self.deadline
                    .run(self.player_repository.list_players())
                    .await?
                    .map_err(AppError::read)
            },
            async {
                self.deadline
                    .run(
                        self.round_repository
                            .query_round_results(RoundResultQuery::all()),
                    )
                    .await?
                    .map_err(AppError::read)
            },
        )?;

        let mut report = RecomputeReport::default();
        for team in &teams {
            let team_players: Vec<Player> = players
                .iter()
                .filter(|p| p.team_id == team.id)
                .cloned()
                .collect();
            let team_results: Vec<RoundResult> = results
                .iter()
                .filter(|r| r.team_id == team.id)
                .cloned()
                .collect();
            report.merge(
                self.apply(team, &team_results, &team_players, true)
                    .await?,
            );
        }
        log::info!(
            "Recomputed standings: {} teams and {} players updated, {} warnings",
            report.teams_updated,
            report.players_updated,
            report.warnings.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::round::RoundResultWrite,
        testing::{InMemoryStore, recompute_workflow},
    };
    use copa_core::Placement;

    async fn seeded() -> (InMemoryStore, Team, Vec<Player>) {
        let store = InMemoryStore::new();
        let (team, players) = store.seed_team("QW", 4).await;
        let round = store.seed_round("Queda 1").await;
        store
            .upsert_round_result(RoundResultWrite::new(
                round.id,
                team.id,
                Placement::from_position(1).unwrap(),
                vec![(players[0].id, 4), (players[1].id, 6)],
            ))
            .await
            .unwrap();
        (store, team, players)
    }

    #[tokio::test]
    async fn test_recompute_team_stores_totals() {
        let (store, team, players) = seeded().await;
        assert_eq!(store.player(players[1].id).kills, 6);
        let report = recompute_workflow(&store).recompute_team(team.id).await.unwrap();

        assert_eq!(report.teams_updated, 1);
        assert_eq!(report.players_updated, 0);
        assert!(report.warnings.is_empty());

        let stored = store.team(team.id);
        assert_eq!(stored.total_points, 30);
        assert_eq!(stored.team_kills, 10);
        assert_eq!(stored.booyahs, 1);
        assert_eq!(stored.position_points, 20);
        assert_eq!(store.player(players[1].id).kills, 6);
    }

    #[tokio::test]
    async fn test_recompute_all_reports_and_repairs_drift() {
        let (store, team, _) = seeded().await;
        let workflow = recompute_workflow(&store);
        workflow.recompute_team(team.id).await.unwrap();

        store.corrupt_team_kills(team.id, 99);
        let report = workflow.recompute_all().await.unwrap();
        assert_eq!(report.teams_updated, 1);
        assert!(matches!(
            report.warnings.as_slice(),
            [ConsistencyWarning::TeamTotals { .. }]
        ));
        assert_eq!(store.team(team.id).team_kills, 10);

        let clean = workflow.recompute_all().await.unwrap();
        assert_eq!(clean, RecomputeReport::default());
    }

    #[tokio::test]
    async fn test_recompute_all_repairs_player_kills() {
        let (store, team, players) = seeded().await;
        let workflow = recompute_workflow(&store);
        workflow.recompute_team(team.id).await.unwrap();

        store.corrupt_player_kills(players[0].id, 40);
        let report = workflow.recompute_all().await.unwrap();
        assert_eq!(report.players_updated, 1);
        assert!(matches!(
            report.warnings.as_slice(),
            [ConsistencyWarning::PlayerKills { stored: 40, computed: 4, .. }]
        ));
        assert_eq!(store.player(players[0].id).kills, 4);
    }

    #[tokio::test]
    async fn test_recompute_unknown_team() {
        let store = InMemoryStore::new();
        let err = recompute_workflow(&store).recompute_team(TeamId(42)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(EntityRef::Team(TeamId(42)))));
    }
}
