//! In-memory store used by the workflow tests.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::{TimeDelta, Utc};
use copa_core::TeamTotals;

use crate::{
    domain::{
        PlayerId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, RoundId,
        RoundResultId, TeamId,
        player::{Player, PlayerRepository},
        round::{
            BaselinePolicy, PlayerRoundResult, ResetSummary, Round, RoundRepository, RoundResult,
            RoundResultQuery, RoundResultWrite,
        },
        standings::StandingsServiceImpl,
        team::{NewTeam, Team, TeamRegistration, TeamRepository, TeamStatus},
    },
    services::deadline::StoreDeadline,
    workflow::scoring::recompute::RecomputeStandingsWorkflowImpl,
};

pub type TestRecompute = RecomputeStandingsWorkflowImpl<
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    StandingsServiceImpl,
>;

pub fn recompute_workflow(store: &InMemoryStore) -> Arc<TestRecompute> {
    let store = Arc::new(store.clone());
    Arc::new(RecomputeStandingsWorkflowImpl::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(StandingsServiceImpl::new()),
        StoreDeadline::default(),
    ))
}

#[derive(Default)]
struct State {
    next_id: i64,
    teams: BTreeMap<TeamId, Team>,
    players: BTreeMap<PlayerId, Player>,
    rounds: BTreeMap<RoundId, Round>,
    results: BTreeMap<RoundResultId, RoundResult>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn round_kills(&self, player_id: PlayerId) -> u32 {
        self.results
            .values()
            .flat_map(|r| r.player_results.iter())
            .filter(|p| p.player_id == player_id)
            .map(|p| p.kills)
            .sum()
    }

    fn rederive_kills(&mut self, player_ids: Vec<PlayerId>) {
        for player_id in player_ids {
            let from_rounds = self.round_kills(player_id);
            if let Some(player) = self.players.get_mut(&player_id) {
                player.kills = player.baseline_kills + from_rounds;
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    fail_writes: Arc<AtomicBool>,
    fail_player_writes: Arc<AtomicBool>,
    write_delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed team named after its tag, with players `<tag>-0`, `<tag>-1`, ...
    pub async fn seed_team(&self, tag: &str, players: usize) -> (Team, Vec<Player>) {
        let registration = TeamRegistration {
            name: format!("Team {}", tag),
            tag: tag.to_string(),
            players: (0..players).map(|i| format!("{}-{}", tag, i)).collect(),
        };
        self.create_team(registration.into_new_team(TeamStatus::Confirmed).unwrap())
            .await
            .unwrap()
    }

    pub async fn seed_round(&self, name: &str) -> Round {
        self.create_round(name.to_string()).await.unwrap()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fails only the standalone player writes, leaving result upserts working.
    pub fn fail_player_writes(&self, fail: bool) {
        self.fail_player_writes.store(fail, Ordering::SeqCst);
    }

    pub fn delay_writes(&self, delay: Option<Duration>) {
        *self.write_delay.lock().unwrap() = delay;
    }

    pub fn team(&self, id: TeamId) -> Team {
        self.state.lock().unwrap().teams[&id].clone()
    }

    pub fn player(&self, id: PlayerId) -> Player {
        self.state.lock().unwrap().players[&id].clone()
    }

    pub fn result_count(&self) -> usize {
        self.state.lock().unwrap().results.len()
    }

    pub fn player_result_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .results
            .values()
            .map(|r| r.player_results.len())
            .sum()
    }

    pub fn round_count(&self) -> usize {
        self.state.lock().unwrap().rounds.len()
    }

    /// Overwrites stored aggregates to simulate drift.
    pub fn corrupt_team_kills(&self, id: TeamId, team_kills: u32) {
        let mut state = self.state.lock().unwrap();
        if let Some(team) = state.teams.get_mut(&id) {
            team.team_kills = team_kills;
        }
    }

    pub fn corrupt_player_kills(&self, id: PlayerId, kills: u32) {
        let mut state = self.state.lock().unwrap();
        if let Some(player) = state.players.get_mut(&id) {
            player.kills = kills;
        }
    }

    async fn before_player_write(&self) -> Result<(), String> {
        self.before_write().await?;
        if self.fail_player_writes.load(Ordering::SeqCst) {
            return Err("connection reset".to_string());
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<(), String> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("injected write failure".to_string());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TeamRepository for InMemoryStore {
    async fn create_team(&self, team: NewTeam) -> Result<(Team, Vec<Player>), RepoCreateError> {
        self.before_write()
            .await
            .map_err(RepoCreateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        if state.teams.values().any(|t| t.tag == team.tag) {
            return Err(RepoCreateError::Conflict);
        }
        let id = TeamId(state.next_id());
        let created_at = Utc::now() + TimeDelta::milliseconds(id.0);
        let stored = Team {
            id,
            name: team.name,
            tag: team.tag,
            status: team.status,
            group_name: None,
            booyahs: 0,
            team_kills: 0,
            penalty_points: 0,
            position_points: 0,
            total_points: 0,
            created_at,
        };
        state.teams.insert(id, stored.clone());
        let mut players = Vec::new();
        for new_player in team.players {
            let player = Player {
                id: PlayerId(state.next_id()),
                team_id: id,
                name: new_player.name,
                kills: 0,
                is_reserve: new_player.is_reserve,
                baseline_kills: 0,
            };
            state.players.insert(player.id, player.clone());
            players.push(player);
        }
        Ok((stored, players))
    }

    async fn get_team(&self, team_id: TeamId) -> Result<Team, RepoRetrieveError> {
        let state = self.state.lock().unwrap();
        state
            .teams
            .get(&team_id)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, RepoError> {
        Ok(self.state.lock().unwrap().teams.values().cloned().collect())
    }

    async fn set_status(&self, team_id: TeamId, status: TeamStatus) -> Result<(), RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or(RepoUpdateError::NotFound)?;
        team.status = status;
        Ok(())
    }

    async fn set_group(
        &self,
        team_id: TeamId,
        group_name: Option<String>,
    ) -> Result<(), RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or(RepoUpdateError::NotFound)?;
        team.group_name = group_name;
        Ok(())
    }

    async fn set_penalty(
        &self,
        team_id: TeamId,
        penalty_points: u32,
    ) -> Result<(), RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or(RepoUpdateError::NotFound)?;
        team.penalty_points = penalty_points;
        Ok(())
    }

    async fn store_totals(
        &self,
        team_id: TeamId,
        totals: TeamTotals,
    ) -> Result<(), RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or(RepoUpdateError::NotFound)?;
        team.team_kills = totals.team_kills;
        team.position_points = totals.position_points;
        team.booyahs = totals.booyahs;
        team.penalty_points = totals.penalty_points;
        team.total_points = totals.total_points;
        Ok(())
    }

    async fn delete_team(&self, team_id: TeamId) -> Result<(), RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        if state.teams.remove(&team_id).is_none() {
            return Err(RepoUpdateError::NotFound);
        }
        state.players.retain(|_, p| p.team_id != team_id);
        state.results.retain(|_, r| r.team_id != team_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlayerRepository for InMemoryStore {
    async fn list_players(&self) -> Result<Vec<Player>, RepoError> {
        Ok(self.state.lock().unwrap().players.values().cloned().collect())
    }

    async fn list_team_players(&self, team_id: TeamId) -> Result<Vec<Player>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .players
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn store_kills(&self, kills: Vec<(PlayerId, u32)>) -> Result<(), RepoUpdateError> {
        self.before_player_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        for (player_id, value) in kills {
            let player = state
                .players
                .get_mut(&player_id)
                .ok_or(RepoUpdateError::NotFound)?;
            player.kills = value;
        }
        Ok(())
    }

    async fn rebase_kills(
        &self,
        player_id: PlayerId,
        target: u32,
    ) -> Result<Player, RepoUpdateError> {
        self.before_player_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let from_rounds = state.round_kills(player_id);
        let player = state
            .players
            .get_mut(&player_id)
            .ok_or(RepoUpdateError::NotFound)?;
        if target < from_rounds {
            return Err(RepoUpdateError::Conflict);
        }
        player.baseline_kills = target - from_rounds;
        player.kills = target;
        Ok(player.clone())
    }
}

#[async_trait::async_trait]
impl RoundRepository for InMemoryStore {
    async fn create_round(&self, name: String) -> Result<Round, RepoCreateError> {
        self.before_write()
            .await
            .map_err(RepoCreateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let id = RoundId(state.next_id());
        let round = Round {
            id,
            name,
            created_at: Utc::now() + TimeDelta::milliseconds(id.0),
        };
        state.rounds.insert(id, round.clone());
        Ok(round)
    }

    async fn get_round(&self, round_id: RoundId) -> Result<Round, RepoRetrieveError> {
        self.state
            .lock()
            .unwrap()
            .rounds
            .get(&round_id)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn list_rounds(&self) -> Result<Vec<Round>, RepoError> {
        let mut rounds: Vec<Round> = self.state.lock().unwrap().rounds.values().cloned().collect();
        rounds.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rounds)
    }

    async fn delete_round(&self, round_id: RoundId) -> Result<(), RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        if state.rounds.remove(&round_id).is_none() {
            return Err(RepoUpdateError::NotFound);
        }
        let touched: Vec<PlayerId> = state
            .results
            .values()
            .filter(|r| r.round_id == round_id)
            .flat_map(|r| r.player_results.iter().map(|p| p.player_id))
            .collect();
        state.results.retain(|_, r| r.round_id != round_id);
        state.rederive_kills(touched);
        Ok(())
    }

    async fn upsert_round_result(
        &self,
        write: RoundResultWrite,
    ) -> Result<RoundResult, RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        if !state.rounds.contains_key(&write.round_id) || !state.teams.contains_key(&write.team_id)
        {
            return Err(RepoUpdateError::NotFound);
        }
        let roster: Vec<PlayerId> = state
            .players
            .values()
            .filter(|p| p.team_id == write.team_id)
            .map(|p| p.id)
            .collect();
        if write
            .player_kills
            .iter()
            .any(|(player_id, _)| !roster.contains(player_id))
        {
            return Err(RepoUpdateError::Conflict);
        }
        let existing = state
            .results
            .values()
            .find(|r| r.round_id == write.round_id && r.team_id == write.team_id)
            .map(|r| r.id);
        let id = match existing {
            Some(id) => id,
            None => RoundResultId(state.next_id()),
        };
        let result = RoundResult {
            id,
            round_id: write.round_id,
            team_id: write.team_id,
            position: write.position,
            position_points: write.position_points,
            kills: write.kills,
            booyah: write.booyah,
            player_results: write
                .player_kills
                .iter()
                .map(|(player_id, kills)| PlayerRoundResult {
                    player_id: *player_id,
                    kills: *kills,
                })
                .collect(),
        };
        state.results.insert(id, result.clone());
        state.rederive_kills(roster);
        Ok(result)
    }

    async fn query_round_results(
        &self,
        query: RoundResultQuery,
    ) -> Result<Vec<RoundResult>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .results
            .values()
            .filter(|r| query.round_id.is_none_or(|id| r.round_id == id))
            .filter(|r| query.team_id.is_none_or(|id| r.team_id == id))
            .cloned()
            .collect())
    }

    async fn reset_rounds(&self, policy: BaselinePolicy) -> Result<ResetSummary, RepoUpdateError> {
        self.before_write()
            .await
            .map_err(RepoUpdateError::StorageError)?;
        let mut state = self.state.lock().unwrap();
        let summary = ResetSummary {
            rounds_removed: state.rounds.len() as u64,
            round_results_removed: state.results.len() as u64,
            player_round_results_removed: state
                .results
                .values()
                .map(|r| r.player_results.len() as u64)
                .sum(),
            players_rebased: state.players.len() as u64,
        };
        let player_ids: Vec<PlayerId> = state.players.keys().copied().collect();
        for player_id in player_ids {
            let from_rounds = state.round_kills(player_id);
            if let Some(player) = state.players.get_mut(&player_id) {
                match policy {
                    BaselinePolicy::KeepMvp => player.baseline_kills += from_rounds,
                    BaselinePolicy::Clear => player.baseline_kills = 0,
                }
                player.kills = player.baseline_kills;
            }
        }
        state.results.clear();
        state.rounds.clear();
        for team in state.teams.values_mut() {
            let totals = TeamTotals::empty(team.penalty_points);
            team.team_kills = totals.team_kills;
            team.position_points = totals.position_points;
            team.booyahs = totals.booyahs;
            team.total_points = totals.total_points;
        }
        Ok(summary)
    }
}
