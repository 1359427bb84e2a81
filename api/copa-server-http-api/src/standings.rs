use axum::{
    Json,
    extract::{Path, Query, State},
};
use copa_server_app::domain::{
    PlayerId,
    standings::{MvpEntry, MvpQuery, StandingsFilter, TeamKillsEntry, TeamStanding},
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ServiceError,
    json::{JsonPlayer, JsonTotals},
    jwt::Admin,
};

#[derive(Deserialize)]
pub struct JsonStandingsFilter {
    group: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonStanding {
    rank: usize,
    team_id: i64,
    team_name: String,
    team_tag: String,
    group_name: Option<String>,
    totals: JsonTotals,
}

impl From<TeamStanding> for JsonStanding {
    fn from(standing: TeamStanding) -> Self {
        Self {
            rank: standing.rank,
            team_id: standing.team.id.0,
            team_name: standing.team.name,
            team_tag: standing.team.tag,
            group_name: standing.team.group_name,
            totals: standing.totals.into(),
        }
    }
}

pub async fn get_standings(
    State(state): State<AppState>,
    Query(filter): Query<JsonStandingsFilter>,
) -> Result<Json<Vec<JsonStanding>>, ServiceError> {
    let filter = StandingsFilter::from_label(filter.group.as_deref());
    let standings = state.app.standings_use_case.standings(filter).await?;
    Ok(Json(standings.into_iter().map(JsonStanding::from).collect()))
}

pub async fn get_groups(State(state): State<AppState>) -> Result<Json<Vec<String>>, ServiceError> {
    Ok(Json(state.app.standings_use_case.groups().await?))
}

#[derive(Deserialize)]
pub struct JsonMvpFilter {
    search: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonMvpEntry {
    rank: usize,
    player_id: i64,
    player_name: String,
    kills: u32,
    team_id: i64,
    team_name: String,
    team_tag: String,
}

impl From<MvpEntry> for JsonMvpEntry {
    fn from(entry: MvpEntry) -> Self {
        Self {
            rank: entry.rank,
            player_id: entry.player_id.0,
            player_name: entry.player_name,
            kills: entry.kills,
            team_id: entry.team_id.0,
            team_name: entry.team_name,
            team_tag: entry.team_tag,
        }
    }
}

pub async fn get_mvp(
    State(state): State<AppState>,
    Query(filter): Query<JsonMvpFilter>,
) -> Result<Json<Vec<JsonMvpEntry>>, ServiceError> {
    let query = MvpQuery {
        search: filter.search,
        limit: filter.limit.filter(|&l| l > 0),
    };
    let ranking = state.app.mvp_use_case.mvp_ranking(query).await?;
    Ok(Json(ranking.into_iter().map(JsonMvpEntry::from).collect()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTeamKills {
    team_id: i64,
    team_name: String,
    team_tag: String,
    kills: u32,
}

impl From<TeamKillsEntry> for JsonTeamKills {
    fn from(entry: TeamKillsEntry) -> Self {
        Self {
            team_id: entry.team_id.0,
            team_name: entry.team_name,
            team_tag: entry.team_tag,
            kills: entry.kills,
        }
    }
}

pub async fn get_team_kills(
    State(state): State<AppState>,
) -> Result<Json<Vec<JsonTeamKills>>, ServiceError> {
    let entries = state.app.mvp_use_case.team_kills().await?;
    Ok(Json(entries.into_iter().map(JsonTeamKills::from).collect()))
}

#[derive(Deserialize)]
pub struct JsonKillCorrection {
    kills: u32,
}

pub async fn correct_kills(
    Admin(claims): Admin,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<JsonKillCorrection>,
) -> Result<Json<JsonPlayer>, ServiceError> {
    let player = state
        .app
        .correct_kills_use_case
        .correct_kills(PlayerId(id), request.kills)
        .await?;
    info!("{} set kills of player {} to {}", claims.sub, id, player.kills);
    Ok(Json(player.into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPublicStats {
    teams: usize,
    players: usize,
    total_kills: u64,
}

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<JsonPublicStats>, ServiceError> {
    let stats = state.app.dashboard_use_case.public_stats().await?;
    Ok(Json(JsonPublicStats {
        teams: stats.teams,
        players: stats.players,
        total_kills: stats.total_kills,
    }))
}
