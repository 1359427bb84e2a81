use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
};
use copa_server_app::{
    domain::{
        PlayerId, RoundId, TeamId,
        standings::{RoundOutcome, RoundStandingEntry},
    },
    workflow::scoring::record_result::RecordRoundResult,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ServiceError,
    json::{JsonRecomputeReport, JsonRound, JsonTotals},
    jwt::Admin,
};

pub async fn list_rounds(
    State(state): State<AppState>,
) -> Result<Json<Vec<JsonRound>>, ServiceError> {
    let rounds = state.app.round_list_use_case.list_rounds().await?;
    Ok(Json(rounds.into_iter().map(JsonRound::from).collect()))
}

pub async fn latest_round(
    State(state): State<AppState>,
) -> Result<Json<Option<JsonRound>>, ServiceError> {
    let round = state.app.round_list_use_case.latest_round().await?;
    Ok(Json(round.map(JsonRound::from)))
}

#[derive(Deserialize)]
pub struct JsonCreateRound {
    name: String,
}

pub async fn create_round(
    _admin: Admin,
    State(state): State<AppState>,
    Json(request): Json<JsonCreateRound>,
) -> Result<Json<JsonRound>, ServiceError> {
    let round = state
        .app
        .round_create_use_case
        .create_round(request.name)
        .await?;
    Ok(Json(round.into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRoundEntry {
    team_id: i64,
    team_name: String,
    team_tag: String,
    recorded: bool,
    position: Option<u32>,
    position_points: u32,
    kills: u32,
    booyah: bool,
}

impl From<RoundStandingEntry> for JsonRoundEntry {
    fn from(entry: RoundStandingEntry) -> Self {
        let (recorded, position, position_points, kills, booyah) = match entry.outcome {
            RoundOutcome::Recorded {
                position,
                position_points,
                kills,
                booyah,
            } => (true, Some(position), position_points, kills, booyah),
            RoundOutcome::Pending => (false, None, 0, 0, false),
        };
        Self {
            team_id: entry.team_id.0,
            team_name: entry.team_name,
            team_tag: entry.team_tag,
            recorded,
            position,
            position_points,
            kills,
            booyah,
        }
    }
}

#[derive(Serialize)]
pub struct JsonRoundStandings {
    round: JsonRound,
    entries: Vec<JsonRoundEntry>,
}

pub async fn round_standings(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<JsonRoundStandings>, ServiceError> {
    let standings = state
        .app
        .round_standings_use_case
        .round_standings(RoundId(id))
        .await?;
    Ok(Json(JsonRoundStandings {
        round: standings.round.into(),
        entries: standings
            .entries
            .into_iter()
            .map(JsonRoundEntry::from)
            .collect(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRecordResult {
    /// Missing or 0 is rejected as an empty position field.
    #[serde(default)]
    position: u32,
    player_kills: HashMap<i64, i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRecordedResult {
    round_id: i64,
    team_id: i64,
    position: u32,
    position_points: u32,
    kills: u32,
    booyah: bool,
    totals: JsonTotals,
    report: JsonRecomputeReport,
}

pub async fn record_result(
    _admin: Admin,
    Path((round_id, team_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
    Json(request): Json<JsonRecordResult>,
) -> Result<Json<JsonRecordedResult>, ServiceError> {
    let recorded = state
        .app
        .record_round_result_use_case
        .record_round_result(RecordRoundResult {
            round_id: RoundId(round_id),
            team_id: TeamId(team_id),
            position: request.position,
            player_kills: request
                .player_kills
                .into_iter()
                .map(|(id, kills)| (PlayerId(id), kills))
                .collect(),
        })
        .await?;

    Ok(Json(JsonRecordedResult {
        round_id: recorded.result.round_id.0,
        team_id: recorded.result.team_id.0,
        position: recorded.result.position,
        position_points: recorded.result.position_points,
        kills: recorded.result.kills,
        booyah: recorded.result.booyah,
        totals: recorded.totals.into(),
        report: recorded.report.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_body_reads_player_ids_from_keys() {
        let request: JsonRecordResult =
            serde_json::from_str(r#"{"position":1,"playerKills":{"12":4,"13":-2}}"#).unwrap();
        assert_eq!(request.position, 1);
        assert_eq!(request.player_kills.get(&12), Some(&4));
        assert_eq!(request.player_kills.get(&13), Some(&-2));

        let empty: JsonRecordResult = serde_json::from_str(r#"{"playerKills":{}}"#).unwrap();
        assert_eq!(empty.position, 0);
    }

    #[test]
    fn test_pending_entry_has_no_position() {
        let entry = JsonRoundEntry::from(RoundStandingEntry {
            team_id: TeamId(4),
            team_name: "Queen Warriors".to_string(),
            team_tag: "QW".to_string(),
            outcome: RoundOutcome::Pending,
        });
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["recorded"], false);
        assert!(json["position"].is_null());
        assert_eq!(json["teamTag"], "QW");
    }
}
