use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use copa_server_app::{
    domain::{
        RoundId, TeamId,
        confirmation::{ConfirmationToken, DestructiveAction},
    },
    workflow::admin::confirm::ConfirmedAction,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ServiceError,
    json::{JsonRecomputeReport, JsonTeam},
    jwt::Admin,
};

pub async fn recompute(
    Admin(claims): Admin,
    State(state): State<AppState>,
) -> Result<Json<JsonRecomputeReport>, ServiceError> {
    info!("Full recompute requested by {}", claims.sub);
    let report = state
        .app
        .recompute_standings_workflow
        .recompute_all()
        .await?;
    Ok(Json(report.into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDashboard {
    total_teams: usize,
    confirmed_teams: usize,
    pending_teams: usize,
    total_players: usize,
    total_kills: u64,
    total_booyahs: u64,
    recent_teams: Vec<JsonTeam>,
}

pub async fn dashboard(
    _admin: Admin,
    State(state): State<AppState>,
) -> Result<Json<JsonDashboard>, ServiceError> {
    let summary = state.app.dashboard_use_case.summary().await?;
    Ok(Json(JsonDashboard {
        total_teams: summary.total_teams,
        confirmed_teams: summary.confirmed_teams,
        pending_teams: summary.pending_teams,
        total_players: summary.total_players,
        total_kills: summary.total_kills,
        total_booyahs: summary.total_booyahs,
        recent_teams: summary.recent_teams.into_iter().map(JsonTeam::from).collect(),
    }))
}

#[derive(Deserialize, Serialize, Debug, PartialEq)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum JsonAction {
    DeleteTeam { team_id: i64 },
    DeleteRound { round_id: i64 },
    ResetKeepingMvp,
    ResetSystem,
}

impl From<JsonAction> for DestructiveAction {
    fn from(action: JsonAction) -> Self {
        match action {
            JsonAction::DeleteTeam { team_id } => DestructiveAction::DeleteTeam(TeamId(team_id)),
            JsonAction::DeleteRound { round_id } => {
                DestructiveAction::DeleteRound(RoundId(round_id))
            }
            JsonAction::ResetKeepingMvp => DestructiveAction::ResetKeepingMvp,
            JsonAction::ResetSystem => DestructiveAction::ResetSystem,
        }
    }
}

impl From<DestructiveAction> for JsonAction {
    fn from(action: DestructiveAction) -> Self {
        match action {
            DestructiveAction::DeleteTeam(id) => JsonAction::DeleteTeam { team_id: id.0 },
            DestructiveAction::DeleteRound(id) => JsonAction::DeleteRound { round_id: id.0 },
            DestructiveAction::ResetKeepingMvp => JsonAction::ResetKeepingMvp,
            DestructiveAction::ResetSystem => JsonAction::ResetSystem,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTicket {
    token: String,
    description: String,
    #[serde(flatten)]
    action: JsonAction,
    expires_at: DateTime<Utc>,
}

pub async fn request_confirmation(
    _admin: Admin,
    State(state): State<AppState>,
    Json(action): Json<JsonAction>,
) -> Result<Json<JsonTicket>, ServiceError> {
    let ticket = state
        .app
        .confirm_action_use_case
        .request(action.into())
        .await?;
    Ok(Json(JsonTicket {
        token: ticket.token.to_string(),
        description: ticket.action.to_string(),
        action: ticket.action.into(),
        expires_at: ticket.expires_at,
    }))
}

#[derive(Serialize)]
#[serde(tag = "done", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum JsonConfirmed {
    TeamDeleted {
        team_id: i64,
    },
    RoundDeleted {
        round_id: i64,
        report: JsonRecomputeReport,
    },
    Reset {
        keep_mvp: bool,
        rounds_removed: u64,
        round_results_removed: u64,
        player_round_results_removed: u64,
        players_rebased: u64,
    },
}

impl From<ConfirmedAction> for JsonConfirmed {
    fn from(done: ConfirmedAction) -> Self {
        match done {
            ConfirmedAction::TeamDeleted(id) => JsonConfirmed::TeamDeleted { team_id: id.0 },
            ConfirmedAction::RoundDeleted { round_id, report } => JsonConfirmed::RoundDeleted {
                round_id: round_id.0,
                report: report.into(),
            },
            ConfirmedAction::Reset { keep_mvp, summary } => JsonConfirmed::Reset {
                keep_mvp,
                rounds_removed: summary.rounds_removed,
                round_results_removed: summary.round_results_removed,
                player_round_results_removed: summary.player_round_results_removed,
                players_rebased: summary.players_rebased,
            },
        }
    }
}

pub async fn confirm_action(
    Admin(claims): Admin,
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<JsonConfirmed>, ServiceError> {
    let token = ConfirmationToken::parse(&token)
        .ok_or_else(|| ServiceError::BadRequest("Malformed confirmation token".to_string()))?;
    let done = state.app.confirm_action_use_case.confirm(token).await?;
    info!("{} confirmed {:?}", claims.sub, done);
    Ok(Json(done.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_body_parsing() {
        let action: JsonAction =
            serde_json::from_str(r#"{"action":"deleteTeam","teamId":7}"#).unwrap();
        assert_eq!(
            DestructiveAction::from(action),
            DestructiveAction::DeleteTeam(TeamId(7))
        );

        let action: JsonAction = serde_json::from_str(r#"{"action":"resetKeepingMvp"}"#).unwrap();
        assert_eq!(
            DestructiveAction::from(action),
            DestructiveAction::ResetKeepingMvp
        );

        assert!(serde_json::from_str::<JsonAction>(r#"{"action":"dropEverything"}"#).is_err());
    }

    #[test]
    fn test_ticket_serializes_action_inline() {
        let ticket = JsonTicket {
            token: "t".to_string(),
            description: "delete round 3".to_string(),
            action: JsonAction::DeleteRound { round_id: 3 },
            expires_at: Utc::now(),
        };
        let json = serde_json::to_value(ticket).unwrap();
        assert_eq!(json["action"], "deleteRound");
        assert_eq!(json["roundId"], 3);
    }
}
