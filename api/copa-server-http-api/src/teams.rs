use axum::{
    Json,
    extract::{Path, Query, State},
};
use copa_server_app::{
    domain::{
        TeamId,
        team::{TeamRegistration, TeamStatus},
    },
    workflow::teams::register::RegisteredTeam,
};
use serde::Deserialize;

use crate::{AppState, error::ServiceError, json::JsonTeam, jwt::Admin};

fn parse_status(value: &str) -> Result<TeamStatus, ServiceError> {
    TeamStatus::parse(&value.trim().to_lowercase())
        .ok_or_else(|| ServiceError::BadRequest(format!("Unknown team status '{}'", value)))
}

#[derive(Deserialize)]
pub struct JsonTeamsFilter {
    status: Option<String>,
}

pub async fn list_teams(
    State(state): State<AppState>,
    Query(filter): Query<JsonTeamsFilter>,
) -> Result<Json<Vec<JsonTeam>>, ServiceError> {
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_status)
        .transpose()?;
    let teams = state.app.team_list_use_case.list_teams(status).await?;
    Ok(Json(
        teams
            .into_iter()
            .map(|t| JsonTeam::with_players(t.team, t.players))
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct JsonRegistration {
    name: String,
    tag: String,
    players: Vec<String>,
    status: Option<String>,
}

impl JsonRegistration {
    fn into_registration(self) -> (TeamRegistration, Option<String>) {
        (
            TeamRegistration {
                name: self.name,
                tag: self.tag,
                players: self.players,
            },
            self.status,
        )
    }
}

fn registered(team: RegisteredTeam) -> Json<JsonTeam> {
    Json(JsonTeam::with_players(team.team, team.players))
}

pub async fn register_team(
    State(state): State<AppState>,
    Json(request): Json<JsonRegistration>,
) -> Result<Json<JsonTeam>, ServiceError> {
    let (registration, _) = request.into_registration();
    let team = state
        .app
        .team_register_use_case
        .register_team(registration)
        .await?;
    Ok(registered(team))
}

pub async fn create_team(
    _admin: Admin,
    State(state): State<AppState>,
    Json(request): Json<JsonRegistration>,
) -> Result<Json<JsonTeam>, ServiceError> {
    let (registration, status) = request.into_registration();
    let status = status.as_deref().map(parse_status).transpose()?;
    let team = state
        .app
        .team_register_use_case
        .create_team(registration, status)
        .await?;
    Ok(registered(team))
}

#[derive(Deserialize)]
pub struct JsonStatusUpdate {
    status: String,
}

pub async fn set_status(
    _admin: Admin,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<JsonStatusUpdate>,
) -> Result<Json<JsonTeam>, ServiceError> {
    let status = parse_status(&request.status)?;
    let team = state
        .app
        .team_manage_use_case
        .set_status(TeamId(id), status)
        .await?;
    Ok(Json(team.into()))
}

#[derive(Deserialize)]
pub struct JsonGroupUpdate {
    group: Option<String>,
}

pub async fn set_group(
    _admin: Admin,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<JsonGroupUpdate>,
) -> Result<Json<JsonTeam>, ServiceError> {
    let team = state
        .app
        .team_manage_use_case
        .assign_group(TeamId(id), request.group)
        .await?;
    Ok(Json(team.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPenaltyUpdate {
    penalty_points: u32,
}

pub async fn set_penalty(
    _admin: Admin,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<JsonPenaltyUpdate>,
) -> Result<Json<JsonTeam>, ServiceError> {
    let team = state
        .app
        .team_manage_use_case
        .set_penalty(TeamId(id), request.penalty_points)
        .await?;
    Ok(Json(team.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_is_case_insensitive() {
        assert_eq!(parse_status(" Confirmed ").unwrap(), TeamStatus::Confirmed);
        assert_eq!(parse_status("pending").unwrap(), TeamStatus::Pending);
        assert!(matches!(
            parse_status("banned"),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn test_registration_body_accepts_optional_status() {
        let request: JsonRegistration = serde_json::from_str(
            r#"{"name":"Queen Warriors","tag":"qw","players":["Ana","Bia","Caio","Duda"]}"#,
        )
        .unwrap();
        let (registration, status) = request.into_registration();
        assert_eq!(registration.players.len(), 4);
        assert!(status.is_none());
    }
}
