use chrono::{DateTime, Utc};
use copa_core::TeamTotals;
use copa_server_app::{
    domain::{player::Player, round::Round, team::Team},
    workflow::scoring::recompute::RecomputeReport,
};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTotals {
    team_kills: u32,
    position_points: u32,
    booyahs: u32,
    penalty_points: u32,
    total_points: i64,
}

impl From<TeamTotals> for JsonTotals {
    fn from(totals: TeamTotals) -> Self {
        Self {
            team_kills: totals.team_kills,
            position_points: totals.position_points,
            booyahs: totals.booyahs,
            penalty_points: totals.penalty_points,
            total_points: totals.total_points,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPlayer {
    id: i64,
    name: String,
    kills: u32,
    is_reserve: bool,
}

impl From<Player> for JsonPlayer {
    fn from(player: Player) -> Self {
        Self {
            id: player.id.0,
            name: player.name,
            kills: player.kills,
            is_reserve: player.is_reserve,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTeam {
    id: i64,
    name: String,
    tag: String,
    status: &'static str,
    group_name: Option<String>,
    totals: JsonTotals,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    players: Option<Vec<JsonPlayer>>,
}

impl JsonTeam {
    pub fn with_players(team: Team, players: Vec<Player>) -> Self {
        Self {
            players: Some(players.into_iter().map(JsonPlayer::from).collect()),
            ..Self::from(team)
        }
    }
}

impl From<Team> for JsonTeam {
    fn from(team: Team) -> Self {
        let totals = team.stored_totals().into();
        Self {
            id: team.id.0,
            name: team.name,
            tag: team.tag,
            status: team.status.as_str(),
            group_name: team.group_name,
            totals,
            created_at: team.created_at,
            players: None,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRound {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<Round> for JsonRound {
    fn from(round: Round) -> Self {
        Self {
            id: round.id.0,
            name: round.name,
            created_at: round.created_at,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRecomputeReport {
    teams_updated: usize,
    players_updated: usize,
    warnings: Vec<String>,
}

impl From<RecomputeReport> for JsonRecomputeReport {
    fn from(report: RecomputeReport) -> Self {
        Self {
            teams_updated: report.teams_updated,
            players_updated: report.players_updated,
            warnings: report.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}
