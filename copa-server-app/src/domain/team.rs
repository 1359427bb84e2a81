use chrono::{DateTime, Utc};
use copa_core::TeamTotals;

use crate::{
    domain::{
        RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, TeamId, player::Player,
    },
    error::ValidationError,
};

pub const STARTERS: usize = 4;
pub const MAX_PLAYERS: usize = 6;
pub const MAX_TAG_LEN: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TeamStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamStatus::Pending => "pending",
            TeamStatus::Confirmed => "confirmed",
            TeamStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TeamStatus::Pending),
            "confirmed" => Some(TeamStatus::Confirmed),
            "rejected" => Some(TeamStatus::Rejected),
            _ => None,
        }
    }

    /// Rejected teams stay rejected.
    pub fn can_transition_to(&self, next: TeamStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (TeamStatus::Pending, TeamStatus::Confirmed) => true,
            (TeamStatus::Pending, TeamStatus::Rejected) => true,
            (TeamStatus::Confirmed, TeamStatus::Pending) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub tag: String,
    pub status: TeamStatus,
    pub group_name: Option<String>,
    pub booyahs: u32,
    pub team_kills: u32,
    pub penalty_points: u32,
    /// Sum of position points over all recorded rounds.
    pub position_points: u32,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn stored_totals(&self) -> TeamTotals {
        TeamTotals {
            team_kills: self.team_kills,
            position_points: self.position_points,
            booyahs: self.booyahs,
            penalty_points: self.penalty_points,
            total_points: self.total_points,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewPlayer {
    pub name: String,
    pub is_reserve: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewTeam {
    pub name: String,
    pub tag: String,
    pub status: TeamStatus,
    pub players: Vec<NewPlayer>,
}

/// Raw registration form as typed in by a team captain or an administrator.
#[derive(Clone, Debug)]
pub struct TeamRegistration {
    pub name: String,
    pub tag: String,
    pub players: Vec<String>,
}

impl TeamRegistration {
    pub fn into_new_team(self, status: TeamStatus) -> Result<NewTeam, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::TeamNameRequired);
        }
        let tag = self.tag.trim().to_uppercase();
        if tag.is_empty() {
            return Err(ValidationError::TeamTagRequired);
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(ValidationError::TeamTagTooLong { max: MAX_TAG_LEN });
        }

        let names: Vec<String> = self
            .players
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if names.len() < STARTERS {
            return Err(ValidationError::RosterTooSmall { min: STARTERS });
        }
        if names.len() > MAX_PLAYERS {
            return Err(ValidationError::RosterTooLarge { max: MAX_PLAYERS });
        }

        let players = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| NewPlayer {
                name,
                is_reserve: index >= STARTERS,
            })
            .collect();

        Ok(NewTeam {
            name,
            tag,
            status,
            players,
        })
    }
}

#[async_trait::async_trait]
pub trait TeamRepository {
    /// Inserts the team together with its roster. A taken tag is a `Conflict`.
    async fn create_team(&self, team: NewTeam) -> Result<(Team, Vec<Player>), RepoCreateError>;
    async fn get_team(&self, team_id: TeamId) -> Result<Team, RepoRetrieveError>;
    async fn list_teams(&self) -> Result<Vec<Team>, RepoError>;
    async fn set_status(&self, team_id: TeamId, status: TeamStatus) -> Result<(), RepoUpdateError>;
    async fn set_group(
        &self,
        team_id: TeamId,
        group_name: Option<String>,
    ) -> Result<(), RepoUpdateError>;
    async fn set_penalty(&self, team_id: TeamId, penalty_points: u32)
    -> Result<(), RepoUpdateError>;
    async fn store_totals(&self, team_id: TeamId, totals: TeamTotals)
    -> Result<(), RepoUpdateError>;
    /// Removes the team, its players and every round result it had.
    async fn delete_team(&self, team_id: TeamId) -> Result<(), RepoUpdateError>;
}
