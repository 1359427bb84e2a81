use std::collections::HashMap;

use copa_core::{MvpKey, StandingKey, TeamTotals, sort_mvp, sort_standings};

use crate::domain::{
    PlayerId, RoundId, TeamId,
    player::Player,
    round::RoundResult,
    team::{Team, TeamStatus},
};

/// Label of the unfiltered standings tab.
pub const OVERALL_LABEL: &str = "GERAL";

pub const DEFAULT_MVP_LIMIT: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StandingsFilter {
    Overall,
    Group(String),
}

impl StandingsFilter {
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => StandingsFilter::Overall,
            Some(l) if l.eq_ignore_ascii_case(OVERALL_LABEL) => StandingsFilter::Overall,
            Some(l) => StandingsFilter::Group(l.to_string()),
        }
    }

    fn matches(&self, team: &Team) -> bool {
        match self {
            StandingsFilter::Overall => true,
            StandingsFilter::Group(name) => team.group_name.as_deref() == Some(name.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TeamStanding {
    pub rank: usize,
    pub team: Team,
    pub totals: TeamTotals,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RoundOutcome {
    Recorded {
        position: u32,
        position_points: u32,
        kills: u32,
        booyah: bool,
    },
    Pending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoundStandingEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub team_tag: String,
    pub outcome: RoundOutcome,
}

#[derive(Clone, Debug, Default)]
pub struct MvpQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MvpEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub player_name: String,
    pub kills: u32,
    pub team_id: TeamId,
    pub team_name: String,
    pub team_tag: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TeamKillsEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub team_tag: String,
    pub kills: u32,
}

/// A stored aggregate that disagrees with the rows it is supposed to summarise.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsistencyWarning {
    TeamTotals {
        team_id: TeamId,
        stored: TeamTotals,
        computed: TeamTotals,
    },
    RoundResult {
        round_id: RoundId,
        team_id: TeamId,
        stored_kills: u32,
        player_kills: u32,
        stored_points: u32,
        table_points: u32,
    },
    PlayerKills {
        player_id: PlayerId,
        stored: u32,
        computed: u32,
    },
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyWarning::TeamTotals {
                team_id,
                stored,
                computed,
            } => write!(
                f,
                "team {} stored totals {:?} but its rounds add up to {:?}",
                team_id, stored, computed
            ),
            ConsistencyWarning::RoundResult {
                round_id,
                team_id,
                stored_kills,
                player_kills,
                stored_points,
                table_points,
            } => write!(
                f,
                "result of team {} in round {} stored {} kills / {} points, rows give {} kills / {} points",
                team_id, round_id, stored_kills, stored_points, player_kills, table_points
            ),
            ConsistencyWarning::PlayerKills {
                player_id,
                stored,
                computed,
            } => write!(
                f,
                "player {} stored {} kills, baseline and rounds give {}",
                player_id, stored, computed
            ),
        }
    }
}

pub trait StandingsService {
    fn compute_totals(&self, team: &Team, results: &[RoundResult]) -> TeamTotals;
    fn check_team(&self, team: &Team, computed: &TeamTotals) -> Option<ConsistencyWarning>;
    fn check_result(&self, result: &RoundResult) -> Option<ConsistencyWarning>;
    fn derive_player_kills(
        &self,
        players: &[Player],
        results: &[RoundResult],
    ) -> Vec<(PlayerId, u32)>;
    fn rank_teams(
        &self,
        teams: Vec<(Team, TeamTotals)>,
        filter: &StandingsFilter,
    ) -> Vec<TeamStanding>;
    fn round_view(&self, teams: &[Team], results: &[RoundResult]) -> Vec<RoundStandingEntry>;
    fn mvp_ranking(&self, players: &[Player], teams: &[Team], query: &MvpQuery)
    -> Vec<MvpEntry>;
    fn team_kills(&self, players: &[Player], teams: &[Team]) -> Vec<TeamKillsEntry>;
    fn group_names(&self, teams: &[Team]) -> Vec<String>;
}

pub struct StandingsServiceImpl;

impl StandingsServiceImpl {
    pub fn new() -> Self {
        Self {}
    }

    fn is_ranked(team: &Team) -> bool {
        team.status != TeamStatus::Rejected
    }
}

impl StandingsService for StandingsServiceImpl {
    fn compute_totals(&self, team: &Team, results: &[RoundResult]) -> TeamTotals {
        TeamTotals::from_rounds(
            results
                .iter()
                .filter(|r| r.team_id == team.id)
                .map(RoundResult::tally),
            team.penalty_points,
        )
    }

    fn check_team(&self, team: &Team, computed: &TeamTotals) -> Option<ConsistencyWarning> {
        let stored = team.stored_totals();
        if stored == *computed {
            return None;
        }
        Some(ConsistencyWarning::TeamTotals {
            team_id: team.id,
            stored,
            computed: *computed,
        })
    }

    fn check_result(&self, result: &RoundResult) -> Option<ConsistencyWarning> {
        let tally = result.tally();
        if tally.kills == result.kills
            && tally.position_points() == result.position_points
            && tally.booyah() == result.booyah
        {
            return None;
        }
        Some(ConsistencyWarning::RoundResult {
            round_id: result.round_id,
            team_id: result.team_id,
            stored_kills: result.kills,
            player_kills: tally.kills,
            stored_points: result.position_points,
            table_points: tally.position_points(),
        })
    }

    fn derive_player_kills(
        &self,
        players: &[Player],
        results: &[RoundResult],
    ) -> Vec<(PlayerId, u32)> {
        let mut round_kills: HashMap<PlayerId, u32> = HashMap::new();
        for player_result in results.iter().flat_map(|r| r.player_results.iter()) {
            let entry = round_kills.entry(player_result.player_id).or_default();
            *entry = entry.saturating_add(player_result.kills);
        }
        players
            .iter()
            .map(|p| {
                let from_rounds = round_kills.get(&p.id).copied().unwrap_or(0);
                (p.id, p.baseline_kills.saturating_add(from_rounds))
            })
            .collect()
    }

    fn rank_teams(
        &self,
        teams: Vec<(Team, TeamTotals)>,
        filter: &StandingsFilter,
    ) -> Vec<TeamStanding> {
        let mut standings: Vec<(Team, TeamTotals)> = teams
            .into_iter()
            .filter(|(team, _)| Self::is_ranked(team) && filter.matches(team))
            .collect();
        sort_standings(&mut standings, |(team, totals)| StandingKey {
            total_points: totals.total_points,
            booyahs: totals.booyahs,
            team_kills: totals.team_kills,
            id: team.id.0,
        });
        standings
            .into_iter()
            .enumerate()
            .map(|(index, (team, totals))| TeamStanding {
                rank: index + 1,
                team,
                totals,
            })
            .collect()
    }

    fn round_view(&self, teams: &[Team], results: &[RoundResult]) -> Vec<RoundStandingEntry> {
        let by_team: HashMap<TeamId, &RoundResult> =
            results.iter().map(|r| (r.team_id, r)).collect();

        let mut recorded = Vec::new();
        let mut pending = Vec::new();
        for team in teams.iter().filter(|t| Self::is_ranked(t)) {
            match by_team.get(&team.id) {
                Some(result) => recorded.push((team, *result)),
                None => pending.push(team),
            }
        }
        recorded.sort_by(|(a_team, a), (b_team, b)| {
            a.position
                .cmp(&b.position)
                .then_with(|| b.kills.cmp(&a.kills))
                .then_with(|| a_team.id.cmp(&b_team.id))
        });
        pending.sort_by_key(|t| t.id);

        recorded
            .into_iter()
            .map(|(team, result)| RoundStandingEntry {
                team_id: team.id,
                team_name: team.name.clone(),
                team_tag: team.tag.clone(),
                outcome: RoundOutcome::Recorded {
                    position: result.position,
                    position_points: result.position_points,
                    kills: result.kills,
                    booyah: result.booyah,
                },
            })
            .chain(pending.into_iter().map(|team| RoundStandingEntry {
                team_id: team.id,
                team_name: team.name.clone(),
                team_tag: team.tag.clone(),
                outcome: RoundOutcome::Pending,
            }))
            .collect()
    }

    fn mvp_ranking(
        &self,
        players: &[Player],
        teams: &[Team],
        query: &MvpQuery,
    ) -> Vec<MvpEntry> {
        let teams_by_id: HashMap<TeamId, &Team> = teams.iter().map(|t| (t.id, t)).collect();
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut eligible: Vec<(&Player, &Team)> = players
            .iter()
            .filter(|p| p.kills > 0)
            .filter_map(|p| teams_by_id.get(&p.team_id).map(|t| (p, *t)))
            .filter(|(p, t)| match &needle {
                None => true,
                Some(needle) => {
                    p.name.to_lowercase().contains(needle)
                        || t.name.to_lowercase().contains(needle)
                        || t.tag.to_lowercase().contains(needle)
                }
            })
            .collect();
        sort_mvp(&mut eligible, |(p, _)| MvpKey {
            kills: p.kills,
            id: p.id.0,
        });

        eligible
            .into_iter()
            .take(query.limit.unwrap_or(DEFAULT_MVP_LIMIT))
            .enumerate()
            .map(|(index, (player, team))| MvpEntry {
                rank: index + 1,
                player_id: player.id,
                player_name: player.name.clone(),
                kills: player.kills,
                team_id: team.id,
                team_name: team.name.clone(),
                team_tag: team.tag.clone(),
            })
            .collect()
    }

    fn team_kills(&self, players: &[Player], teams: &[Team]) -> Vec<TeamKillsEntry> {
        let mut kills_by_team: HashMap<TeamId, u32> = HashMap::new();
        for player in players {
            let entry = kills_by_team.entry(player.team_id).or_default();
            *entry = entry.saturating_add(player.kills);
        }
        let mut entries: Vec<TeamKillsEntry> = teams
            .iter()
            .filter_map(|team| {
                kills_by_team.get(&team.id).map(|kills| TeamKillsEntry {
                    team_id: team.id,
                    team_name: team.name.clone(),
                    team_tag: team.tag.clone(),
                    kills: *kills,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then_with(|| a.team_tag.cmp(&b.team_tag))
        });
        entries
    }

    fn group_names(&self, teams: &[Team]) -> Vec<String> {
        let mut names: Vec<String> = teams
            .iter()
            .filter_map(|t| t.group_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
