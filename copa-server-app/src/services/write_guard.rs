use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    domain::{PlayerId, RoundId, TeamId},
    error::AppError,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WriteKey {
    RoundResult(RoundId, TeamId),
    Round(RoundId),
    NewRound(String),
    Team(TeamId),
    NewTeam(String),
    Player(PlayerId),
    Reset,
}

impl std::fmt::Display for WriteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteKey::RoundResult(round_id, team_id) => {
                write!(f, "result entry for team {} in round {}", team_id, round_id)
            }
            WriteKey::Round(id) => write!(f, "change to round {}", id),
            WriteKey::NewRound(name) => write!(f, "creation of round {}", name),
            WriteKey::Team(id) => write!(f, "change to team {}", id),
            WriteKey::NewTeam(tag) => write!(f, "registration of team {}", tag),
            WriteKey::Player(id) => write!(f, "kill correction for player {}", id),
            WriteKey::Reset => write!(f, "tournament reset"),
        }
    }
}

/// Tracks writes that have been sent to the store and not answered yet, so a
/// repeated submission of the same form is refused instead of racing the first.
#[derive(Clone, Default)]
pub struct WriteGuard {
    in_flight: Arc<DashMap<WriteKey, ()>>,
}

pub struct WritePermit {
    key: WriteKey,
    in_flight: Arc<DashMap<WriteKey, ()>>,
}

impl WriteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: WriteKey) -> Option<WritePermit> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(WritePermit {
                    key,
                    in_flight: self.in_flight.clone(),
                })
            }
        }
    }

    pub fn acquire(&self, key: WriteKey) -> Result<WritePermit, AppError> {
        let description = key.to_string();
        self.try_acquire(key).ok_or_else(|| {
            log::warn!("Refusing duplicate {}", description);
            AppError::OperationInProgress(description)
        })
    }

    pub fn is_in_flight(&self, key: &WriteKey) -> bool {
        self.in_flight.contains_key(key)
    }
}

impl Drop for WritePermit {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}
