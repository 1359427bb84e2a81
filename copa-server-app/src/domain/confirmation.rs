use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{RoundId, TeamId};

/// Operations that wipe data and therefore need a second, explicit confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestructiveAction {
    DeleteTeam(TeamId),
    DeleteRound(RoundId),
    ResetKeepingMvp,
    ResetSystem,
}

impl std::fmt::Display for DestructiveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestructiveAction::DeleteTeam(id) => write!(f, "delete team {}", id),
            DestructiveAction::DeleteRound(id) => write!(f, "delete round {}", id),
            DestructiveAction::ResetKeepingMvp => write!(f, "reset keeping MVP"),
            DestructiveAction::ResetSystem => write!(f, "reset system"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(pub uuid::Uuid);

impl ConfirmationToken {
    pub fn new() -> Self {
        ConfirmationToken(uuid::Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        uuid::Uuid::parse_str(value).ok().map(ConfirmationToken)
    }
}

impl std::fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmationTicket {
    pub token: ConfirmationToken,
    pub action: DestructiveAction,
    pub expires_at: DateTime<Utc>,
}

pub trait ConfirmationService {
    fn request(&self, action: DestructiveAction) -> ConfirmationTicket;
    /// Consumes the ticket. A token can be redeemed at most once.
    fn redeem(&self, token: ConfirmationToken) -> Option<DestructiveAction>;
}

pub struct ConfirmationServiceImpl {
    ttl: Duration,
    pending: moka::sync::Cache<ConfirmationToken, DestructiveAction>,
}

impl ConfirmationServiceImpl {
    pub fn new(ttl: Duration) -> Self {
        let pending = moka::sync::Cache::builder()
            .max_capacity(1_000)
            .time_to_live(ttl)
            .build();
        Self { ttl, pending }
    }
}

impl ConfirmationService for ConfirmationServiceImpl {
    fn request(&self, action: DestructiveAction) -> ConfirmationTicket {
        let token = ConfirmationToken::new();
        self.pending.insert(token, action.clone());
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::seconds(60));
        log::info!("Confirmation requested for {}", action);
        ConfirmationTicket {
            token,
            action,
            expires_at,
        }
    }

    fn redeem(&self, token: ConfirmationToken) -> Option<DestructiveAction> {
        self.pending.remove(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_single_use() {
        let service = ConfirmationServiceImpl::new(Duration::from_secs(60));
        let ticket = service.request(DestructiveAction::ResetSystem);
        assert_eq!(ticket.action, DestructiveAction::ResetSystem);
        assert!(ticket.expires_at > Utc::now());

        assert_eq!(
            service.redeem(ticket.token),
            Some(DestructiveAction::ResetSystem)
        );
        assert_eq!(service.redeem(ticket.token), None);
        assert_eq!(service.redeem(ConfirmationToken::new()), None);
    }

    #[test]
    fn test_tokens_expire() {
        let service = ConfirmationServiceImpl::new(Duration::from_millis(20));
        let ticket = service.request(DestructiveAction::DeleteRound(RoundId(3)));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(service.redeem(ticket.token), None);
    }

    #[test]
    fn test_token_parse() {
        let token = ConfirmationToken::new();
        assert_eq!(ConfirmationToken::parse(&token.to_string()), Some(token));
        assert_eq!(ConfirmationToken::parse("not-a-token"), None);
    }
}
