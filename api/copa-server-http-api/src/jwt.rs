use axum::{
    Json, RequestPartsExt,
    extract::{FromRequestParts, State},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ServiceError};

const TOKEN_LIFETIME_HOURS: i64 = 12;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    exp: usize,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password_hash: Option<String>,
}

/// Issues and checks admin session tokens. Login is refused entirely when no
/// admin credentials are configured.
pub struct AdminAuth {
    keys: Keys,
    username: Option<String>,
    password_hash: Option<String>,
}

impl AdminAuth {
    pub fn new(config: AuthConfig) -> Self {
        let secret = match config.jwt_secret {
            Some(secret) => secret.into_bytes(),
            None => {
                info!("JWT secret not configured, generating a random one...");
                Uuid::new_v4().as_bytes().to_vec()
            }
        };
        if config.admin_username.is_none() || config.admin_password_hash.is_none() {
            warn!("Admin credentials not configured, admin login is disabled");
        }
        Self {
            keys: Keys::new(&secret),
            username: config.admin_username,
            password_hash: config.admin_password_hash,
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let (Some(expected), Some(hash)) = (&self.username, &self.password_hash) else {
            return Err(ServiceError::Unauthorized(
                "Admin login is disabled".to_string(),
            ));
        };
        let valid = username == expected && bcrypt::verify(password, hash).unwrap_or(false);
        if !valid {
            warn!("Failed admin login attempt for {:?}", username);
            return Err(ServiceError::Unauthorized("Wrong credentials".to_string()));
        }
        self.generate_jwt(username)
    }

    fn generate_jwt(&self, username: &str) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp()
                as usize,
        };
        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| ServiceError::BadRequest(format!("Failed to issue token: {}", e)))
    }

    fn validate_jwt(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }
}

/// Extractor for endpoints that require an admin session.
pub struct Admin(pub Claims);

impl FromRequestParts<AppState> for Admin {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ServiceError::Unauthorized("Missing bearer token".to_string()))?;
        state
            .auth
            .validate_jwt(bearer.token())
            .map(Admin)
            .ok_or_else(|| ServiceError::Unauthorized("Invalid token".to_string()))
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthBody {
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthBody>, ServiceError> {
    let token = state.auth.login(&request.username, &request.password)?;
    info!("Admin {} logged in", request.username);
    Ok(Json(AuthBody { token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AdminAuth {
        AdminAuth::new(AuthConfig {
            jwt_secret: Some("test-secret".to_string()),
            admin_username: Some("admin".to_string()),
            admin_password_hash: Some(bcrypt::hash("hunter2", 4).unwrap()),
        })
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let auth = auth();
        let token = auth.login("admin", "hunter2").unwrap();
        let claims = auth.validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn test_login_rejects_wrong_credentials() {
        let auth = auth();
        assert!(matches!(
            auth.login("admin", "wrong"),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("root", "hunter2"),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = auth().login("admin", "hunter2").unwrap();
        let other = AdminAuth::new(AuthConfig {
            jwt_secret: Some("another-secret".to_string()),
            ..Default::default()
        });
        assert!(other.validate_jwt(&token).is_none());
    }

    #[test]
    fn test_login_disabled_without_credentials() {
        let auth = AdminAuth::new(AuthConfig::default());
        assert!(matches!(
            auth.login("admin", "hunter2"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
