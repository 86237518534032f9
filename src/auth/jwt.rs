use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Which endpoint class a token is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Guest,
    PasswordSetup,
    UserSession,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Guest => "guest",
            Audience::PasswordSetup => "password-setup",
            Audience::UserSession => "user-session",
        }
    }

    fn ttl(&self) -> Duration {
        match self {
            Audience::Guest => Duration::days(7),
            Audience::PasswordSetup | Audience::UserSession => Duration::hours(2),
        }
    }

    /// 401 message shown when a token for this audience is rejected.
    fn expired_message(&self) -> &'static str {
        match self {
            Audience::Guest => "Guest session is invalid or expired",
            Audience::PasswordSetup => "Password setup link is invalid or expired",
            Audience::UserSession => "Session is invalid or expired, please log in again",
        }
    }
}

/// JWT payload. `name` is only present on session and password-setup tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

/// RS256 key pair, read once at startup and immutable for the process
/// lifetime. No rotation support.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_files(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let private_pem = std::fs::read(&cfg.private_key_path)?;
        let public_pem = std::fs::read(&cfg.public_key_path)?;
        Self::from_pems(&private_pem, &public_pem)
    }

    pub fn from_pems(private_pem: &[u8], public_pem: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            encoding: EncodingKey::from_rsa_pem(private_pem)?,
            decoding: DecodingKey::from_rsa_pem(public_pem)?,
        })
    }

    fn sign(&self, audience: Audience, sub: Uuid, name: Option<String>) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + audience.ttl();
        let claims = Claims {
            sub,
            name,
            aud: audience.as_str().to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding)?;
        debug!(%sub, audience = audience.as_str(), "jwt signed");
        Ok(token)
    }

    /// Guest tokens identify a guestusers row for 7 days.
    pub fn sign_guest(&self, sub: Uuid) -> anyhow::Result<String> {
        self.sign(Audience::Guest, sub, None)
    }

    /// Password-setup tokens gate `/auth/pwregist` for 2 hours after signup.
    pub fn sign_setup(&self, name: &str, sub: Uuid) -> anyhow::Result<String> {
        self.sign(Audience::PasswordSetup, sub, Some(name.to_string()))
    }

    /// Session tokens carry the display name shown on the client.
    pub fn sign_session(&self, name: &str, sub: Uuid) -> anyhow::Result<String> {
        self.sign(Audience::UserSession, sub, Some(name.to_string()))
    }

    /// Signature, expiry and exact-audience check. Expired, malformed and
    /// audience-mismatched tokens all fail the same way.
    pub fn verify(&self, token: &str, audience: Audience) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience.as_str()]);
        // No clock leeway: a token past its expiry is rejected immediately.
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(sub = %data.claims.sub, audience = audience.as_str(), "jwt verified");
        Ok(data.claims)
    }
}

fn bearer_claims(
    parts: &Parts,
    state: &AppState,
    audience: Audience,
) -> Result<Claims, (StatusCode, String)> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "No token supplied".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or((
        StatusCode::UNAUTHORIZED,
        "Invalid Authorization header".to_string(),
    ))?;

    state.jwt.verify(token, audience).map_err(|e| {
        warn!(error = %e, audience = audience.as_str(), "token rejected");
        (
            StatusCode::UNAUTHORIZED,
            audience.expired_message().to_string(),
        )
    })
}

/// Extracts a verified user-session token.
pub struct SessionUser {
    pub id: Uuid,
    pub name: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state, Audience::UserSession)?;
        Ok(SessionUser {
            id: claims.sub,
            name: claims.name,
        })
    }
}

/// Extracts a verified guest token.
pub struct GuestCaller(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for GuestCaller {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state, Audience::Guest)?;
        Ok(GuestCaller(claims.sub))
    }
}

/// Extracts a verified password-setup token.
pub struct SetupUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for SetupUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state, Audience::PasswordSetup)?;
        Ok(SetupUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn make_keys() -> JwtKeys {
        AppState::fake().jwt
    }

    #[tokio::test]
    async fn sign_and_verify_session_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_session("Alice", user_id).expect("sign session");
        let claims = keys
            .verify(&token, Audience::UserSession)
            .expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert_eq!(claims.aud, "user-session");
    }

    #[tokio::test]
    async fn sign_and_verify_guest_token() {
        let keys = make_keys();
        let guest_id = Uuid::new_v4();
        let token = keys.sign_guest(guest_id).expect("sign guest");
        let claims = keys.verify(&token, Audience::Guest).expect("verify token");
        assert_eq!(claims.sub, guest_id);
        assert_eq!(claims.name, None);
    }

    #[tokio::test]
    async fn audience_mismatch_is_rejected_both_ways() {
        let keys = make_keys();
        let guest = keys.sign_guest(Uuid::new_v4()).expect("sign guest");
        let session = keys
            .sign_session("Bob", Uuid::new_v4())
            .expect("sign session");
        assert!(keys.verify(&guest, Audience::UserSession).is_err());
        assert!(keys.verify(&session, Audience::Guest).is_err());
    }

    #[tokio::test]
    async fn setup_token_does_not_pass_session_verification() {
        let keys = make_keys();
        let token = keys.sign_setup("Carol", Uuid::new_v4()).expect("sign setup");
        assert!(keys.verify(&token, Audience::PasswordSetup).is_ok());
        assert!(keys.verify(&token, Audience::UserSession).is_err());
    }

    #[tokio::test]
    async fn malformed_token_is_rejected() {
        let keys = make_keys();
        assert!(keys.verify("not-a-jwt", Audience::Guest).is_err());
    }

    fn sign_with_exp(keys: &JwtKeys, audience: Audience, exp: OffsetDateTime) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            name: None,
            aud: audience.as_str().to_string(),
            iat: (now - Duration::hours(2)).unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &keys.encoding).expect("encode")
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let keys = make_keys();
        let token = sign_with_exp(
            &keys,
            Audience::Guest,
            OffsetDateTime::now_utc() - Duration::hours(1),
        );
        assert!(keys.verify(&token, Audience::Guest).is_err());
    }

    #[tokio::test]
    async fn just_expired_token_gets_no_leeway() {
        let keys = make_keys();
        // Expired only seconds ago; the decoder's default 60s leeway would
        // still accept this one.
        let token = sign_with_exp(
            &keys,
            Audience::UserSession,
            OffsetDateTime::now_utc() - Duration::seconds(5),
        );
        assert!(keys.verify(&token, Audience::UserSession).is_err());
    }

    #[tokio::test]
    async fn token_before_expiry_yields_original_payload() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_session("Dave", user_id).expect("sign session");
        let claims = keys.verify(&token, Audience::UserSession).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.name.as_deref(), Some("Dave"));
    }

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[tokio::test]
    async fn extractor_rejects_missing_header() {
        let state = AppState::fake();
        let parts = parts_with_header(None);
        let (status, message) =
            bearer_claims(&parts, &state, Audience::UserSession).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "No token supplied");
    }

    #[tokio::test]
    async fn extractor_rejects_non_bearer_scheme() {
        let state = AppState::fake();
        let parts = parts_with_header(Some("Basic dXNlcjpwdw=="));
        let (status, message) = bearer_claims(&parts, &state, Audience::Guest).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Invalid Authorization header");
    }

    #[tokio::test]
    async fn extractor_rejects_token_for_other_audience() {
        let state = AppState::fake();
        let guest = state.jwt.sign_guest(Uuid::new_v4()).expect("sign guest");
        let parts = parts_with_header(Some(&format!("Bearer {guest}")));
        let (status, message) =
            bearer_claims(&parts, &state, Audience::UserSession).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, Audience::UserSession.expired_message());
    }
}
