use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            BasicLoginRequest, ContactRequest, MessageResponse, OAuthCallbackQuery,
            PasswordRequest, SignupRequest, TokenResponse,
        },
        jwt::{GuestCaller, SetupUser},
        oauth::{self, Provider},
        password::{hash_password, verify_password},
        repo_types::{BasicUser, GuestUser},
    },
    state::AppState,
};

const GUEST_TOKEN_LEN: usize = 24;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/pwregist", post(pwregist))
        .route("/basic", post(basic_login))
        .route("/guestlogin", post(guest_login))
        .route("/contact", post(contact))
        .route("/google", get(google_start))
        .route("/google/callback", get(google_callback))
        .route("/github", get(github_start))
        .route("/github/callback", get(github_callback))
}

/// Creates a pending password account and mails a setup link carrying a
/// password-setup token. A mail failure deletes the row again.
#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let email = payload.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!(%email, "signup invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    match BasicUser::find_by_email(&state.db, &email).await {
        Ok(Some(_)) => {
            warn!(%email, "signup with registered email");
            return Err((
                StatusCode::BAD_REQUEST,
                "This email address is already registered".into(),
            ));
        }
        Ok(None) => {}
        Err(e) => return Err((StatusCode::BAD_REQUEST, e.to_string())),
    }

    let pending = BasicUser::create_pending(&state.db, &payload.name, &email)
        .await
        .map_err(|e| {
            error!(error = %e, "create pending account failed");
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    let token = state
        .jwt
        .sign_setup(&pending.name, pending.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let link = format!("{}/psregistration/{}", state.config.client_origin, token);
    let html = format!(
        "Thank you for signing up.<br>\
         Please set your password from the link below.<br>\
         The link is valid for 2 hours.<br>{link}"
    );

    if let Err(e) = state
        .mailer
        .send(&email, "Your registration with mydic", &html)
        .await
    {
        error!(error = %e, %email, "setup mail failed, rolling back pending account");
        if let Err(del) = BasicUser::delete(&state.db, pending.id).await {
            error!(error = %del, "compensating delete failed");
        }
        return Err((
            StatusCode::BAD_REQUEST,
            "Could not send the registration mail, please sign up again".into(),
        ));
    }

    info!(user_id = %pending.id, "signup mail sent");
    Ok(Json(MessageResponse::new(
        "A registration mail was sent to your address",
    )))
}

/// Stores the password for the pending account named by the setup token.
#[instrument(skip(state, payload))]
async fn pwregist(
    State(state): State<AppState>,
    SetupUser(user_id): SetupUser,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let hash = hash_password(&payload.password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    BasicUser::set_password(&state.db, user_id, &hash)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "set password failed");
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    info!(%user_id, "password registered");
    Ok(Json(MessageResponse::new(
        "Password registered, please log in",
    )))
}

/// Email/password login, reachable only with a guest token. Issues a
/// session token on success; both failure kinds answer the same way.
#[instrument(skip(state, payload))]
async fn basic_login(
    State(state): State<AppState>,
    GuestCaller(_guest_id): GuestCaller,
    Json(payload): Json<BasicLoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let email = payload.email.trim().to_lowercase();
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    let user = match BasicUser::find_by_email(&state.db, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%email, "basic login unknown email");
            return Err(invalid());
        }
        Err(e) => {
            error!(error = %e, "basic login lookup failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    // Pending accounts have no password yet.
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "basic login before password setup");
        return Err(invalid());
    };

    let ok = verify_password(&payload.password, hash)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !ok {
        warn!(user_id = %user.id, "basic login wrong password");
        return Err(invalid());
    }

    let token = state
        .jwt
        .sign_session(&user.name, user.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(user_id = %user.id, "basic login");
    Ok(Json(TokenResponse { token }))
}

/// Persists a fresh opaque guest identity and answers with a guest-audience
/// bearer token for it.
#[instrument(skip(state))]
async fn guest_login(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let opaque: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GUEST_TOKEN_LEN)
        .map(char::from)
        .collect();

    let guest = GuestUser::create(&state.db, &opaque).await.map_err(|e| {
        error!(error = %e, "guest row insert failed");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let token = state
        .jwt
        .sign_guest(guest.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(guest_id = %guest.id, "guest login");
    Ok(Json(TokenResponse { token }))
}

/// Forwards a contact-form message to the site owner via the mail API.
#[instrument(skip(state, payload))]
async fn contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let html = format!(
        "From: {}<br><br>{}",
        payload.email,
        payload.message.replace('\n', "<br>")
    );
    state
        .mailer
        .send(&state.config.mail.contact_recipient, &payload.subject, &html)
        .await
        .map_err(|e| {
            error!(error = %e, "contact mail failed");
            (
                StatusCode::BAD_REQUEST,
                "Could not send your message, please try again".into(),
            )
        })?;
    Ok(Json(MessageResponse::new("Your message was sent")))
}

// --- OAuth ---

fn oauth_start(state: &AppState, provider: Provider) -> Result<Redirect, (StatusCode, String)> {
    let cfg = match provider {
        Provider::Google => &state.config.google,
        Provider::GitHub => &state.config.github,
    };
    let client = oauth::build_client(provider, cfg)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Redirect::to(&oauth::authorize_url(&client, provider)))
}

/// Callback tail shared by both providers: exchange the code, resolve the
/// identity, and bounce back to the client with or without a token.
async fn oauth_finish(
    state: &AppState,
    provider: Provider,
    query: OAuthCallbackQuery,
) -> Redirect {
    let fallback = format!("{}/#/mypage", state.config.client_origin);

    let Some(code) = query.code else {
        warn!(provider = provider.as_str(), "oauth callback without code");
        return Redirect::to(&fallback);
    };

    let cfg = match provider {
        Provider::Google => &state.config.google,
        Provider::GitHub => &state.config.github,
    };
    let client = match oauth::build_client(provider, cfg) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, provider = provider.as_str(), "oauth client build failed");
            return Redirect::to(&fallback);
        }
    };

    let profile = match oauth::fetch_profile(&client, provider, code).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, provider = provider.as_str(), "oauth profile fetch failed");
            return Redirect::to(&fallback);
        }
    };

    match oauth::resolve_or_create_identity(&state.db, &state.jwt, &profile).await {
        Ok(token) => {
            info!(provider = provider.as_str(), "social login");
            Redirect::to(&format!("{}/#/mypage/{}", state.config.client_origin, token))
        }
        Err(e) => {
            error!(error = %e, provider = provider.as_str(), "identity resolve failed");
            Redirect::to(&fallback)
        }
    }
}

#[instrument(skip(state))]
async fn google_start(State(state): State<AppState>) -> Result<Redirect, (StatusCode, String)> {
    oauth_start(&state, Provider::Google)
}

#[instrument(skip(state, query))]
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Redirect {
    oauth_finish(&state, Provider::Google, query).await
}

#[instrument(skip(state))]
async fn github_start(State(state): State<AppState>) -> Result<Redirect, (StatusCode, String)> {
    oauth_start(&state, Provider::GitHub)
}

#[instrument(skip(state, query))]
async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Redirect {
    oauth_finish(&state, Provider::GitHub, query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_serializes_token_field() {
        let json = serde_json::to_string(&TokenResponse {
            token: "abc".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"token":"abc"}"#);
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co.jp"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("user@nodot"));
    }

    #[test]
    fn guest_opaque_token_shape() {
        let opaque: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GUEST_TOKEN_LEN)
            .map(char::from)
            .collect();
        assert_eq!(opaque.len(), 24);
        assert!(opaque.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
