use anyhow::Context;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl,
    Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::User;
use crate::config::OAuthProviderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    GitHub,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }

    fn auth_url(&self) -> &'static str {
        match self {
            Provider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Provider::GitHub => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_url(&self) -> &'static str {
        match self {
            Provider::Google => "https://oauth2.googleapis.com/token",
            Provider::GitHub => "https://github.com/login/oauth/access_token",
        }
    }

    fn scopes(&self) -> &'static [&'static str] {
        match self {
            Provider::Google => &["email", "profile"],
            Provider::GitHub => &["user:email"],
        }
    }
}

/// Federated identity as far as this service cares: an address plus an
/// optional display name.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub email: String,
    pub display_name: Option<String>,
}

pub fn build_client(provider: Provider, cfg: &OAuthProviderConfig) -> anyhow::Result<BasicClient> {
    let client = BasicClient::new(
        ClientId::new(cfg.client_id.clone()),
        Some(ClientSecret::new(cfg.client_secret.clone())),
        AuthUrl::new(provider.auth_url().to_string())?,
        Some(TokenUrl::new(provider.token_url().to_string())?),
    )
    .set_redirect_uri(RedirectUrl::new(cfg.callback_url.clone())?);
    Ok(client)
}

/// Provider authorization URL the client is redirected to.
pub fn authorize_url(client: &BasicClient, provider: Provider) -> String {
    let mut request = client.authorize_url(CsrfToken::new_random);
    for scope in provider.scopes() {
        request = request.add_scope(Scope::new(scope.to_string()));
    }
    let (url, _csrf) = request.url();
    url.to_string()
}

/// Exchanges the callback code and fetches the provider profile.
pub async fn fetch_profile(
    client: &BasicClient,
    provider: Provider,
    code: String,
) -> anyhow::Result<ExternalProfile> {
    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .with_context(|| format!("{} code exchange", provider.as_str()))?;
    let access_token = token.access_token().secret();

    match provider {
        Provider::Google => fetch_google_profile(access_token).await,
        Provider::GitHub => fetch_github_profile(access_token).await,
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    name: Option<String>,
}

async fn fetch_google_profile(access_token: &str) -> anyhow::Result<ExternalProfile> {
    let info: GoogleUserInfo = reqwest::Client::new()
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(access_token)
        .send()
        .await
        .context("google userinfo request")?
        .error_for_status()
        .context("google userinfo status")?
        .json()
        .await
        .context("google userinfo body")?;
    debug!(email = %info.email, "google profile fetched");
    Ok(ExternalProfile {
        email: info.email,
        display_name: info.name,
    })
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

async fn fetch_github_profile(access_token: &str) -> anyhow::Result<ExternalProfile> {
    let http = reqwest::Client::builder()
        .user_agent("mydic")
        .build()
        .context("github http client")?;

    let user: GitHubUser = http
        .get("https://api.github.com/user")
        .bearer_auth(access_token)
        .send()
        .await
        .context("github user request")?
        .error_for_status()
        .context("github user status")?
        .json()
        .await
        .context("github user body")?;

    // The profile email can be hidden; fall back to the emails endpoint.
    let email = match user.email {
        Some(e) => e,
        None => {
            let emails: Vec<GitHubEmail> = http
                .get("https://api.github.com/user/emails")
                .bearer_auth(access_token)
                .send()
                .await
                .context("github emails request")?
                .error_for_status()
                .context("github emails status")?
                .json()
                .await
                .context("github emails body")?;
            emails
                .iter()
                .find(|e| e.primary && e.verified)
                .or_else(|| emails.first())
                .map(|e| e.email.clone())
                .context("github account has no email")?
        }
    };

    debug!(login = %user.login, "github profile fetched");
    Ok(ExternalProfile {
        email,
        display_name: user.name.or(Some(user.login)),
    })
}

/// Looks the profile up by email; a hit refreshes the stored display name,
/// a miss creates a new general user. Either way a session token for the
/// resulting row id comes back. There is no guard against two concurrent
/// first logins for the same address creating duplicate rows.
pub async fn resolve_or_create_identity(
    db: &PgPool,
    keys: &JwtKeys,
    profile: &ExternalProfile,
) -> anyhow::Result<String> {
    let name = profile.display_name.as_deref().unwrap_or(&profile.email);

    let user = match User::find_by_email(db, &profile.email).await? {
        Some(existing) => User::update_name(db, existing.id, name).await?,
        None => {
            let created = User::create(db, name, &profile.email).await?;
            info!(user_id = %created.id, "new federated user");
            created
        }
    };

    keys.sign_session(&user.name, user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn authorize_url_carries_provider_endpoint_and_scopes() {
        let state = AppState::fake();
        let client = build_client(Provider::Google, &state.config.google).expect("client");
        let url = authorize_url(&client, Provider::Google);
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(url.contains("scope=email+profile"));
        assert!(url.contains("client_id=google-client"));

        let client = build_client(Provider::GitHub, &state.config.github).expect("client");
        let url = authorize_url(&client, Provider::GitHub);
        assert!(url.starts_with("https://github.com/login/oauth/authorize"));
        assert!(url.contains("client_id=github-client"));
    }
}
