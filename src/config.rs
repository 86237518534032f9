use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub private_key_path: String,
    pub public_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender: String,
    /// Where contact-form messages are forwarded.
    pub contact_recipient: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public origin of this server, used to build image URLs.
    pub server_origin: String,
    /// Origin of the SPA client, used for mail links and OAuth redirects.
    pub client_origin: String,
    pub jwt: JwtConfig,
    pub shots_dir: String,
    pub screenshot_endpoint: String,
    pub mail: MailConfig,
    pub google: OAuthProviderConfig,
    pub github: OAuthProviderConfig,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let server_origin =
            std::env::var("SERVER_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".into());
        let client_origin =
            std::env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "http://localhost:9000".into());
        let jwt = JwtConfig {
            private_key_path: std::env::var("JWT_PRIVATE_KEY_PATH")?,
            public_key_path: std::env::var("JWT_PUBLIC_KEY_PATH")?,
        };
        let shots_dir = std::env::var("SHOTS_DIR").unwrap_or_else(|_| "./public/shots".into());
        let screenshot_endpoint = std::env::var("SCREENSHOT_ENDPOINT")?;
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL")?,
            api_key: std::env::var("MAIL_API_KEY")?,
            sender: std::env::var("MAIL_SENDER")?,
            contact_recipient: std::env::var("CONTACT_RECIPIENT")
                .or_else(|_| std::env::var("MAIL_SENDER"))?,
        };
        let google = OAuthProviderConfig {
            client_id: std::env::var("GOOGLE_AUTH_CLIENT_ID")?,
            client_secret: std::env::var("GOOGLE_AUTH_CLIENT_SECRET")?,
            callback_url: std::env::var("GOOGLE_AUTH_CALLBACK_URL")?,
        };
        let github = OAuthProviderConfig {
            client_id: std::env::var("GITHUB_CLIENT_ID")?,
            client_secret: std::env::var("GITHUB_CLIENT_SECRET")?,
            callback_url: std::env::var("GITHUB_AUTH_CALLBACK_URL")?,
        };
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec![client_origin.clone()]);

        Ok(Self {
            database_url,
            server_origin,
            client_origin,
            jwt,
            shots_dir,
            screenshot_endpoint,
            mail,
            google,
            github,
            allowed_origins,
        })
    }
}
