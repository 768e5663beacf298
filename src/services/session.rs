use chrono::Utc;
use color_eyre::eyre::{Context, Result};

use crate::config::Config;
use crate::ports::browser::Browser;
use crate::ports::youtube::YoutubeApi;
use crate::services::youtube::client::YoutubeHttpAdapter;
use crate::youtube_rs::auth::{
    ClientSecrets, StoredToken, refresh_access_token, run_installed_app_flow,
};
use crate::youtube_rs::{Credential, YoutubeApiError};

/// An API client together with what it is allowed to do.
#[derive(Debug)]
pub enum Session<C> {
    /// API key, or OAuth without playlist access. Search and statistics only.
    ReadOnly(C),
    /// OAuth with playlist access
    ReadWrite(C),
}

impl<C> Session<C> {
    pub fn api(&self) -> &C {
        match self {
            Session::ReadOnly(api) | Session::ReadWrite(api) => api,
        }
    }

    pub fn can_create_playlists(&self) -> bool {
        matches!(self, Session::ReadWrite(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(
        "No YouTube API key available. Pass --api-key, set YOUTUBE_API_KEY or add auth.api_key to the config"
    )]
    MissingApiKey,
}

/// Checks whether an OAuth client can manage playlists.
pub async fn probe_access<C: YoutubeApi>(api: C) -> Session<C> {
    match api.check_playlist_access().await {
        Ok(()) => {
            tracing::info!("OAuth authentication successful, playlists can be created");
            Session::ReadWrite(api)
        }
        Err(error) => {
            let signup_required = error
                .downcast_ref::<YoutubeApiError>()
                .and_then(YoutubeApiError::reason)
                == Some("youtubeSignupRequired");
            if signup_required {
                tracing::warn!(
                    "This Google account has no YouTube channel yet. Create one at https://www.youtube.com/create_channel to enable playlist creation"
                );
            } else {
                tracing::warn!(error = %error, "Playlist access check failed");
            }
            tracing::warn!("Continuing read-only, a manual playlist guide will be written");
            Session::ReadOnly(api)
        }
    }
}

/// Runs the browser sign-in and stores the resulting token.
pub async fn login(config: &Config, browser: Option<&dyn Browser>) -> Result<StoredToken> {
    let secrets_path = config.auth.client_secrets_path();
    let secrets = ClientSecrets::from_file(&secrets_path)?;

    let token = run_installed_app_flow(&secrets, |url| {
        println!("Sign in with Google to allow playlist creation:\n{}", url);
        if let Some(browser) = browser
            && let Err(error) = browser.open(url.as_str())
        {
            tracing::warn!(error = %error, "Failed to open browser");
        }
    })
    .await?;

    let token_path = config.auth.token_path();
    token
        .save(&token_path)
        .wrap_err("Failed to store OAuth token")?;
    tracing::info!("Stored OAuth token at {}", token_path.display());
    Ok(token)
}

/// Returns a usable OAuth token, or `None` when OAuth is not set up at all.
async fn oauth_token(
    config: &Config,
    browser: Option<&dyn Browser>,
) -> Result<Option<StoredToken>> {
    let token_path = config.auth.token_path();
    let now = Utc::now().timestamp();

    if let Some(token) = StoredToken::load(&token_path)? {
        if !token.is_expired(now) {
            return Ok(Some(token));
        }
        if token.refresh_token.is_some() {
            tracing::info!("Refreshing expired OAuth token");
            let refreshed = refresh_access_token(&token).await?;
            refreshed.save(&token_path)?;
            return Ok(Some(refreshed));
        }
    }

    if !config.auth.client_secrets_path().exists() {
        return Ok(None);
    }
    login(config, browser).await.map(Some)
}

/// Picks the strongest available way of talking to the API.
///
/// OAuth is tried first unless `read_only` is set. Any OAuth failure falls back
/// to the API key, and only a missing API key is fatal.
pub async fn establish(
    config: &Config,
    api_key: Option<String>,
    read_only: bool,
    browser: Option<&dyn Browser>,
) -> Result<Session<YoutubeHttpAdapter>> {
    if !read_only {
        match oauth_token(config, browser).await {
            Ok(Some(token)) => {
                let adapter = YoutubeHttpAdapter::new(
                    config.api.base_url.clone(),
                    Credential::Bearer(token.access_token),
                );
                return Ok(probe_access(adapter).await);
            }
            Ok(None) => tracing::info!("No OAuth credentials found, using API key"),
            Err(error) => {
                tracing::warn!(error = %error, "OAuth authentication failed, falling back to API key")
            }
        }
    }

    let api_key = api_key
        .or_else(|| config.auth.api_key.clone())
        .filter(|key| !key.trim().is_empty())
        .ok_or(SessionError::MissingApiKey)?;

    tracing::info!("Using API key authentication (read-only)");
    Ok(Session::ReadOnly(YoutubeHttpAdapter::new(
        config.api.base_url.clone(),
        Credential::ApiKey(api_key),
    )))
}
