use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, OptionExt, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub const YOUTUBE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/youtube",
];

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Client secrets for an "installed application", as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretsFile {
    pub installed: ClientSecrets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err(format!("Failed to read client secrets: {}", path.display()))?;
        let file: ClientSecretsFile = serde_json::from_str(&contents)
            .wrap_err(format!("Failed to parse client secrets: {}", path.display()))?;
        Ok(file.installed)
    }
}

/// Token response from Google's token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// What gets persisted to the token file between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: i64,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
}

impl StoredToken {
    fn from_response(response: GoogleTokenResponse, secrets: &ClientSecrets, now: i64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now + response.expires_in,
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            token_uri: secrets.token_uri.clone(),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.expires_at
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .wrap_err(format!("Failed to read token file: {}", path.display()))?;
        let token = serde_json::from_str(&contents)
            .wrap_err(format!("Failed to parse token file: {}", path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .wrap_err(format!("Failed to write token file: {}", path.display()))
    }
}

/// Generate a random state parameter for CSRF protection
fn generate_state() -> String {
    let mut rng = rand::rng();
    (0..24)
        .map(|_| {
            const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
            CHARSET[rng.random_range(0..CHARSET.len())] as char
        })
        .collect()
}

/// Build the consent page URL the user has to visit
pub fn authorization_url(secrets: &ClientSecrets, redirect_uri: &str, state: &str) -> Result<Url> {
    let scope = YOUTUBE_SCOPES.join(" ");
    let url = Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )?;
    Ok(url)
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeCodeError {
    #[error("Invalid code: {reason}")]
    InvalidCode { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response")]
    FailedToParseResponse(reqwest::Error),
}

/// Exchange an authorization code for tokens
/// https://developers.google.com/identity/protocols/oauth2/native-app#exchange-authorization-code
pub async fn exchange_code_for_token(
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<StoredToken, ExchangeCodeError> {
    let client = reqwest::Client::new();

    let mut params = HashMap::new();
    params.insert("grant_type", "authorization_code");
    params.insert("code", code);
    params.insert("redirect_uri", redirect_uri);
    params.insert("client_id", secrets.client_id.as_str());
    params.insert("client_secret", secrets.client_secret.as_str());

    let response = client
        .post(&secrets.token_uri)
        .form(&params)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(ExchangeCodeError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ExchangeCodeError::InvalidCode {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    let token_response: GoogleTokenResponse = response
        .json()
        .await
        .map_err(ExchangeCodeError::FailedToParseResponse)?;

    Ok(StoredToken::from_response(
        token_response,
        secrets,
        chrono::Utc::now().timestamp(),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("Stored token has no refresh token")]
    MissingRefreshToken,
    #[error("Invalid refresh token: {reason}")]
    InvalidRefreshToken { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Refresh an access token. Google does not always return a new refresh token,
/// in which case the old one is kept.
pub async fn refresh_access_token(token: &StoredToken) -> Result<StoredToken, RefreshTokenError> {
    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or(RefreshTokenError::MissingRefreshToken)?;

    let client = reqwest::Client::new();

    let mut params = HashMap::new();
    params.insert("grant_type", "refresh_token");
    params.insert("refresh_token", refresh_token);
    params.insert("client_id", token.client_id.as_str());
    params.insert("client_secret", token.client_secret.as_str());

    let response = client
        .post(&token.token_uri)
        .form(&params)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(RefreshTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(RefreshTokenError::InvalidRefreshToken {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    let response: GoogleTokenResponse = response
        .json()
        .await
        .map_err(RefreshTokenError::FailedToParseResponse)?;

    Ok(StoredToken {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or_else(|| token.refresh_token.clone()),
        expires_at: chrono::Utc::now().timestamp() + response.expires_in,
        ..token.clone()
    })
}

/// Pull `code` out of the redirect request line, e.g. `GET /?state=..&code=.. HTTP/1.1`
fn parse_redirect_request(request_line: &str, expected_state: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_eyre("Malformed redirect request")?;
    let url = Url::parse("http://127.0.0.1")?.join(target)?;
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        bail!("Authorization was denied: {}", error);
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        bail!("Authorization response state did not match");
    }
    params
        .get("code")
        .cloned()
        .ok_or_eyre("Authorization response had no code")
}

/// Accept one redirect on the loopback listener and return the authorization code
async fn receive_code(listener: TcpListener, expected_state: &str) -> Result<String> {
    let (mut stream, _) = listener
        .accept()
        .await
        .wrap_err("Failed to accept OAuth redirect")?;

    let mut request_line = String::new();
    let (reader, mut writer) = stream.split();
    BufReader::new(reader)
        .read_line(&mut request_line)
        .await
        .wrap_err("Failed to read OAuth redirect")?;

    let result = parse_redirect_request(&request_line, expected_state);
    let page = match result {
        Ok(_) => "Authentication complete. You can close this window.",
        Err(_) => "Authentication failed. Check the terminal for details.",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        page.len(),
        page
    );
    writer.write_all(response.as_bytes()).await?;
    writer.shutdown().await.ok();

    result
}

/// Run the installed-app loopback flow and return a fresh token.
///
/// `open_url` is handed the consent page URL; it should show it to the user.
pub async fn run_installed_app_flow(
    secrets: &ClientSecrets,
    open_url: impl FnOnce(&Url),
) -> Result<StoredToken> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .wrap_err("Failed to bind loopback listener")?;
    let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
    let state = generate_state();

    let url = authorization_url(secrets, &redirect_uri, &state)?;
    tracing::info!("Waiting for Google sign-in at {}", url);
    open_url(&url);

    let code = receive_code(listener, &state).await?;
    let token = exchange_code_for_token(secrets, &code, &redirect_uri).await?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "test_client_id".into(),
            client_secret: "shh".into(),
            auth_uri: GOOGLE_AUTH_URL.into(),
            token_uri: GOOGLE_TOKEN_URL.into(),
        }
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state();
        assert_eq!(state.len(), 24);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_authorization_url() {
        let url = authorization_url(&secrets(), "http://127.0.0.1:8080/", "abc").unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with(GOOGLE_AUTH_URL));
        assert_eq!(params["client_id"], "test_client_id");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["state"], "abc");
        assert!(params["scope"].contains("auth/youtube.readonly"));
    }

    #[test]
    fn test_parse_redirect_request() {
        let code =
            parse_redirect_request("GET /?state=abc&code=4%2Fxyz&scope=s HTTP/1.1", "abc").unwrap();
        assert_eq!(code, "4/xyz");
    }

    #[test]
    fn test_parse_redirect_request_rejects_wrong_state() {
        assert!(parse_redirect_request("GET /?state=evil&code=c HTTP/1.1", "abc").is_err());
        assert!(parse_redirect_request("GET /?error=access_denied HTTP/1.1", "abc").is_err());
        assert!(parse_redirect_request("garbage", "abc").is_err());
    }

    #[test]
    fn test_token_expiry_has_margin() {
        let token = StoredToken {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            expires_at: 1_000,
            client_id: "id".into(),
            client_secret: "secret".into(),
            token_uri: GOOGLE_TOKEN_URL.into(),
        };

        assert!(!token.is_expired(900));
        assert!(token.is_expired(940));
        assert!(token.is_expired(2_000));
    }

    #[test]
    fn test_token_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        assert!(StoredToken::load(&path).unwrap().is_none());

        let token = StoredToken::from_response(
            GoogleTokenResponse {
                access_token: "at".into(),
                expires_in: 3600,
                refresh_token: None,
            },
            &secrets(),
            100,
        );
        token.save(&path).unwrap();

        let loaded = StoredToken::load(&path).unwrap().unwrap();
        assert_eq!(loaded, token);
        assert_eq!(loaded.expires_at, 3700);
    }

    #[test]
    fn test_client_secrets_file_format() {
        let file: ClientSecretsFile = serde_json::from_str(
            r#"{"installed": {"client_id": "cid", "client_secret": "cs", "redirect_uris": ["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(file.installed.client_id, "cid");
        assert_eq!(file.installed.token_uri, GOOGLE_TOKEN_URL);
    }
}
