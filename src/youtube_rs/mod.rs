use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

pub mod auth;
pub mod types;

use types::{
    Channel, ErrorEnvelope, ListResponse, Playlist, PlaylistInsert, PlaylistItem,
    PlaylistItemInsert, SearchParams, SearchResult, Video,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How requests are authorized.
///
/// Docs:
/// https://developers.google.com/youtube/v3/guides/authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Public data only
    ApiKey(String),
    /// OAuth access token, may act on the user's behalf
    Bearer(String),
}

impl Credential {
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Credential::ApiKey(key) => builder.query(&[("key", key)]),
            Credential::Bearer(token) => builder.bearer_auth(token),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum YoutubeApiError {
    #[error("Invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("YouTube API returned {status}: {message} ({reason})")]
    Api {
        status: StatusCode,
        reason: String,
        message: String,
    },
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

impl YoutubeApiError {
    /// The machine readable reason Google attaches to API errors, e.g. `quotaExceeded`.
    pub fn reason(&self) -> Option<&str> {
        match self {
            YoutubeApiError::Api { reason, .. } => Some(reason),
            _ => None,
        }
    }

    fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => YoutubeApiError::Api {
                status,
                reason: envelope
                    .error
                    .errors
                    .into_iter()
                    .map(|detail| detail.reason)
                    .find(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "unknown".to_string()),
                message: envelope.error.message,
            },
            Err(_) => YoutubeApiError::Api {
                status,
                reason: "unknown".to_string(),
                message: body.trim().to_string(),
            },
        }
    }
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, YoutubeApiError> {
    let response = builder
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(YoutubeApiError::FailedToSendRequest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or("Failed to get error text".to_string());
        return Err(YoutubeApiError::from_body(status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(YoutubeApiError::FailedToParseResponse)
}

/// `search.list`
pub async fn search_videos(
    client: &Client,
    base_url: &Url,
    credential: &Credential,
    params: &SearchParams<'_>,
) -> Result<Vec<SearchResult>, YoutubeApiError> {
    let url = base_url.join("search")?;
    let request = credential.authorize(client.get(url).query(params));

    let response: ListResponse<SearchResult> = send_json(request).await?;
    Ok(response.items)
}

/// `videos.list` for up to 50 ids
pub async fn list_videos(
    client: &Client,
    base_url: &Url,
    credential: &Credential,
    ids: &[String],
) -> Result<Vec<Video>, YoutubeApiError> {
    let url = base_url.join("videos")?;
    let id = ids.join(",");
    let request = credential.authorize(client.get(url).query(&[
        ("part", "statistics,contentDetails,snippet"),
        ("id", id.as_str()),
    ]));

    let response: ListResponse<Video> = send_json(request).await?;
    Ok(response.items)
}

/// `channels.list` for up to 50 ids
pub async fn list_channels(
    client: &Client,
    base_url: &Url,
    credential: &Credential,
    ids: &[String],
) -> Result<Vec<Channel>, YoutubeApiError> {
    let url = base_url.join("channels")?;
    let id = ids.join(",");
    let request = credential.authorize(
        client
            .get(url)
            .query(&[("part", "statistics,snippet"), ("id", id.as_str())]),
    );

    let response: ListResponse<Channel> = send_json(request).await?;
    Ok(response.items)
}

/// `playlists.list` with `mine=true`. Requires an OAuth credential.
pub async fn list_my_playlists(
    client: &Client,
    base_url: &Url,
    credential: &Credential,
    max_results: u32,
) -> Result<Vec<Playlist>, YoutubeApiError> {
    let url = base_url.join("playlists")?;
    let request = credential.authorize(client.get(url).query(&[
        ("part", "id".to_string()),
        ("mine", "true".to_string()),
        ("maxResults", max_results.to_string()),
    ]));

    let response: ListResponse<Playlist> = send_json(request).await?;
    Ok(response.items)
}

/// `playlists.insert`
pub async fn insert_playlist(
    client: &Client,
    base_url: &Url,
    credential: &Credential,
    body: &PlaylistInsert,
) -> Result<Playlist, YoutubeApiError> {
    let url = base_url.join("playlists")?;
    let request = credential.authorize(
        client
            .post(url)
            .query(&[("part", "snippet,status")])
            .json(body),
    );

    send_json(request).await
}

/// `playlistItems.insert`
pub async fn insert_playlist_item(
    client: &Client,
    base_url: &Url,
    credential: &Credential,
    body: &PlaylistItemInsert,
) -> Result<PlaylistItem, YoutubeApiError> {
    let url = base_url.join("playlistItems")?;
    let request =
        credential.authorize(client.post(url).query(&[("part", "snippet")]).json(body));

    send_json(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_reason_is_extracted() {
        let body = r#"{
            "error": {
                "code": 401,
                "message": "Unauthorized",
                "errors": [{"reason": "youtubeSignupRequired", "message": "Unauthorized"}]
            }
        }"#;
        let error = YoutubeApiError::from_body(StatusCode::UNAUTHORIZED, body);

        assert_eq!(error.reason(), Some("youtubeSignupRequired"));
        assert!(error.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_unstructured_error_body_is_kept_as_message() {
        let error = YoutubeApiError::from_body(StatusCode::BAD_GATEWAY, "upstream down\n");

        match error {
            YoutubeApiError::Api {
                status,
                reason,
                message,
            } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(reason, "unknown");
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_endpoints_join_onto_base_url() {
        let base = Url::parse("https://www.googleapis.com/youtube/v3/").unwrap();
        assert_eq!(
            base.join("playlistItems").unwrap().as_str(),
            "https://www.googleapis.com/youtube/v3/playlistItems"
        );
    }
}
