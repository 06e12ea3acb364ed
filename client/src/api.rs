//! HTTP collaborators: authentication, profile, shop, and the global
//! leaderboard, plus the persisted bearer token.
//!
//! Every call runs on the background runtime and reports back through the
//! event channel, so only the view that started an operation waits for it.
//! Painting and input handling never do. Failures abort the operation with a
//! user-visible message; there are no retries.

use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rejected with status {status}")]
    Rejected {
        status: StatusCode,
        detail: Option<String>,
    },
}

impl ApiError {
    /// Inline message for the user: the collaborator's error detail verbatim
    /// when available, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http(_) => "Connection error. Please try again.".to_string(),
            ApiError::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ApiError::Rejected { .. } => "Request failed. Please try again.".to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default)]
    pub total_coins: u32,
    #[serde(default)]
    pub owned_skins: Vec<String>,
    #[serde(default = "default_current_skin")]
    pub current_skin: String,
}

fn default_current_skin() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalScore {
    pub username: String,
    #[serde(default)]
    pub total_score: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Completed collaborator calls, drained by the frame loop.
#[derive(Debug)]
pub enum ApiEvent {
    Login(Result<(String, UserProfile), ApiError>),
    Register(Result<(), ApiError>),
    Profile {
        /// True for the silent token restore at startup, which routes to the
        /// auth view on failure instead of surfacing an inline error.
        restore: bool,
        result: Result<UserProfile, ApiError>,
    },
    BuySkin(Result<(), ApiError>),
    SelectSkin(Result<(), ApiError>),
    Leaderboard(Result<Vec<GlobalScore>, ApiError>),
}

pub struct ApiClient {
    handle: Handle,
    http: reqwest::Client,
    base_url: String,
    events_tx: UnboundedSender<ApiEvent>,
}

impl ApiClient {
    pub fn new(handle: Handle, base_url: String) -> (Self, UnboundedReceiver<ApiEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = ApiClient {
            handle,
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            events_tx,
        };
        (client, events_rx)
    }

    fn spawn<F>(&self, call: F)
    where
        F: std::future::Future<Output = ApiEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.handle.spawn(async move {
            if tx.send(call.await).is_err() {
                debug!("Dropping API result, frame loop is gone");
            }
        });
    }

    pub fn login(&self, username: String, password: String) {
        let http = self.http.clone();
        let base = self.base_url.clone();
        self.spawn(async move {
            ApiEvent::Login(login_request(&http, &base, &username, &password).await)
        });
    }

    pub fn register(&self, username: String, password: String) {
        let http = self.http.clone();
        let base = self.base_url.clone();
        self.spawn(async move {
            ApiEvent::Register(register_request(&http, &base, &username, &password).await)
        });
    }

    pub fn fetch_profile(&self, token: String, restore: bool) {
        let http = self.http.clone();
        let base = self.base_url.clone();
        self.spawn(async move {
            ApiEvent::Profile {
                restore,
                result: profile_request(&http, &base, &token).await,
            }
        });
    }

    pub fn buy_skin(&self, token: String, skin_id: String, price: u32) {
        let http = self.http.clone();
        let base = self.base_url.clone();
        self.spawn(async move {
            ApiEvent::BuySkin(buy_skin_request(&http, &base, &token, &skin_id, price).await)
        });
    }

    pub fn select_skin(&self, token: String, skin_id: String) {
        let http = self.http.clone();
        let base = self.base_url.clone();
        self.spawn(async move {
            ApiEvent::SelectSkin(select_skin_request(&http, &base, &token, &skin_id).await)
        });
    }

    pub fn fetch_leaderboard(&self, limit: u32) {
        let http = self.http.clone();
        let base = self.base_url.clone();
        self.spawn(async move {
            ApiEvent::Leaderboard(leaderboard_request(&http, &base, limit).await)
        });
    }
}

/// Converts a non-success response into `ApiError::Rejected`, pulling the
/// collaborator's `detail` field out of the body when present.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail);
    Err(ApiError::Rejected { status, detail })
}

async fn login_request(
    http: &reqwest::Client,
    base: &str,
    username: &str,
    password: &str,
) -> Result<(String, UserProfile), ApiError> {
    let response = http
        .post(format!("{}/login", base))
        .form(&[("username", username), ("password", password)])
        .send()
        .await?;
    let body: LoginResponse = check(response).await?.json().await?;
    Ok((body.access_token, body.user))
}

async fn register_request(
    http: &reqwest::Client,
    base: &str,
    username: &str,
    password: &str,
) -> Result<(), ApiError> {
    let response = http
        .post(format!("{}/register", base))
        .form(&[("username", username), ("password", password)])
        .send()
        .await?;
    check(response).await?;
    Ok(())
}

async fn profile_request(
    http: &reqwest::Client,
    base: &str,
    token: &str,
) -> Result<UserProfile, ApiError> {
    let response = http
        .get(format!("{}/users/me", base))
        .bearer_auth(token)
        .send()
        .await?;
    Ok(check(response).await?.json().await?)
}

async fn buy_skin_request(
    http: &reqwest::Client,
    base: &str,
    token: &str,
    skin_id: &str,
    price: u32,
) -> Result<(), ApiError> {
    let price = price.to_string();
    let response = http
        .post(format!("{}/buy_skin", base))
        .bearer_auth(token)
        .form(&[("skin_id", skin_id), ("price", price.as_str())])
        .send()
        .await?;
    check(response).await?;
    Ok(())
}

async fn select_skin_request(
    http: &reqwest::Client,
    base: &str,
    token: &str,
    skin_id: &str,
) -> Result<(), ApiError> {
    let response = http
        .post(format!("{}/select_skin", base))
        .bearer_auth(token)
        .form(&[("skin_id", skin_id)])
        .send()
        .await?;
    check(response).await?;
    Ok(())
}

async fn leaderboard_request(
    http: &reqwest::Client,
    base: &str,
    limit: u32,
) -> Result<Vec<GlobalScore>, ApiError> {
    let response = http
        .get(format!("{}/leaderboard", base))
        .query(&[("limit", limit)])
        .send()
        .await?;
    Ok(check(response).await?.json().await?)
}

/// Reads the persisted bearer token, if any.
pub fn load_token(path: &Path) -> Option<String> {
    let token = fs::read_to_string(path).ok()?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub fn store_token(path: &Path, token: &str) {
    if let Err(e) = fs::write(path, token) {
        warn!("Failed to persist session token: {}", e);
    }
}

pub fn clear_token(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove session token: {}", e);
        }
    }
}
