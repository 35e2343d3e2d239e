use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::RealtimeError,
    types::Result,
    utils::{is_http_url, join_url},
};

pub const LOGIN_ROUTE: &str = "/login";
const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// JSON client for the REST backend.
///
/// A `401` answer triggers one token refresh and one retry of the original
/// request. If that still fails the caller gets
/// [`RealtimeError::SessionExpired`] and should send the user to
/// [`LOGIN_ROUTE`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<RwLock<TokenPair>>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: TokenPair) -> Result<Self> {
        if !is_http_url(base_url) {
            return Err(RealtimeError::InvalidUrl {
                url: String::from(base_url),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: String::from(base_url),
            tokens: Arc::new(RwLock::new(tokens)),
        })
    }

    pub fn tokens(&self) -> TokenPair {
        self.tokens.read().clone()
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Like [`ApiClient::get_json`], but gives up with
    /// [`RealtimeError::Aborted`] as soon as `cancel` fires.
    pub async fn get_json_cancellable<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T> {
        tokio::select! {
            result = self.get_json(path, query) => result,
            _ = cancel.cancelled() => {
                debug!(%path, "request aborted by owner");
                Err(RealtimeError::Aborted)
            }
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T> {
        let url = join_url(&self.base_url, path);
        let url = url.as_str();
        let body = body.as_ref();
        let call = move || self.attempt(method.clone(), url, query, body);
        retry_after_refresh(call, || self.refresh()).await
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let access_token = self.tokens.read().access_token.clone();
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(access_token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }
        Ok(response.json().await?)
    }

    async fn refresh(&self) -> Result<()> {
        let refresh_token = self.tokens.read().refresh_token.clone();
        let response = self
            .http
            .post(join_url(&self.base_url, REFRESH_PATH))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let refreshed: RefreshResponse = response.json().await?;
        let mut tokens = self.tokens.write();
        tokens.access_token = refreshed.access_token;
        if let Some(refresh_token) = refreshed.refresh_token {
            tokens.refresh_token = refresh_token;
        }
        debug!("access token refreshed");
        Ok(())
    }
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> RealtimeError {
    let message = if body.trim().is_empty() {
        String::from(status.canonical_reason().unwrap_or("request failed"))
    } else {
        String::from(body.trim())
    };
    RealtimeError::RequestFailed {
        status: status.as_u16(),
        message,
    }
}

fn is_unauthorized(result: &Result<impl Sized>) -> bool {
    matches!(
        result,
        Err(RealtimeError::RequestFailed { status, .. }) if *status == StatusCode::UNAUTHORIZED.as_u16()
    )
}

/// Runs `call`; on a 401 runs `refresh` once and retries `call` once.
pub(crate) async fn retry_after_refresh<T, Call, CallFut, Refresh, RefreshFut>(
    mut call: Call,
    refresh: Refresh,
) -> Result<T>
where
    Call: FnMut() -> CallFut,
    CallFut: Future<Output = Result<T>>,
    Refresh: FnOnce() -> RefreshFut,
    RefreshFut: Future<Output = Result<()>>,
{
    let first = call().await;
    if !is_unauthorized(&first) {
        return first;
    }

    if let Err(error) = refresh().await {
        warn!(%error, "token refresh failed");
        return Err(RealtimeError::SessionExpired);
    }

    let retried = call().await;
    if is_unauthorized(&retried) {
        return Err(RealtimeError::SessionExpired);
    }
    retried
}
