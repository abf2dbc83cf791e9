//! REST client for the SciTrek backend.
//!
//! # Responsibility
//! - Map persistence and auth contracts onto backend endpoints.
//! - Attach bearer tokens and perform the one-shot refresh on 401.
//!
//! # Invariants
//! - A request is retried at most once after a token refresh.
//! - A failed refresh clears stored credentials.
//! - Request and response bodies are never logged.

use crate::auth::credentials::{CredentialProvider, TokenPair};
use crate::client::{AuthClient, ClientError, ClientResult, PersistenceClient, Profile};
use crate::config::ClientConfig;
use crate::logging::one_line;
use crate::model::answers::unwrap_answers_payload;
use crate::model::modules::ModuleId;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

const TOKEN_PATH: &str = "/api/token/";
const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";
const PROFILE_PATH: &str = "/api/student/profile/";
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Response detail path for one module.
pub fn response_detail_path(module: ModuleId) -> String {
    format!("/api/student/modules/{}/response/detail/", module.day())
}

/// Upsert path for one module.
pub fn response_upsert_path(module: ModuleId) -> String {
    format!("/api/student/modules/{}/response/", module.day())
}

/// reqwest-backed implementation of the backend contracts.
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpApiClient {
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends an authenticated request, refreshing the access token once on 401.
    async fn send_authorized(
        &self,
        method: &'static str,
        path: &str,
        build: impl Fn(&reqwest::Client, String) -> RequestBuilder,
    ) -> ClientResult<Response> {
        let url = self.url(path);
        let started_at = Instant::now();
        let response = self.with_token(build(&self.http, url.clone())).send().await;
        let response = log_response(method, path, started_at, response)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if !self.refresh_access_token().await? {
            return Err(ClientError::Unauthorized);
        }

        let started_at = Instant::now();
        let retried = self.with_token(build(&self.http, url)).send().await;
        log_response(method, path, started_at, retried)
    }

    fn with_token(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Returns `Ok(false)` when the session cannot be refreshed; credentials
    /// are cleared in that case.
    async fn refresh_access_token(&self) -> ClientResult<bool> {
        let Some(refresh) = self.credentials.refresh_token() else {
            warn!("event=token_refresh module=client status=error error_code=no_refresh_token");
            self.credentials.clear()?;
            return Ok(false);
        };

        let started_at = Instant::now();
        let response = self
            .http
            .post(self.url(TOKEN_REFRESH_PATH))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await;
        let response = log_response("POST", TOKEN_REFRESH_PATH, started_at, response)?;

        if !response.status().is_success() {
            warn!(
                "event=token_refresh module=client status=error error_code=refresh_rejected http_status={}",
                response.status().as_u16()
            );
            self.credentials.clear()?;
            return Ok(false);
        }

        let body = response.json::<RefreshResponse>().await?;
        self.credentials.set_access_token(body.access)?;
        info!("event=token_refresh module=client status=ok");
        Ok(true)
    }
}

#[async_trait]
impl PersistenceClient for HttpApiClient {
    async fn read(&self, module: ModuleId) -> ClientResult<Option<Value>> {
        let path = response_detail_path(module);
        let response = self
            .send_authorized("GET", &path, |http, url| http.get(url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = expect_success(response).await?.json::<Value>().await?;
        Ok(unwrap_answers_payload(body))
    }

    async fn write(&self, module: ModuleId, answers: &Value) -> ClientResult<()> {
        let path = response_upsert_path(module);
        let body = json!({ "answers": answers });
        let response = self
            .send_authorized("POST", &path, |http, url| http.post(url).json(&body))
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthClient for HttpApiClient {
    async fn login(&self, username: &str, password: &str) -> ClientResult<TokenPair> {
        let started_at = Instant::now();
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await;
        let response = log_response("POST", TOKEN_PATH, started_at, response)?;
        let tokens = expect_success(response).await?.json::<TokenPair>().await?;
        self.credentials.set_tokens(tokens.clone())?;
        info!("event=login module=client status=ok");
        Ok(tokens)
    }

    async fn current_user(&self) -> ClientResult<Profile> {
        let response = self
            .send_authorized("GET", PROFILE_PATH, |http, url| http.get(url))
            .await?;
        Ok(expect_success(response).await?.json::<Profile>().await?)
    }
}

fn log_response(
    method: &str,
    path: &str,
    started_at: Instant,
    result: Result<Response, reqwest::Error>,
) -> ClientResult<Response> {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(response) => {
            info!(
                "event=api_request module=client status=ok method={method} path={path} http_status={} duration_ms={duration_ms}",
                response.status().as_u16()
            );
            Ok(response)
        }
        Err(err) => {
            warn!(
                "event=api_request module=client status=error method={method} path={path} duration_ms={duration_ms} error_code=transport_failed error={err}"
            );
            Err(err.into())
        }
    }
}

async fn expect_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body: one_line(&body, MAX_ERROR_BODY_CHARS),
    })
}
