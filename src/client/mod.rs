//! Functional oracle: proves a declared leader actually serves requests.
//!
//! Every call goes through the bounded exponential backoff in
//! [`crate::async_task`], so a leader that is still settling after an
//! election gets a few attempts before the run fails.


use parking_lot::RwLock;
use reqwest::header::COOKIE;
use reqwest::header::SET_COOKIE;
use reqwest::Response;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::async_task::task_with_timeout_and_exponential_backoff;
use crate::net::join_url;
use crate::BackoffPolicy;
use crate::HttpConfig;
use crate::OracleMismatch;
use crate::Result;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct ValueBody<'a> {
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct StoredValue {
    #[serde(default)]
    value: serde_json::Value,
}

impl StoredValue {
    fn into_string(self) -> Option<String> {
        match self.value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

pub struct StorageClient {
    http: reqwest::Client,
    config: HttpConfig,
    retry: BackoffPolicy,
    /// `Cookie` header value captured by [`Self::authenticate`]
    session: RwLock<Option<String>>,
}

impl StorageClient {
    pub fn new(
        config: &HttpConfig,
        retry: BackoffPolicy,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(config.request_timeout())
            .no_proxy()
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
            retry,
            session: RwLock::new(None),
        })
    }

    pub fn has_session(&self) -> bool {
        self.session.read().is_some()
    }

    /// `GET <ui_path>` must answer with a success status.
    pub async fn check_liveness(
        &self,
        base: &str,
    ) -> Result<()> {
        let url = join_url(base, &self.config.ui_path);
        task_with_timeout_and_exponential_backoff("liveness", || self.try_liveness(&url), self.retry).await?;
        debug!("{} is live", base);
        Ok(())
    }

    /// Log in and keep the returned session cookies for later storage calls.
    ///
    /// # Errors
    /// `OracleMismatch::MissingSession` when the response sets no cookie.
    pub async fn authenticate(
        &self,
        base: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let url = join_url(base, &self.config.auth_path);
        let credentials = Credentials { username, password };
        let cookie = task_with_timeout_and_exponential_backoff(
            "authenticate",
            || self.try_authenticate(&url, &credentials),
            self.retry,
        )
        .await?;

        *self.session.write() = Some(cookie);
        info!("authenticated against {} as {:?}", base, username);
        Ok(())
    }

    pub async fn put_value(
        &self,
        base: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let url = self.value_url(base, key);
        task_with_timeout_and_exponential_backoff("put_value", || self.try_put(&url, value), self.retry).await
    }

    /// Current value of `key`; `None` when the server has no value for it.
    pub async fn get_value(
        &self,
        base: &str,
        key: &str,
    ) -> Result<Option<String>> {
        let url = self.value_url(base, key);
        task_with_timeout_and_exponential_backoff("get_value", || self.try_get(&url), self.retry).await
    }

    /// Write `value` under `key`, then read it back through the same base.
    pub async fn round_trip(
        &self,
        base: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.put_value(base, key, value).await?;
        self.verify_persisted(base, key, value).await
    }

    /// Read `key` and require it to equal `expected`.
    ///
    /// # Errors
    /// `OracleMismatch::WrongValue` carrying what was actually read.
    pub async fn verify_persisted(
        &self,
        base: &str,
        key: &str,
        expected: &str,
    ) -> Result<()> {
        let actual = self.get_value(base, key).await?;
        if actual.as_deref() != Some(expected) {
            return Err(OracleMismatch::WrongValue {
                key: key.to_string(),
                expected: expected.to_string(),
                actual,
            }
            .into());
        }
        debug!("{} serves {}={}", base, key, expected);
        Ok(())
    }

    async fn try_liveness(
        &self,
        url: &str,
    ) -> Result<()> {
        let response = self.http.get(url).send().await?;
        expect_success(format!("GET {url}"), response).await?;
        Ok(())
    }

    async fn try_authenticate(
        &self,
        url: &str,
        credentials: &Credentials<'_>,
    ) -> Result<String> {
        let response = self.http.post(url).json(credentials).send().await?;
        let response = expect_success(format!("POST {url}"), response).await?;
        Ok(session_cookie(&response).ok_or(OracleMismatch::MissingSession)?)
    }

    async fn try_put(
        &self,
        url: &str,
        value: &str,
    ) -> Result<()> {
        let response = self.with_session(self.http.put(url)).json(&ValueBody { value }).send().await?;
        expect_success(format!("PUT {url}"), response).await?;
        Ok(())
    }

    async fn try_get(
        &self,
        url: &str,
    ) -> Result<Option<String>> {
        let response = self.with_session(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(format!("GET {url}"), response).await?;
        let stored: StoredValue = response.json().await?;
        Ok(stored.into_string())
    }

    fn value_url(
        &self,
        base: &str,
        key: &str,
    ) -> String {
        join_url(&join_url(base, &self.config.storage_path), key)
    }

    fn with_session(
        &self,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match self.session.read().as_deref() {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }
}

async fn expect_success(
    request: String,
    response: Response,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OracleMismatch::UnexpectedStatus {
        request,
        status: status.as_u16(),
        body,
    }
    .into())
}

/// `name=value` pairs of every `Set-Cookie` header, joined for a `Cookie` header.
fn session_cookie(response: &Response) -> Option<String> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
