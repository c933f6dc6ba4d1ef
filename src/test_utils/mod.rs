//! Shared fixtures for unit tests
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Deserialize;
use warp::http::StatusCode;
use warp::Filter;
use warp::Reply;

use crate::BackoffPolicy;
use crate::InstanceHandle;
use crate::InstanceProcess;
use crate::InstanceSnapshot;
use crate::InstanceState;
use crate::LaunchParams;

/// Process stand-in that counts kill signals
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    pub pid: u32,
    pub kills: Arc<AtomicUsize>,
}

impl FakeProcess {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            kills: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

impl InstanceProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn start_kill(&self) -> std::io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn try_exit_code(&self) -> std::io::Result<Option<i32>> {
        if self.kill_count() > 0 {
            Ok(Some(137))
        } else {
            Ok(None)
        }
    }
}

pub fn launch_params(index: u32) -> LaunchParams {
    LaunchParams {
        index,
        instance_dir: PathBuf::from(format!("/tmp/instances/instance{index}")),
    }
}

pub fn fake_handle(index: u32) -> (InstanceHandle, FakeProcess) {
    let process = FakeProcess::new(1000 + index);
    let handle = InstanceHandle::new(
        launch_params(index),
        format!("https://localhost:{}", 8540 + index),
        Box::new(process.clone()),
        Arc::new(InstanceState::new(index)),
    );
    (handle, process)
}

pub fn snapshot(
    index: u32,
    leader_of_term: Option<u64>,
) -> InstanceSnapshot {
    InstanceSnapshot {
        index,
        pid: Some(1000 + index),
        endpoint: format!("https://localhost:{}", 8540 + index),
        leader_of_term,
        ready: true,
        killed: false,
    }
}

/// Cookie the fake storage server hands out on login
pub const FAKE_SESSION: &str = "JSESSIONID=fake-session";

/// In-process stand-in for the HTTP surface of a server instance (or gateway).
#[derive(Debug, Clone, Default)]
pub struct FakeStorage {
    pub values: Arc<parking_lot::Mutex<HashMap<String, String>>>,
    /// Answer every request with 503 while set
    pub unavailable: Arc<AtomicBool>,
    /// Serve this value on every read regardless of what was written
    pub corrupt_reads: Arc<parking_lot::Mutex<Option<String>>>,
    /// Login succeeds without setting a cookie
    pub omit_cookie: Arc<AtomicBool>,
    pub requests: Arc<AtomicUsize>,
}

#[derive(Debug, Deserialize)]
struct FakeCredentials {
    username: String,
    #[allow(dead_code)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct FakeValue {
    value: String,
}

impl FakeStorage {
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Serve on an ephemeral localhost port; returns the `http://` base URL.
    pub async fn spawn(&self) -> String {
        let ui = {
            let storage = self.clone();
            warp::get()
                .and(warp::path("plugins"))
                .and(warp::path("bootstrap"))
                .and(warp::path("web"))
                .map(move || storage.guard().unwrap_or_else(|| warp::reply::html("ui").into_response()))
        };

        let auth = {
            let storage = self.clone();
            warp::post()
                .and(warp::path("auth"))
                .and(warp::path::end())
                .and(warp::body::json())
                .map(move |credentials: FakeCredentials| {
                    if let Some(refused) = storage.guard() {
                        return refused;
                    }
                    if credentials.username.is_empty() {
                        return StatusCode::UNAUTHORIZED.into_response();
                    }
                    if storage.omit_cookie.load(Ordering::SeqCst) {
                        return warp::reply().into_response();
                    }
                    warp::reply::with_header(warp::reply(), "set-cookie", format!("{FAKE_SESSION}; Path=/; HttpOnly"))
                        .into_response()
                })
        };

        let current = warp::path("plugins")
            .and(warp::path("sample"))
            .and(warp::path("services"))
            .and(warp::path("hello"))
            .and(warp::path("_current"))
            .and(warp::path::param::<String>())
            .and(warp::path::end())
            .and(warp::header::optional::<String>("cookie"));

        let put = {
            let storage = self.clone();
            warp::put().and(current.clone()).and(warp::body::json()).map(
                move |key: String, cookie: Option<String>, body: FakeValue| {
                    if let Some(refused) = storage.guard_session(cookie) {
                        return refused;
                    }
                    storage.values.lock().insert(key, body.value);
                    StatusCode::NO_CONTENT.into_response()
                },
            )
        };

        let get = {
            let storage = self.clone();
            warp::get().and(current).map(move |key: String, cookie: Option<String>| {
                if let Some(refused) = storage.guard_session(cookie) {
                    return refused;
                }
                let value = storage.corrupt_reads.lock().clone().or_else(|| storage.values.lock().get(&key).cloned());
                match value {
                    Some(value) => warp::reply::json(&serde_json::json!({ "value": value })).into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            })
        };

        let (addr, server) = warp::serve(ui.or(auth).unify().or(put).unify().or(get).unify())
            .bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        format!("http://{addr}")
    }

    fn guard(&self) -> Option<warp::reply::Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Some(StatusCode::SERVICE_UNAVAILABLE.into_response());
        }
        None
    }

    fn guard_session(
        &self,
        cookie: Option<String>,
    ) -> Option<warp::reply::Response> {
        if let Some(refused) = self.guard() {
            return Some(refused);
        }
        match cookie {
            Some(cookie) if cookie.contains(FAKE_SESSION) => None,
            _ => Some(StatusCode::UNAUTHORIZED.into_response()),
        }
    }
}

/// Fast retry policy for tests hitting a local fake server
pub fn quick_retry() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 3,
        timeout_ms: 2_000,
        base_delay_ms: 10,
        max_delay_ms: 40,
    }
}
