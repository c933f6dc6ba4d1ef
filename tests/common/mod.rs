use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use failover_harness::ClusterConfig;
use failover_harness::HarnessConfig;
use failover_harness::LauncherConfig;
use failover_harness::TimingConfig;
use parking_lot::Mutex;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::time::sleep;
use tokio::time::Instant;
use warp::http::StatusCode;
use warp::Filter;
use warp::Reply;

pub const SESSION: &str = "JSESSIONID=integration";

/// Stand-in server: announces readiness, waits for the whole cluster to
/// register, then claims leadership with the next term whenever the current
/// leader is gone and it is the lowest live slot.
pub const SERVER_SCRIPT: &str = r#"
slot=${INSTANCE_DIR##*instance}
echo $$ > "$ELECTION_DIR/pid.$slot"
echo "worker count $WORKER_COUNT, cluster $RAFT_CLUSTER_ENABLED"
echo "Server is ready"
alive() {
  [ -f "$1" ] || return 1
  p=$(cat "$1")
  kill -0 "$p" 2>/dev/null || return 1
  st=$( (cut -d' ' -f3 "/proc/$p/stat" 2>/dev/null || ps -o stat= -p "$p" 2>/dev/null) | tr -d ' ' | cut -c1)
  [ "$st" != Z ]
}
while [ "$(ls "$ELECTION_DIR" | grep -c '^pid\.')" -lt "$CLUSTER_SIZE" ]; do sleep 0.05; done
while :; do
  if ! alive "$ELECTION_DIR/leader"; then
    lowest=1
    for f in "$ELECTION_DIR"/pid.*; do
      s=${f##*.}
      if [ "$s" -lt "$slot" ] && alive "$f"; then lowest=0; fi
    done
    if [ "$lowest" = 1 ]; then
      term=$(( $(cat "$ELECTION_DIR/term" 2>/dev/null || echo 0) + 1 ))
      echo "$term" > "$ELECTION_DIR/term"
      echo $$ > "$ELECTION_DIR/leader"
      echo "raft: became leader of term $term"
      exec sleep 600
    fi
  fi
  sleep 0.1
done
"#;

pub struct TestCluster {
    // Removed on drop
    pub root: TempDir,
    pub config: HarnessConfig,
}

impl TestCluster {
    pub fn instance_dir(
        &self,
        index: u32,
    ) -> PathBuf {
        self.config.cluster.instance_dir(index)
    }
}

/// Instance directories for `count` script servers whose configs all point at
/// `port` on localhost.
pub fn prepare_cluster(
    count: u32,
    port: u16,
) -> TestCluster {
    let root = tempfile::tempdir().unwrap();
    let election_dir = root.path().join("election");
    std::fs::create_dir_all(&election_dir).unwrap();

    let cluster = ClusterConfig {
        instance_count: count,
        instances_root: root.path().join("instances"),
        ..Default::default()
    };
    for index in 1..=count {
        write_instance_config(&cluster.instance_dir(index), port);
    }

    let launcher = LauncherConfig {
        command: "sh".into(),
        args: vec!["-c".into(), SERVER_SCRIPT.into()],
        extra_env: HashMap::from([
            ("ELECTION_DIR".to_string(), election_dir.display().to_string()),
            ("CLUSTER_SIZE".to_string(), count.to_string()),
        ]),
        scheme: "http".into(),
        host: "127.0.0.1".into(),
        ..Default::default()
    };

    let config = HarnessConfig {
        cluster,
        launcher,
        timing: TimingConfig {
            startup_secs: 1,
            recovery_secs: 1,
            ready_timeout_secs: Some(20),
            run_timeout_secs: Some(120),
        },
        ..Default::default()
    };
    config.validate().unwrap();

    TestCluster { root, config }
}

fn write_instance_config(
    instance_dir: &Path,
    port: u16,
) {
    let config_dir = instance_dir.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("server.json"),
        format!(r#"{{ "node": {{ "https": {{ "port": {port} }} }} }}"#),
    )
    .unwrap();
}

/// Whether `pid` is a live (not zombie) process.
pub fn process_running(pid: u32) -> bool {
    let proc_stat = PathBuf::from(format!("/proc/{pid}/stat"));
    let state = if Path::new("/proc/self").exists() {
        std::fs::read_to_string(proc_stat)
            .ok()
            .and_then(|stat| stat.rsplit(')').next().map(|rest| rest.trim().to_string()))
    } else {
        std::process::Command::new("ps")
            .args(["-o", "stat=", "-p", &pid.to_string()])
            .output()
            .ok()
            .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
    };
    matches!(state, Some(s) if !s.is_empty() && !s.starts_with('Z') && !s.starts_with('X'))
}

/// Poll `check` every 50ms until it holds or `limit` passes.
pub async fn wait_until<F>(
    limit: Duration,
    mut check: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    check()
}

#[derive(Debug, Deserialize)]
struct Login {
    username: String,
}

#[derive(Debug, Deserialize)]
struct Stored {
    value: String,
}

/// Key/value surface shared by every instance, like a replicated store.
#[derive(Debug, Clone, Default)]
pub struct StorageServer {
    pub values: Arc<Mutex<HashMap<String, String>>>,
}

impl StorageServer {
    /// Serve on an ephemeral port; returns the port.
    pub fn spawn(&self) -> u16 {
        let ui = warp::get()
            .and(warp::path("plugins"))
            .and(warp::path("bootstrap"))
            .and(warp::path("web"))
            .map(|| warp::reply::html("ui").into_response());

        let auth = warp::post()
            .and(warp::path("auth"))
            .and(warp::body::json())
            .map(|login: Login| {
                if login.username.is_empty() {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                warp::reply::with_header(warp::reply(), "set-cookie", format!("{SESSION}; Path=/")).into_response()
            });

        let current = warp::path("plugins")
            .and(warp::path("sample"))
            .and(warp::path("services"))
            .and(warp::path("hello"))
            .and(warp::path("_current"))
            .and(warp::path::param::<String>())
            .and(warp::path::end())
            .and(warp::header::optional::<String>("cookie"))
            .and_then(|key: String, cookie: Option<String>| async move {
                match cookie {
                    Some(c) if c.contains(SESSION) => Ok(key),
                    _ => Err(warp::reject::not_found()),
                }
            });

        let values = self.values.clone();
        let put = warp::put()
            .and(current.clone())
            .and(warp::body::json())
            .map(move |key: String, body: Stored| {
                values.lock().insert(key, body.value);
                StatusCode::OK.into_response()
            });

        let values = self.values.clone();
        let get = warp::get().and(current).map(move |key: String| match values.lock().get(&key) {
            Some(value) => warp::reply::json(&serde_json::json!({ "value": value })).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        });

        let (addr, server) = warp::serve(ui.or(auth).unify().or(put).unify().or(get).unify())
            .bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr.port()
    }
}
