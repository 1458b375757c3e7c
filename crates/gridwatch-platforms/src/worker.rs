//! Shared plumbing for process-detected workers (Render, AI training):
//! `pgrep` detection, optional HTTP counters, and the worker JSON document
//! handed to the parser.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use gridwatch_core::AdapterError;
use serde_json::{Value, json};

use crate::process::{locate_binary, run_bounded};

/// Upper bound for a single `pgrep` call.
const PGREP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a whole adapter fetch under one deadline, whatever steps it takes.
/// Child processes still in flight are killed when the future is dropped.
pub async fn within<T, F>(timeout: Duration, fetch: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ worker fetch exceeded {}s", timeout.as_secs());
            Err(AdapterError::Timeout {
                secs: timeout.as_secs().max(1),
            })
        }
    }
}

/// Find the first process whose command line matches one of `terms`.
///
/// `pgrep` exit 1 means "no match" and moves on to the next term; any other
/// failure is surfaced.
pub async fn find_worker_process(terms: &[String], timeout: Duration) -> Result<Option<String>, AdapterError> {
    let pgrep = locate_binary("pgrep", None, &[PathBuf::from("/usr/bin"), PathBuf::from("/bin")])?;
    let per_call = timeout.min(PGREP_TIMEOUT);

    for term in terms {
        let out = run_bounded(&pgrep, &["-fl", term.as_str()], per_call).await?;
        match out.code {
            Some(0) => {
                if let Some(line) = out.stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
                    tracing::debug!("🔎 worker process for '{term}': {line}");
                    return Ok(Some(line.to_string()));
                }
            }
            Some(1) => continue,
            _ => return Err(out.into_failure()),
        }
    }
    Ok(None)
}

/// GET a JSON counters document (`{jobs: {...}, earnings: {...}}`).
pub async fn fetch_counters(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    timeout: Duration,
) -> Result<Value, AdapterError> {
    let mut req = client.get(url).timeout(timeout);
    if let Some(token) = bearer.filter(|t| !t.is_empty()) {
        req = req.bearer_auth(token);
    }

    let resp = req.send().await.map_err(|e| {
        if e.is_timeout() {
            AdapterError::Timeout {
                secs: timeout.as_secs().max(1),
            }
        } else {
            AdapterError::NetworkError(format!("GET {url} failed: {e}"))
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AdapterError::NetworkError(format!("GET {url} returned {status}")));
    }

    resp.json::<Value>()
        .await
        .map_err(|e| AdapterError::NetworkError(format!("Invalid JSON from {url}: {e}")))
}

/// Build the worker document the parser understands.
pub fn worker_document(process: Option<&str>, counters: Option<&Value>, platforms: Option<Value>) -> Value {
    let state = if process.is_some() { "running" } else { "stopped" };
    let mut doc = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "worker": {
            "status": state,
            "process": process,
        },
    });

    if let Some(counters) = counters {
        for key in ["jobs", "earnings"] {
            if let Some(section) = counters.get(key) {
                doc[key] = section.clone();
            }
        }
    }
    if let Some(platforms) = platforms {
        doc["platforms"] = platforms;
    }
    doc
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response on a random local port.
    pub(crate) async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/status")
    }

    #[tokio::test]
    async fn test_within_bounds_all_steps_together() {
        let started = std::time::Instant::now();
        let result: Result<(), AdapterError> = within(Duration::from_millis(200), async {
            for _ in 0..4 {
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AdapterError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_within_passes_through_result() {
        let ok = within(Duration::from_secs(1), async { Ok::<_, AdapterError>(7) }).await;
        assert_eq!(ok, Ok(7));
        let err = within(Duration::from_secs(1), async {
            Err::<(), _>(AdapterError::NotInstalled("pgrep".into()))
        })
        .await;
        assert_eq!(err, Err(AdapterError::NotInstalled("pgrep".into())));
    }

    #[test]
    fn test_worker_document_running_with_counters() {
        let counters = json!({"jobs": {"active": 1, "completed": 5}, "earnings": {"total": 2.5}, "noise": 1});
        let doc = worker_document(Some("42 render-node"), Some(&counters), None);
        assert_eq!(doc["worker"]["status"], "running");
        assert_eq!(doc["jobs"]["completed"], 5);
        assert_eq!(doc["earnings"]["total"], 2.5);
        assert!(doc.get("noise").is_none());
        assert!(doc.get("platforms").is_none());
    }

    #[test]
    fn test_worker_document_stopped_has_no_counters() {
        let doc = worker_document(None, None, Some(json!({"akash": {"enabled": true}})));
        assert_eq!(doc["worker"]["status"], "stopped");
        assert!(doc["worker"]["process"].is_null());
        assert!(doc.get("jobs").is_none());
        assert_eq!(doc["platforms"]["akash"]["enabled"], true);
    }

    #[tokio::test]
    async fn test_fetch_counters_ok() {
        let url = serve_once("200 OK", r#"{"jobs":{"active":0,"completed":3}}"#).await;
        let client = reqwest::Client::new();
        let value = fetch_counters(&client, &url, Some("token"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value["jobs"]["completed"], 3);
    }

    #[tokio::test]
    async fn test_fetch_counters_http_error() {
        let url = serve_once("500 Internal Server Error", "{}").await;
        let client = reqwest::Client::new();
        let err = fetch_counters(&client, &url, None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NetworkError(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_fetch_counters_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        let err = fetch_counters(&client, &format!("http://{addr}/"), None, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NetworkError(_)));
    }
}
