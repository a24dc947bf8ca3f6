//! TestServer: full-stack integration test harness.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apilint::ServerConfig;
use apilint_telemetry::MetricsRegistry;

/// Errors from TestServer operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server failed to start: {0}")]
    StartupFailed(String),
}

/// Full-stack test harness.
///
/// Binds an ephemeral port, serves the apilint router on it in a background
/// task, and provides HTTP request helpers. Dropping the server stops it.
pub struct TestServer {
    addr: std::net::SocketAddr,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), String>>,
}

impl TestServer {
    /// Start a server with default settings and no allowed CORS origins.
    pub async fn start() -> Result<Self, TestError> {
        Self::with_config(ServerConfig::default()).await
    }

    /// Start a server with the given configuration. `listen_addr` is ignored.
    pub async fn with_config(config: ServerConfig) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let metrics = Arc::new(MetricsRegistry::new());
        let task = tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            apilint::server::serve(listener, config, metrics, shutdown)
                .await
                .map_err(|e| format!("{:#}", e))
        });

        let mut server = TestServer {
            addr,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            task,
        };
        server.wait_for_ready().await?;
        Ok(server)
    }

    /// Poll the health endpoint until the server answers.
    async fn wait_for_ready(&mut self) -> Result<(), TestError> {
        let health_url = format!("{}/health", self.base_url());
        let max_attempts = 50;
        let delay = Duration::from_millis(20);

        for _ in 0..max_attempts {
            if let Ok(resp) = self.client.get(&health_url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }

            if self.task.is_finished() {
                return Err(TestError::StartupFailed(
                    "server task exited before becoming ready".to_string(),
                ));
            }

            tokio::time::sleep(delay).await;
        }

        Err(TestError::StartupFailed(
            "server did not become ready in time".to_string(),
        ))
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get the base URL of the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request to the given path.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// POST a raw body to `/validate`.
    pub async fn post_raw(&self, body: impl Into<String>) -> Result<reqwest::Response, TestError> {
        let url = format!("{}/validate", self.base_url());
        Ok(self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(body.into())
            .send()
            .await?)
    }

    /// POST a `{document, ruleset}` request to `/validate`.
    pub async fn post_validate(
        &self,
        document: &str,
        ruleset: &str,
    ) -> Result<reqwest::Response, TestError> {
        let body = serde_json::json!({ "document": document, "ruleset": ruleset });
        self.post_raw(body.to_string()).await
    }

    /// POST to `/validate` and decode the JSON response with its status.
    pub async fn validate(
        &self,
        document: &str,
        ruleset: &str,
    ) -> Result<(u16, Value), TestError> {
        let resp = self.post_validate(document, ruleset).await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await?))
    }

    /// Make a request with any method and extra headers.
    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        let mut builder = self.client.request(method, &url);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        Ok(builder.send().await?)
    }

    /// Stop the server and wait for it to drain.
    pub async fn shutdown(mut self) -> Result<(), TestError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match (&mut self.task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TestError::StartupFailed(e)),
            Err(e) => Err(TestError::StartupFailed(e.to_string())),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Mock host for remote rulesets.
pub struct RulesetHost {
    server: MockServer,
}

impl RulesetHost {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Serve `body` at `at` with status 200.
    pub async fn serve(&self, at: &str, body: &str) {
        self.serve_status(at, 200, body).await;
    }

    /// Serve `body` at `at` with the given status, typed by its extension.
    pub async fn serve_status(&self, at: &str, status: u16, body: &str) {
        let content_type = if at.ends_with(".json") {
            "application/json"
        } else {
            "application/yaml"
        };
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, content_type))
            .mount(&self.server)
            .await;
    }

    /// Absolute URL of `at` on this host.
    pub fn url(&self, at: &str) -> String {
        format!("{}{}", self.server.uri(), at)
    }

    /// Number of requests the host has received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Read a file from the workspace `tests/fixtures` directory.
pub fn fixture(name: &str) -> Result<String, TestError> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name);
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_health() {
        let server = TestServer::start().await.expect("failed to start server");

        let resp = server.get("/health").await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_server_404() {
        let server = TestServer::start().await.expect("failed to start server");

        let resp = server.get("/nonexistent").await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_server_405() {
        let server = TestServer::start().await.expect("failed to start server");

        let resp = server
            .request(reqwest::Method::GET, "/validate", &[])
            .await
            .unwrap();
        assert_eq!(resp.status(), 405);
    }

    #[tokio::test]
    async fn test_server_graceful_shutdown() {
        let server = TestServer::start().await.expect("failed to start server");
        let base = server.base_url();
        server.shutdown().await.expect("clean shutdown");

        let refused = reqwest::Client::new()
            .get(format!("{}/health", base))
            .timeout(Duration::from_millis(500))
            .send()
            .await;
        assert!(refused.is_err());
    }
}
