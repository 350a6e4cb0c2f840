#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

pub const JWT_SECRET: &str = "integration-secret";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory store so the suite needs no database
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_journal-api"));
        cmd.env("APP_ENV", "development")
            .env("JOURNAL_STORE", "memory")
            .env("API_PORT", port.to_string())
            .env("JWT_SECRET", JWT_SECRET)
            .env("SECURITY_ADMIN_ROLE_CHECK", "legacy")
            .env("API_ENABLE_REQUEST_LOGGING", "false")
            .env_remove("PORT")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Sign a token the spawned server accepts; role order is preserved
pub fn token(user: &str, roles: &[&str]) -> String {
    use journal_api::auth::{generate_jwt, Claims, RoleClaim};

    let claims = Claims::new(user, user, roles.iter().map(|r| RoleClaim::new(*r)).collect(), 1);
    generate_jwt(&claims, JWT_SECRET).expect("sign token")
}

/// Title unique to one test, since tests share the server
pub fn unique_title(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Create a journal and return its id
pub async fn create_journal(server: &TestServer, body: serde_json::Value) -> Result<String> {
    let res = reqwest::Client::new().post(server.url("/journal")).json(&body).send().await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "create failed with {}", res.status());
    let created = res.json::<serde_json::Value>().await?;
    created["id"]
        .as_str()
        .map(str::to_string)
        .context("created journal has no id")
}
