use std::env;

use crate::models::IceServer;

const DEFAULT_ICE_SERVERS: &str = "stun:stun.l.google.com:19302,stun:stun1.l.google.com:19302";

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_upload_bytes: u64,
    pub sweep_interval_secs: u64,
    pub ice_urls: Vec<String>,
    pub turn_username: Option<String>,
    pub turn_credential: Option<String>,
    pub push_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./ghost.db".into()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(104_857_600), // 100MB
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(60),
            ice_urls: parse_list(
                &env::var("ICE_SERVERS").unwrap_or_else(|_| DEFAULT_ICE_SERVERS.into()),
            ),
            turn_username: env::var("TURN_USERNAME").ok().filter(|v| !v.is_empty()),
            turn_credential: env::var("TURN_CREDENTIAL").ok().filter(|v| !v.is_empty()),
            push_webhook_url: env::var("PUSH_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
        }
    }

    /// STUN urls share one entry; TURN urls carry the credentials when both are set.
    pub fn ice_servers(&self) -> Vec<IceServer> {
        let (turn, stun): (Vec<String>, Vec<String>) = self
            .ice_urls
            .iter()
            .cloned()
            .partition(|u| u.starts_with("turn:") || u.starts_with("turns:"));

        let mut servers = Vec::new();
        if !stun.is_empty() {
            servers.push(IceServer {
                urls: stun,
                username: None,
                credential: None,
            });
        }
        if !turn.is_empty() {
            servers.push(IceServer {
                urls: turn,
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }
        servers
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
