use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

/// Everything the process reads from the environment (§6 "Environment"):
/// `DATA_DIR`, `API_KEY`, `HOST`, `PORT`. Mount definitions and namespace
/// configs are runtime state reached through admin RPC methods, not env.
pub struct Config {
    pub data_dir: PathBuf,
    pub bootstrap_api_key: Option<String>,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./data"));
        let bootstrap_api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
        let port: u16 = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got {raw:?}"))?,
            Err(_) => DEFAULT_PORT,
        };
        let bind_addr = format!("{host}:{port}").parse().map_err(|e| anyhow::anyhow!("invalid HOST/PORT combination: {e}"))?;

        Ok(Self { data_dir, bootstrap_api_key, bind_addr })
    }
}
