use clap::Parser;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_HOSTS_PATH: &str = "/etc/hosts";
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub hosts_path: PathBuf,
    pub docker_socket: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts_path: PathBuf::from(DEFAULT_HOSTS_PATH),
            docker_socket: DEFAULT_SOCKET.into(),
        }
    }
}

/// Command-line flags.  Anything given here wins over files and
/// environment.
#[derive(Debug, Default, Parser, Serialize)]
#[command(
    name = "hoster",
    version,
    about = "Automatically manage /etc/hosts entries for Docker containers",
    after_help = "Example:\n  sudo hoster --hosts /etc/hosts --socket /var/run/docker.sock"
)]
pub struct Cli {
    /// Path to the hosts file
    #[arg(long = "hosts", value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts_path: Option<PathBuf>,

    /// Path to the Docker socket
    #[arg(long = "socket", value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket: Option<String>,
}

impl Config {
    pub fn figment(cli: &Cli) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("hoster.toml"))
            .merge(Json::file("hoster.json"))
            .merge(Env::prefixed("HOSTER_"))
            .merge(Serialized::defaults(cli))
    }

    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::figment(cli)
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
    }
}
