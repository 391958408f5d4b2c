pub mod toml_config;

pub use toml_config::{AppConfig, ResponseMode};

#[cfg(feature = "cli")]
use crate::domain::model::Verbosity;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::logger::LogFormat;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "simcheck")]
#[command(about = "Check domain reachability over each SIM/modem interface")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory with the front-end assets
    #[arg(long)]
    pub static_dir: Option<String>,

    #[arg(long, value_enum)]
    pub response_mode: Option<ResponseMode>,

    #[arg(long, value_enum)]
    pub verbosity: Option<Verbosity>,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 TOML (若有指定) 並套用命令列覆蓋設定
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            config.server.static_dir = Some(dir.clone());
        }
        if let Some(mode) = self.response_mode {
            config.server.response_mode = mode;
        }
        if let Some(verbosity) = self.verbosity {
            config.probe.verbosity = verbosity;
        }
    }
}
