pub mod cli;
pub mod toml_config;

pub use toml_config::ClientConfig;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "ownly")]
#[command(about = "Browse the data marketplace, build datasets and follow streams")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Marketplace API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// API key sent as X-API-Key
    #[arg(long, env = "OWNLY_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Use the built-in demo marketplace instead of a server
    #[arg(long, global = true)]
    pub demo: bool,

    /// Directory for CSV exports
    #[arg(long, global = true)]
    pub output_path: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the API is up
    Health,
    /// List catalog datasets
    Catalog {
        /// Free-text filter over title, description and domains
        #[arg(long)]
        search: Option<String>,
        /// Only datasets in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Ask the planner which sources fit a data need
    Plan {
        query: String,
    },
    /// Plan a query, select fields and optionally generate the stream
    Create {
        query: String,
        /// Select a field, as source:field
        #[arg(long = "select", value_name = "SOURCE:FIELD")]
        select: Vec<String>,
        /// Select every field of a source
        #[arg(long = "select-all", value_name = "SOURCE")]
        select_all: Vec<String>,
        /// Show sample rows for the selection
        #[arg(long)]
        preview: bool,
        /// Generate the stream once fields are selected
        #[arg(long)]
        generate: bool,
        /// Dataset to preview and generate from
        #[arg(long, default_value = "duo_airbnb_italian")]
        dataset_id: String,
    },
    /// Generate a stream from whole sources
    Generate {
        dataset_id: String,
        #[arg(required = true)]
        sources: Vec<String>,
    },
    /// Show a stream's sample rows
    Stream {
        id: String,
        /// Keep polling and print each refresh
        #[arg(long)]
        follow: bool,
        /// Stop following after this many refreshes
        #[arg(long)]
        limit: Option<u64>,
        /// Write the latest rows to dataset-<id>.csv
        #[arg(long)]
        export: bool,
    },
    /// Manage streams generated from this machine
    Streams {
        #[command(subcommand)]
        action: Option<StreamsAction>,
    },
    /// Create a demo API key
    ApiKey,
}

#[cfg(feature = "cli")]
impl Command {
    /// `health` is the only call the API answers without a key.
    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Command::Health)
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum StreamsAction {
    /// List recorded streams (default)
    List,
    /// Fetch streams and update their status
    Refresh {
        /// Only this stream; all streams when omitted
        id: Option<String>,
    },
    /// Forget a stream
    Remove { id: String },
    /// Mark a stream paused
    Pause { id: String },
    /// Mark a paused stream active again
    Resume { id: String },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入配置檔 (若有) 並套用命令列覆蓋設定
    pub fn resolve(&self) -> crate::utils::error::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api.api_key = Some(api_key.clone());
        }
        if let Some(output_path) = &self.output_path {
            config.export.output_path = output_path.clone();
        }
        if self.demo {
            config.demo.enabled = true;
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;

    #[test]
    fn test_flags_override_defaults() {
        let cli = CliConfig::parse_from([
            "ownly",
            "--base-url",
            "http://localhost:9999",
            "--api-key",
            "demo_cli",
            "stream",
            "ds_1",
            "--follow",
        ]);

        let config = cli.resolve().unwrap();
        assert_eq!(config.base_url(), "http://localhost:9999");
        assert_eq!(config.api_key(), Some("demo_cli"));
        assert!(matches!(cli.command, Command::Stream { follow: true, .. }));
    }

    #[test]
    fn test_streams_subcommands() {
        let cli = CliConfig::parse_from(["ownly", "streams", "refresh", "ds_1"]);
        assert!(matches!(
            cli.command,
            Command::Streams {
                action: Some(StreamsAction::Refresh { id: Some(ref id) })
            } if id == "ds_1"
        ));
        assert!(cli.command.needs_api_key());

        let cli = CliConfig::parse_from(["ownly", "streams"]);
        assert!(matches!(cli.command, Command::Streams { action: None }));

        let cli = CliConfig::parse_from(["ownly", "health"]);
        assert!(!cli.command.needs_api_key());
    }

    #[test]
    fn test_create_collects_selections() {
        let cli = CliConfig::parse_from([
            "ownly",
            "--demo",
            "create",
            "connect language learning to airbnb rentals",
            "--select",
            "duolingo:language",
            "--select",
            "duolingo:streak_days",
            "--select-all",
            "airbnb_italy",
        ]);

        assert!(cli.resolve().unwrap().demo_mode());
        match cli.command {
            Command::Create {
                select, select_all, ..
            } => {
                assert_eq!(select.len(), 2);
                assert_eq!(select_all, vec!["airbnb_italy"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
