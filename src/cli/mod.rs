//! Command-line interface for rustle.
//!
//! Every command works on series declared in the configuration file and
//! prints JSON on stdout. Commands that change counters save the store
//! snapshot afterwards.

use crate::core::config::ConfigBuilder;
use crate::core::{Config, Result, RustleError, TimeInput};
use crate::series::{AggregateOptions, CounterRegistry, RangeOptions};
use crate::store::{CounterStore, InMemoryStore};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Time-bucketed counters with gap-filled ranges and rollups
#[derive(Parser, Debug)]
#[command(name = "rustle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/rustle/config.yaml)
    #[arg(short, long, env = "RUSTLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot file holding the store contents
    #[arg(long, env = "RUSTLE_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "RUSTLE_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate configuration and exit
    CheckConfig,
    /// Describe every configured series
    List,
    /// Describe one series
    Describe {
        /// Series as domain:category:name
        series: String,
    },
    /// Count one event
    Inc {
        /// Series as domain:category:name
        series: String,
        /// Event time (epoch seconds or ISO-8601), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// List stored bucket timestamps
    Keys {
        /// Series as domain:category:name
        series: String,
    },
    /// List stored buckets with their values
    Values {
        /// Series as domain:category:name
        series: String,
    },
    /// Gap-filled buckets between two bounds
    Range {
        /// Series as domain:category:name
        series: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Gap-filled buckets rolled up into a coarser period
    Aggregate {
        /// Series as domain:category:name
        series: String,
        /// Target period in seconds
        #[arg(long)]
        period: i64,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Bucket count and totals, for one series or all of them
    Stats {
        /// Series as domain:category:name
        series: Option<String>,
    },
}

impl Command {
    /// Whether the command changes stored counters.
    pub fn mutates(&self) -> bool {
        matches!(self, Command::Inc { .. })
    }
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            Some(path.clone())
        } else {
            dirs::config_dir()
                .map(|d| d.join("rustle").join("config.yaml"))
                .filter(|p| p.exists())
        };

        if let Some(path) = config_path {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    builder = builder.from_yaml(&content)?;
                    tracing::info!("Loaded configuration from: {:?}", path);
                },
                Err(e) => {
                    return Err(RustleError::config(format!(
                        "Failed to read config file {:?}: {}",
                        path, e
                    )));
                },
            }
        } else {
            tracing::debug!("No config file found, using defaults");
        }

        if let Some(path) = &self.data_file {
            builder = builder.data_file(path.clone());
        }
        builder.debug(self.debug).build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let log_level = if self.debug || config.debug {
            "debug".to_string()
        } else {
            std::env::var("RUSTLE_LOG_LEVEL")
                .unwrap_or_else(|_| config.logging.level.as_str().to_string())
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        // Logs go to stderr so stdout stays machine readable
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.logging.structured)
            .with_thread_ids(config.logging.structured)
            .with_line_number(config.logging.structured)
            .compact();

        // A subscriber installed earlier in the process (embedding, tests) wins
        if let Err(e) = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init() {
            tracing::debug!("Keeping existing subscriber: {}", e);
        }

        Ok(())
    }
}

/// Execute the rustle command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    if cli.command == Command::CheckConfig {
        println!("Configuration is valid!");
        println!("  Series: {}", config.series.len());
        for series in &config.series {
            println!(
                "    {}:{}:{} every {}s x {}",
                series.domain, series.category, series.name, series.period, series.retention
            );
        }
        return Ok(());
    }

    let store = Arc::new(match &config.store.data_file {
        Some(path) => InMemoryStore::open(path).await?,
        None => {
            tracing::warn!("No data file configured, counters will not outlive this process");
            InMemoryStore::new()
        },
    });
    let shared: Arc<dyn CounterStore> = Arc::clone(&store) as Arc<dyn CounterStore>;
    let registry = CounterRegistry::from_config(&config, &shared)?;

    run_command(&registry, &cli.command).await?;

    if cli.command.mutates() {
        if let Some(path) = &config.store.data_file {
            store.save_snapshot(path).await?;
        }
    }
    Ok(())
}

/// Runs one command against the registry, printing its result.
pub async fn run_command(registry: &CounterRegistry, command: &Command) -> Result<()> {
    match command {
        Command::CheckConfig => Ok(()),
        Command::List => print_json(&registry.describe_all()),
        Command::Describe { series } => print_json(&registry.lookup(series)?.describe()),
        Command::Inc { series, at } => {
            let counter = registry.lookup(series)?;
            let receipt = counter.increment(at.clone().map(TimeInput::from)).await?;
            print_json(&receipt)
        },
        Command::Keys { series } => print_json(&registry.lookup(series)?.timestamps().await?),
        Command::Values { series } => print_json(&registry.lookup(series)?.values().await?),
        Command::Range { series, from, to } => {
            let options = range_options(from.as_deref(), to.as_deref());
            print_json(&registry.lookup(series)?.range(&options).await?)
        },
        Command::Aggregate {
            series,
            period,
            from,
            to,
        } => {
            let options = AggregateOptions {
                range: range_options(from.as_deref(), to.as_deref()),
                period: *period,
            };
            print_json(&registry.lookup(series)?.aggregate(&options).await?)
        },
        Command::Stats { series: Some(series) } => {
            print_json(&registry.lookup(series)?.stats().await?)
        },
        Command::Stats { series: None } => {
            let all: Vec<_> = registry
                .stats_all()
                .await?
                .into_iter()
                .map(|(key, stats)| (key.to_string(), stats))
                .collect();
            print_json(&all)
        },
    }
}

fn range_options(from: Option<&str>, to: Option<&str>) -> RangeOptions {
    RangeOptions {
        from: from.map(TimeInput::from),
        to: to.map(TimeInput::from),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inc() {
        let cli = Cli::try_parse_from(["rustle", "inc", "web:hits:homepage", "--at", "100"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Inc {
                series: "web:hits:homepage".to_string(),
                at: Some("100".to_string()),
            }
        );
        assert!(cli.command.mutates());
        assert!(!cli.debug);
    }

    #[test]
    fn test_parse_aggregate_requires_period() {
        assert!(Cli::try_parse_from(["rustle", "aggregate", "web:hits:homepage"]).is_err());
        let cli = Cli::try_parse_from([
            "rustle",
            "aggregate",
            "web:hits:homepage",
            "--period",
            "3600",
            "--from",
            "2024-01-01",
        ])
        .unwrap();
        assert!(!cli.command.mutates());
        assert!(matches!(cli.command, Command::Aggregate { period: 3600, .. }));
    }

    #[test]
    fn test_range_options_from_strings() {
        let options = range_options(Some("0"), None);
        assert_eq!(options.from, Some(TimeInput::Text("0".to_string())));
        assert_eq!(options.to, None);
    }

    #[tokio::test]
    async fn test_load_config_applies_data_file_override() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        tokio::fs::write(
            &config_path,
            "series:\n  - {domain: web, category: hits, name: homepage, period: 60, retention: 10, aggregation: sum}\n",
        )
        .await
        .unwrap();

        let cli = Cli::try_parse_from([
            "rustle",
            "--config",
            config_path.to_str().unwrap(),
            "--data-file",
            "/tmp/override.json",
            "list",
        ])
        .unwrap();
        let config = cli.load_config().await.unwrap();
        assert_eq!(config.series.len(), 1);
        assert_eq!(config.store.data_file, Some(PathBuf::from("/tmp/override.json")));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_error() {
        let cli = Cli::try_parse_from(["rustle", "--config", "/nonexistent/rustle.yaml", "list"])
            .unwrap();
        assert!(matches!(
            cli.load_config().await,
            Err(RustleError::InvalidConfiguration(_))
        ));
    }
}
