use anyhow::{Context, Result};
use clap::Parser;
use ezira_common::{
    get_cli_styles,
    logger::{setup_logger, LogConfig},
};
use ezira_daemon::{
    config::{validate_invariants_enabled, DatabaseConfig, GenesisConfig},
    core::Database,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Serialize, Deserialize, Clone)]
#[clap(
    version = VERSION,
    about = "Ezira ledger daemon: replays the block log and reports the chain state",
    styles = get_cli_styles()
)]
pub struct Config {
    /// Chain database configuration
    #[clap(flatten)]
    pub database: DatabaseConfig,
    /// Genesis state configuration
    #[clap(flatten)]
    pub genesis: GenesisConfig,
    /// Log configuration
    #[clap(flatten)]
    pub log: LogConfig,
    /// Check every supply invariant once the block log is replayed
    #[clap(long)]
    #[serde(default)]
    pub check_invariants: bool,
    /// JSON File to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub generate_config_template: bool,
}

fn main() -> Result<()> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
    } else if config.generate_config_template {
        eprintln!("Provided config file path is required to generate the template with --config-file");
        return Ok(());
    }

    setup_logger(&config.log).context("Error while setting up the logger")?;
    info!("Ezira daemon v{}", VERSION);

    let db = Database::open(config.database, config.genesis)
        .context("Error while opening the chain database")?;

    let head = db.head_block_num()?;
    info!(
        "head block {} ({}) at {}, last irreversible block {}",
        head,
        db.head_block_id()?,
        db.head_block_time()?,
        db.last_irreversible_block_num()
    );

    if config.check_invariants || validate_invariants_enabled() {
        if let Err(e) = db.validate_invariants() {
            error!("chain state is inconsistent: {}", e);
            return Err(e.into());
        }
        info!("every supply invariant holds");
    }
    info!("state digest: {}", db.state_digest()?);
    Ok(())
}
