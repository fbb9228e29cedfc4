use std::path::PathBuf;
use std::sync::Arc;

use audio_vault::configuration::{Backend, Config};
use audio_vault::error_handling::VaultError;
use audio_vault::storage::BackupStatus;
use audio_vault::vault::Vault;
use audio_vault::web_interface::WebServer;
use clap::{Parser, Subcommand};
use log::{error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "audio-vault")]
#[command(version)]
#[command(about = "Local durable vault for captured audio recordings")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Vault directory, overrides the configuration file
    #[arg(short, long, env = "AUDIO_VAULT_DIR")]
    data_dir: Option<PathBuf>,

    /// Record store backend, overrides the configuration file
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an audio file and print its id
    Save {
        path: PathBuf,
        /// Label to store instead of the file name
        #[arg(long)]
        name: Option<String>,
        /// Recording length in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
    /// List backups, most recent first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a backup
    Delete { id: Uuid },
    /// Write a backup's audio to a file
    Export { id: Uuid, dest: PathBuf },
    /// Record the outcome of a transcription attempt
    Status { id: Uuid, status: BackupStatus },
    /// Remove backups older than the threshold
    Cleanup {
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
    /// Print every vault change until interrupted
    Watch,
    /// Serve backups over HTTP
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(1);
    });

    let (vault, expired) = Vault::open_with_sweep(&config).await.unwrap_or_else(|e| {
        error!(
            "Unable to open vault at {}: {}",
            config.data_dir.display(),
            e
        );
        std::process::exit(1);
    });
    if expired > 0 {
        info!("Removed {} expired backup(s) at startup", expired);
    }

    if let Err(e) = run(args.command, vault, &config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<Config, VaultError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    config.validate()?;
    Ok(config)
}

async fn run(command: Command, vault: Vault, config: &Config) -> Result<(), VaultError> {
    match command {
        Command::Save {
            path,
            name,
            duration,
        } => {
            let bytes = tokio::fs::read(&path).await?;
            let name = name.unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| String::from("recording"))
            });
            let id = vault.save_with_duration(bytes, name, duration).await?;
            println!("{}", id);
        }
        Command::List { json } => {
            let records = vault.list().await?;
            if json {
                let summaries: Vec<_> = records.iter().map(|r| r.summary()).collect();
                let out = serde_json::to_string_pretty(&summaries)
                    .map_err(|e| VaultError::Io(std::io::Error::other(e)))?;
                println!("{}", out);
            } else {
                for record in &records {
                    let created = record
                        .created_at()
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| record.timestamp.to_string());
                    println!(
                        "{}  {}  {:>8}  {:<7}  {}",
                        record.id,
                        created,
                        record.size(),
                        record.status,
                        record.filename
                    );
                }
            }
        }
        Command::Delete { id } => {
            if vault.delete(id).await? {
                info!("Deleted {}", id);
            } else {
                info!("No backup with id {}, nothing to delete", id);
            }
        }
        Command::Export { id, dest } => {
            let record = vault.get(id).await?.ok_or(VaultError::NotFound(id))?;
            tokio::fs::write(&dest, &record.blob).await?;
            info!(
                "Exported {} ({} bytes) to {}",
                record.filename,
                record.size(),
                dest.display()
            );
        }
        Command::Status { id, status } => {
            vault
                .set_status(id, status)
                .await?
                .ok_or(VaultError::NotFound(id))?;
        }
        Command::Cleanup { max_age_hours } => {
            let removed = vault
                .cleanup(max_age_hours.unwrap_or(config.retention_hours))
                .await?;
            println!("{}", removed);
        }
        Command::Watch => {
            let _subscription = vault.on_change(|event| {
                println!("{:?} {} ({:?})", event.kind, event.id, event.origin);
            });
            info!("Watching {} for changes", config.data_dir.display());
            tokio::signal::ctrl_c().await?;
        }
        Command::Serve { port } => {
            let web = config.serve_settings(port)?;
            let addr = WebServer::address(&web)?;
            WebServer::new(Arc::new(vault)).start(addr).await?;
        }
    }
    Ok(())
}
