use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use universe_canvas::auth::{load_token_digest, write_new_token};
use universe_canvas::config::ServerConfig;
use universe_canvas::content::backup::{self, BackupImport, BackupScope, ExportFormat};
use universe_canvas::content::{ContentService, LogRevalidator};
use universe_canvas::error::Error;
use universe_canvas::server::{AppState, create_router};
use universe_canvas::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "canvas")]
#[command(about = "A blog and portfolio content server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to (overrides canvas.toml)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides canvas.toml)
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database, token and config file
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Export or import a JSON backup
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database, token and config file
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write a backup document to stdout or a file
    Export {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Tables to include: full, posts, projects, in_progress, tags
        #[arg(long = "type", default_value = "full")]
        kind: String,

        /// Output format: json or markdown
        #[arg(long, default_value = "json")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Upsert every table of a backup document
    Import {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Backup document to read
        file: PathBuf,
    },
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    if !config.admin_token_path().exists() {
        bail!("Server not initialized. Run 'canvas admin init' first to create the database and admin token.");
    }
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn content_service(config: &ServerConfig) -> anyhow::Result<ContentService> {
    let store = open_store(config)?;
    Ok(ContentService::new(
        Arc::new(store),
        Arc::new(LogRevalidator),
        config.related,
    ))
}

fn run_init(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;
    let config = ServerConfig::load(data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.admin_token_path();
    let raw_token = match write_new_token(&token_file) {
        Ok(token) => token,
        Err(Error::AlreadyExists) => bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        ),
        Err(e) => return Err(e.into()),
    };

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn run_export(
    data_dir: &Path,
    kind: &str,
    format: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let scope = BackupScope::parse(kind).with_context(|| format!("unknown backup type '{kind}'"))?;
    let format =
        ExportFormat::parse(format).with_context(|| format!("unknown backup format '{format}'"))?;

    let config = ServerConfig::load(data_dir)?;
    let store = open_store(&config)?;
    let doc = backup::export(&store, scope)?;

    let rendered = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&doc)?,
        ExportFormat::Markdown => backup::render_markdown(&doc),
    };

    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            eprintln!("Backup written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn run_import(data_dir: &Path, file: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let doc: BackupImport = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a backup document", file.display()))?;

    let config = ServerConfig::load(data_dir)?;
    let store = open_store(&config)?;
    let summary = backup::import(&store, &doc)?;

    for table in &summary.tables {
        println!("{:<20} {}", table.table, table.count);
    }
    println!("Imported {} rows", summary.total());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("universe_canvas=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => {
                run_init(&data_dir)?;
            }
        },
        Commands::Backup { command } => match command {
            BackupCommands::Export {
                data_dir,
                kind,
                format,
                output,
            } => {
                run_export(&data_dir, &kind, &format, output.as_deref())?;
            }
            BackupCommands::Import { data_dir, file } => {
                run_import(&data_dir, &file)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let mut config = ServerConfig::load(&data_dir)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let content = content_service(&config)?;
            let token_file = config.admin_token_path();
            let digest = load_token_digest(&token_file)?;
            info!("Admin token available at {}", token_file.display());

            let state = Arc::new(AppState::new(content, Some(digest)));
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
