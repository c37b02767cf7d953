use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wargame_sync::model::CatalogEntry;
use wargame_sync::{
    Banner, Board, CatalogKind, GameService, MemoryStore, PlayerIdentity, SequenceService,
    ServiceConfig, SyncContext,
};

#[derive(Parser)]
#[command(name = "wargame-sync")]
#[command(about = "Synchronize wargame aggregates and turn action logs")]
struct Cli {
    /// Snapshot file, overrides WARGAME_STORE_PATH
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Acting principal, overrides WARGAME_PRINCIPAL
    #[arg(long, global = true)]
    principal: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Game {
        #[command(subcommand)]
        action: GameCommand,
    },
    Sequence {
        #[command(subcommand)]
        action: SequenceCommand,
    },
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },
}

#[derive(Subcommand)]
enum GameCommand {
    /// Create (no id) or update (with id) a game from a JSON file
    Put { file: PathBuf },
    Show { id: u64 },
    Delete {
        id: u64,
        #[arg(long)]
        expected_version: Option<u64>,
    },
}

#[derive(Subcommand)]
enum SequenceCommand {
    Put { file: PathBuf },
    Show { game: u64, count: u32 },
    List { game: u64 },
    Delete {
        game: u64,
        count: u32,
        #[arg(long)]
        expected_version: Option<u64>,
    },
}

#[derive(Subcommand)]
enum CatalogCommand {
    Board {
        #[arg(long)]
        name: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        icon: String,
    },
    Identity {
        #[arg(long)]
        name: String,
        #[arg(long)]
        path: String,
    },
    Banner {
        #[arg(long)]
        name: String,
        #[arg(long)]
        path: String,
    },
    List { kind: CatalogArg },
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogArg {
    Board,
    Identity,
    Banner,
}

impl From<CatalogArg> for CatalogKind {
    fn from(arg: CatalogArg) -> Self {
        match arg {
            CatalogArg::Board => CatalogKind::Board,
            CatalogArg::Identity => CatalogKind::PlayerIdentity,
            CatalogArg::Banner => CatalogKind::Banner,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env().context("failed to load configuration")?;
    if let Some(path) = cli.store {
        config = config.store_path(path);
    }
    if let Some(principal) = cli.principal.as_deref() {
        config = config.principal(principal);
    }

    let store = Arc::new(match &config.store_path {
        Some(path) => MemoryStore::open(path)
            .await
            .with_context(|| format!("failed to open store '{}'", path.display()))?,
        None => MemoryStore::new(),
    });
    let ctx = SyncContext::new(store.clone(), config.principal.clone());

    let mutated = run(cli.command, &ctx, &store).await?;

    if mutated && config.autosave {
        if let Some(path) = &config.store_path {
            let metadata = store
                .save(path)
                .await
                .with_context(|| format!("failed to save store '{}'", path.display()))?;
            info!(path = %path.display(), games = metadata.game_count, "store saved");
        }
    }
    Ok(())
}

/// Runs one command; returns whether the store changed.
async fn run(command: Command, ctx: &SyncContext, store: &MemoryStore) -> Result<bool> {
    match command {
        Command::Game { action } => {
            let games = GameService::new(ctx.clone());
            match action {
                GameCommand::Put { file } => {
                    let wire = read_json(&file).await?;
                    print_json(&games.put_game(&wire).await?)?;
                    Ok(true)
                }
                GameCommand::Show { id } => {
                    print_json(&games.get_game(id).await?)?;
                    Ok(false)
                }
                GameCommand::Delete {
                    id,
                    expected_version,
                } => {
                    games.delete_game(id, expected_version).await?;
                    println!("deleted game {id}");
                    Ok(true)
                }
            }
        }
        Command::Sequence { action } => {
            let sequences = SequenceService::new(ctx.clone());
            match action {
                SequenceCommand::Put { file } => {
                    let wire = read_json(&file).await?;
                    print_json(&sequences.create_sequence(&wire).await?)?;
                    Ok(true)
                }
                SequenceCommand::Show { game, count } => {
                    print_json(&sequences.get_sequence(game, count).await?)?;
                    Ok(false)
                }
                SequenceCommand::List { game } => {
                    print_json(&sequences.list_sequences(game).await?)?;
                    Ok(false)
                }
                SequenceCommand::Delete {
                    game,
                    count,
                    expected_version,
                } => {
                    sequences
                        .delete_sequence(game, count, expected_version)
                        .await?;
                    println!("deleted sequence {game}/{count}");
                    Ok(true)
                }
            }
        }
        Command::Catalog { action } => match action {
            CatalogCommand::Board { name, path, icon } => {
                let board = store.put_board(Board::new(name, path, icon)).await;
                println!("board '{}' stored at version {}", board.path, board.version);
                Ok(true)
            }
            CatalogCommand::Identity { name, path } => {
                let identity = store.put_identity(PlayerIdentity::new(name, path)).await;
                println!(
                    "identity '{}' stored at version {}",
                    identity.name, identity.version
                );
                Ok(true)
            }
            CatalogCommand::Banner { name, path } => {
                let banner = store.put_banner(Banner::new(name, path)).await;
                println!("banner '{}' stored at version {}", banner.name, banner.version);
                Ok(true)
            }
            CatalogCommand::List { kind } => {
                for entry in store.catalog(kind.into()).await {
                    println!("{}", describe(&entry));
                }
                Ok(false)
            }
        },
    }
}

fn describe(entry: &CatalogEntry) -> String {
    match entry {
        CatalogEntry::Board(board) => {
            format!("{}\t{}\t{}\tv{}", board.path, board.name, board.icon, board.version)
        }
        CatalogEntry::PlayerIdentity(identity) => {
            format!("{}\t{}\tv{}", identity.name, identity.path, identity.version)
        }
        CatalogEntry::Banner(banner) => {
            format!("{}\t{}\tv{}", banner.name, banner.path, banner.version)
        }
    }
}

async fn read_json(path: &Path) -> Result<JsonValue> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("'{}' is not valid JSON", path.display()))
}

fn print_json(value: &JsonValue) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wargame_sync=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
