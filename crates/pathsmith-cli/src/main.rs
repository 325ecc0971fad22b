mod config;
mod path_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use anyhow::bail;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use pathsmith_core::LearningGoalInput;
use pathsmith_core::persistence::{PersistenceGateway, PgPlanStore};
use pathsmith_core::state::FileStatusStore;
use pathsmith_db::config::DbConfig;
use pathsmith_db::models::{ModuleStatus, SkillLevel, TimeAvailability};
use pathsmith_db::pool;
use pathsmith_db::queries::learning_paths;

use config::PathsmithConfig;
use path_cmds::{GenerateArgs, PathContext};

#[derive(Parser)]
#[command(name = "pathsmith", about = "Generate, save, and track AI-assisted learning paths")]
struct Cli {
    /// Database URL (overrides PATHSMITH_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// User id for saved paths (overrides PATHSMITH_USER env var)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a pathsmith config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and run migrations
    DbInit,
    /// Generate a learning path for a goal
    Generate {
        /// What you want to learn, e.g. "Rust async programming"
        goal: String,
        /// Current skill level: beginner, intermediate, advanced
        #[arg(long, default_value = "beginner")]
        skill: SkillLevel,
        /// Weekly time budget: low (1-3h), medium (4-7h), high (8+h)
        #[arg(long, default_value = "medium")]
        time: TimeAvailability,
        /// Save the generated path for the current user
        #[arg(long)]
        save: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your saved learning paths (newest first)
    List,
    /// Show a saved learning path with module statuses
    Show {
        /// Learning path ID
        id: String,
    },
    /// Set the status of one module of a saved learning path
    Status {
        /// Learning path ID
        path_id: String,
        /// Module ID within the path
        module_id: String,
        /// New status: not-started, in-progress, completed
        status: ModuleStatus,
    },
    /// Delete a saved learning path
    Delete {
        /// Learning path ID
        id: String,
    },
    /// Serve the JSON HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Execute the `pathsmith init` command: write config file.
fn cmd_init(db_url: &str, user: Option<&str>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        user: config::UserSection {
            id: user.map(str::to_string),
        },
        ..config::ConfigFile::default()
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if let Some(user) = user {
        println!("  user.id = {user}");
    }
    println!();
    println!(
        "Set {} (or [gemini] api_key) to enable AI generation.",
        config::API_KEY_ENV
    );
    println!("Next: run `pathsmith db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `pathsmith db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &PathsmithConfig) -> anyhow::Result<()> {
    println!("Initializing pathsmith database...");

    let db_name = resolved.db_config.database_name().unwrap_or("?");
    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database {db_name}.");
    } else {
        println!("Database {db_name} already exists.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let count = learning_paths::count_learning_paths(&db_pool).await?;
    println!("Database ready. learning_paths: {count} rows");

    db_pool.close().await;

    println!("pathsmith db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, cli.user.as_deref(), force)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pathsmith", &mut std::io::stdout());
        }
        command => {
            let resolved =
                PathsmithConfig::resolve(cli.database_url.as_deref(), cli.user.as_deref())?;
            run_command(command, &resolved).await?;
        }
    }

    Ok(())
}

async fn run_command(command: Commands, resolved: &PathsmithConfig) -> anyhow::Result<()> {
    match command {
        Commands::DbInit => cmd_db_init(resolved).await,
        Commands::Generate {
            goal,
            skill,
            time,
            save,
            json,
        } => {
            let args = GenerateArgs {
                input: LearningGoalInput::new(goal, skill, time),
                save,
                json,
            };
            path_cmds::cmd_generate(resolved, args).await
        }
        Commands::List => {
            let session = resolved.session()?;
            let ctx = PathContext::connect(resolved).await?;
            let result = path_cmds::cmd_list(&ctx, &session).await;
            ctx.close().await;
            result
        }
        Commands::Show { id } => {
            let session = resolved.session()?;
            let mut ctx = PathContext::connect(resolved).await?;
            let result = path_cmds::cmd_show(&mut ctx, &session, &id).await;
            ctx.close().await;
            result
        }
        Commands::Status {
            path_id,
            module_id,
            status,
        } => {
            let session = resolved.session()?;
            let mut ctx = PathContext::connect(resolved).await?;
            let result =
                path_cmds::cmd_status(&mut ctx, &session, &path_id, &module_id, status).await;
            ctx.close().await;
            result
        }
        Commands::Delete { id } => {
            let session = resolved.session()?;
            let ctx = PathContext::connect(resolved).await?;
            let result = path_cmds::cmd_delete(&ctx, &session, &id).await;
            ctx.close().await;
            result
        }
        Commands::Serve { bind, port } => {
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState::new(
                resolved.generator()?,
                PersistenceGateway::new(PgPlanStore::new(db_pool.clone()))
                    .with_auto_provision(resolved.auto_provision),
                Arc::new(FileStatusStore::new(&resolved.status_dir)),
            );
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result
        }
        Commands::Init { .. } | Commands::Completions { .. } => {
            bail!("command does not take a resolved configuration")
        }
    }
}
