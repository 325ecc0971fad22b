//! CLI handlers for the learning-path subcommands.
//!
//! Implements:
//! - `pathsmith generate <goal>`                 -- generate (and optionally save) a path
//! - `pathsmith list`                            -- list the user's saved paths
//! - `pathsmith show <id>`                       -- show a saved path with its statuses
//! - `pathsmith status <path-id> <module> <st>`  -- update one module's status
//! - `pathsmith delete <id>`                     -- delete a saved path

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use pathsmith_core::generate::{GeneratedPath, PathSource, create_learning_path};
use pathsmith_core::persistence::{PersistenceError, PersistenceGateway, PgPlanStore};
use pathsmith_core::state::{FileStatusStore, PlanController, Progress};
use pathsmith_core::{LearningGoalInput, Session};
use pathsmith_db::models::{LearningPath, ModuleStatus};
use pathsmith_db::pool;

use crate::config::PathsmithConfig;

/// Printed whenever the `learning_paths` table is missing.
pub const SETUP_REQUIRED_NOTICE: &str = "Database setup required: the learning_paths table does not exist.\n\
     Run `pathsmith db-init` (or enable [persistence] auto_provision) and try again.";

// -----------------------------------------------------------------------
// Wiring
// -----------------------------------------------------------------------

/// Everything the database-backed commands need.
pub struct PathContext {
    pub gateway: PersistenceGateway<PgPlanStore>,
    pub controller: PlanController<FileStatusStore>,
}

impl PathContext {
    pub async fn connect(config: &PathsmithConfig) -> Result<Self> {
        let db_pool = pool::create_pool(&config.db_config).await?;
        Ok(Self::new(db_pool, config))
    }

    pub fn new(db_pool: sqlx::PgPool, config: &PathsmithConfig) -> Self {
        Self {
            gateway: PersistenceGateway::new(PgPlanStore::new(db_pool))
                .with_auto_provision(config.auto_provision),
            controller: PlanController::new(FileStatusStore::new(&config.status_dir)),
        }
    }

    pub async fn close(self) {
        self.gateway.store().pool().close().await;
    }
}

fn parse_path_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid learning path ID: {raw}"))
}

/// Turn a setup-required error into the notice; pass everything else on.
fn report_setup_required(err: PersistenceError) -> Result<()> {
    if err.is_setup_required() {
        println!("{SETUP_REQUIRED_NOTICE}");
        return Ok(());
    }
    Err(err.into())
}

// -----------------------------------------------------------------------
// pathsmith generate
// -----------------------------------------------------------------------

pub struct GenerateArgs {
    pub input: LearningGoalInput,
    pub save: bool,
    pub json: bool,
}

/// Generate a path, print it, and save it when asked.
pub async fn cmd_generate(config: &PathsmithConfig, args: GenerateArgs) -> Result<()> {
    let generator = config.generator()?;
    let session = if args.save {
        Some(config.session()?)
    } else {
        None
    };

    let mut generated = create_learning_path(&generator, &args.input).await;

    if let Some(session) = session {
        let mut ctx = PathContext::connect(config).await?;
        let result = save_generated(&mut ctx, &mut generated, &session).await;
        ctx.close().await;
        result?;
    }

    if args.json {
        let out = serde_json::to_string_pretty(&generated)
            .context("failed to serialize learning path")?;
        println!("{out}");
    } else {
        if let Some(notice) = &generated.notice {
            println!("Note: {notice}");
            println!();
        }
        print_path(&generated.path, &Progress::of(&generated.path));
        if generated.source == PathSource::Ai {
            if let Some(model) = generator.model_id() {
                println!();
                println!("Generated by {model}.");
            }
        }
    }

    Ok(())
}

async fn save_generated(
    ctx: &mut PathContext,
    generated: &mut GeneratedPath,
    session: &Session,
) -> Result<()> {
    ctx.controller.open(generated.path.clone(), false);

    match ctx.gateway.save(&generated.path, session).await {
        Ok(stored) => {
            ctx.controller.mark_saved(&stored);
            if let Some(active) = ctx.controller.active() {
                generated.path = active.path.clone();
            }
            eprintln!(
                "Saved learning path {}.",
                stored.id.map(|id| id.to_string()).unwrap_or_default()
            );
            Ok(())
        }
        Err(e) if e.is_setup_required() => {
            eprintln!("{SETUP_REQUIRED_NOTICE}");
            Ok(())
        }
        Err(e) => Err(e).context("failed to save learning path"),
    }
}

// -----------------------------------------------------------------------
// pathsmith list
// -----------------------------------------------------------------------

/// List the session user's saved paths, newest first.
pub async fn cmd_list(ctx: &PathContext, session: &Session) -> Result<()> {
    let paths = match ctx.gateway.list_by_user(session).await {
        Ok(paths) => paths,
        Err(e) => return report_setup_required(e),
    };

    if paths.is_empty() {
        println!("No saved learning paths. Use `pathsmith generate <goal> --save` to create one.");
        return Ok(());
    }

    let id_w = 36;
    let title_w = paths
        .iter()
        .map(|p| p.title.len())
        .max()
        .unwrap_or(5)
        .max(5);

    println!("{:<id_w$}  {:<title_w$}  {:>7}  CREATED", "ID", "TITLE", "MODULES");
    for path in &paths {
        let id = path.id.map(|id| id.to_string()).unwrap_or_default();
        let created = path
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<id_w$}  {:<title_w$}  {:>7}  {}",
            id,
            path.title,
            path.modules.len(),
            created,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// pathsmith show <id>
// -----------------------------------------------------------------------

/// Open a saved path, apply the local status mirror, and print it.
pub async fn cmd_show(ctx: &mut PathContext, session: &Session, raw_id: &str) -> Result<()> {
    let id = parse_path_id(raw_id)?;
    let Some(path) = open_saved(ctx, session, id).await? else {
        return Ok(());
    };
    ctx.controller.open(path, true);

    if let (Some(active), Some(progress)) = (ctx.controller.active(), ctx.controller.progress()) {
        print_path(&active.path, &progress);
    }
    Ok(())
}

/// Fetch one of the user's saved paths. `Ok(None)` means a notice was
/// already printed.
async fn open_saved(
    ctx: &PathContext,
    session: &Session,
    id: Uuid,
) -> Result<Option<LearningPath>> {
    match ctx.gateway.get(id, session).await {
        Ok(Some(path)) => Ok(Some(path)),
        Ok(None) => bail!("learning path {id} not found"),
        Err(e) => report_setup_required(e).map(|()| None),
    }
}

// -----------------------------------------------------------------------
// pathsmith status <path-id> <module-id> <status>
// -----------------------------------------------------------------------

/// Update one module's status in the local mirror of a saved path.
pub async fn cmd_status(
    ctx: &mut PathContext,
    session: &Session,
    raw_id: &str,
    module_id: &str,
    status: ModuleStatus,
) -> Result<()> {
    let id = parse_path_id(raw_id)?;
    let Some(path) = open_saved(ctx, session, id).await? else {
        return Ok(());
    };
    ctx.controller.open(path, true);

    if !ctx.controller.set_status(module_id, status) {
        println!("No module {module_id:?} in learning path {id}; nothing changed.");
        return Ok(());
    }

    println!("Module {module_id} marked {status}.");
    if let Some(progress) = ctx.controller.progress() {
        println!("{}", progress_line(&progress));
    }
    Ok(())
}

// -----------------------------------------------------------------------
// pathsmith delete <id>
// -----------------------------------------------------------------------

/// Delete a saved path and its local status mirror.
pub async fn cmd_delete(ctx: &PathContext, session: &Session, raw_id: &str) -> Result<()> {
    let id = parse_path_id(raw_id)?;
    let removed = match ctx.gateway.delete(id, session).await {
        Ok(removed) => removed,
        Err(e) => return report_setup_required(e),
    };
    if removed {
        ctx.controller.forget(id);
        println!("Learning path {id} deleted.");
    } else {
        println!("Learning path {id} not found; nothing deleted.");
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Rendering
// -----------------------------------------------------------------------

fn status_marker(status: ModuleStatus) -> &'static str {
    match status {
        ModuleStatus::NotStarted => "[ ]",
        ModuleStatus::InProgress => "[~]",
        ModuleStatus::Completed => "[x]",
    }
}

fn progress_line(progress: &Progress) -> String {
    format!(
        "Progress: {}/{} completed ({}%), {} in progress",
        progress.completed,
        progress.total,
        progress.percent_complete(),
        progress.in_progress,
    )
}

fn print_path(path: &LearningPath, progress: &Progress) {
    println!("{}", path.title);
    if !path.description.is_empty() {
        println!("{}", path.description);
    }
    if let Some(id) = path.id {
        println!("ID: {id}");
    }
    println!("Estimated total: {} hours", path.total_hours());
    println!("{}", progress_line(progress));

    for module in &path.modules {
        println!();
        println!(
            "{} {}  {}  ({} h, {})",
            status_marker(module.status),
            module.id,
            module.title,
            module.estimated_hours,
            module.status,
        );
        if !module.description.is_empty() {
            println!("    {}", module.description);
        }
        for resource in &module.resources {
            println!("    - [{}] {} <{}>", resource.kind, resource.title, resource.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathsmith_core::generate::generate_fallback;
    use pathsmith_db::models::{SkillLevel, TimeAvailability};

    #[test]
    fn parse_path_id_accepts_uuid_and_rejects_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_path_id(&format!(" {id} ")).unwrap(), id);
        let err = parse_path_id("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("invalid learning path ID"));
    }

    #[test]
    fn setup_required_is_reported_not_raised() {
        assert!(report_setup_required(PersistenceError::TableMissing).is_ok());
    }

    #[test]
    fn other_persistence_errors_are_raised() {
        let err = PersistenceError::Backend(pathsmith_core::persistence::StoreError::new(
            None,
            "connection reset",
        ));
        assert!(report_setup_required(err).is_err());
    }

    #[test]
    fn progress_line_reports_counts() {
        let mut path = generate_fallback(&LearningGoalInput::new(
            "Rust",
            SkillLevel::Beginner,
            TimeAvailability::Low,
        ));
        path.modules[0].status = ModuleStatus::Completed;
        path.modules[1].status = ModuleStatus::InProgress;

        let line = progress_line(&Progress::of(&path));
        assert_eq!(line, "Progress: 1/3 completed (33%), 1 in progress");
    }

    #[test]
    fn status_markers_are_distinct() {
        let markers = [
            status_marker(ModuleStatus::NotStarted),
            status_marker(ModuleStatus::InProgress),
            status_marker(ModuleStatus::Completed),
        ];
        assert_ne!(markers[0], markers[1]);
        assert_ne!(markers[1], markers[2]);
    }
}
