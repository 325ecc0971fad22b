//! Saving, listing, reopening, and deleting learning paths.
//!
//! [`PersistenceGateway`] owns the "make sure the table exists" protocol and
//! error classification; the backend itself sits behind [`PlanStore`], one
//! method per remote step, so the protocol can be exercised without a
//! database.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pathsmith_db::models::{LearningModule, LearningPath};
use pathsmith_db::queries::learning_paths::{UNDEFINED_TABLE, sqlstate};

use crate::session::Session;

pub use postgres::PgPlanStore;

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// An error reported by a storage backend, with its error code when known
/// (SQLSTATE for PostgreSQL).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// An "undefined table" error, as raised for a missing `learning_paths`.
    pub fn undefined_table(message: impl Into<String>) -> Self {
        Self::new(Some(UNDEFINED_TABLE), message)
    }

    /// Build from an error returned by `pathsmith_db::queries`, keeping the
    /// SQLSTATE and the full context chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            code: sqlstate(err),
            message: format!("{err:#}"),
        }
    }

    pub fn is_undefined_table(&self) -> bool {
        self.code.as_deref() == Some(UNDEFINED_TABLE)
    }
}

/// Column values for a new `learning_paths` row.
#[derive(Debug, Clone, Copy)]
pub struct NewPlanRecord<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub modules: &'a [LearningModule],
    pub created_at: DateTime<Utc>,
}

/// The remote calls the gateway makes.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Succeeds when the table exists; fails with an undefined-table code
    /// when it does not.
    async fn probe_table(&self) -> Result<(), StoreError>;

    /// Define the server-side routine that creates the table.
    async fn define_provisioner(&self) -> Result<(), StoreError>;

    /// Run the routine defined by [`Self::define_provisioner`].
    async fn invoke_provisioner(&self) -> Result<(), StoreError>;

    async fn insert(&self, record: NewPlanRecord<'_>) -> Result<LearningPath, StoreError>;

    /// The user's paths, newest first.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<LearningPath>, StoreError>;

    /// The path with `id` if `user_id` owns it.
    async fn get(&self, id: Uuid, user_id: &str) -> Result<Option<LearningPath>, StoreError>;

    /// Delete the path with `id` if `user_id` owns it. Returns whether a
    /// row was removed.
    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool, StoreError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The table is absent and could not (or may not) be created.
    #[error("the learning_paths table does not exist; run `pathsmith db-init` to set up the database")]
    TableMissing,

    #[error("failed to provision the learning_paths table: {0}")]
    Provisioning(#[source] StoreError),

    #[error("storage backend error: {0}")]
    Backend(#[source] StoreError),
}

impl PersistenceError {
    /// Whether the user should be told that database setup is required.
    pub fn is_setup_required(&self) -> bool {
        matches!(self, Self::TableMissing)
    }
}

/// Undefined-table errors from any call mean setup is required.
fn classify(err: StoreError) -> PersistenceError {
    if err.is_undefined_table() {
        PersistenceError::TableMissing
    } else {
        PersistenceError::Backend(err)
    }
}

/// Saved-path operations on top of a [`PlanStore`].
pub struct PersistenceGateway<S> {
    store: S,
    auto_provision: bool,
}

impl<S: PlanStore> PersistenceGateway<S> {
    /// Gateway that provisions a missing table on demand.
    pub fn new(store: S) -> Self {
        Self {
            store,
            auto_provision: true,
        }
    }

    /// Allow or forbid on-demand provisioning. When forbidden, a missing
    /// table is reported as [`PersistenceError::TableMissing`].
    #[must_use]
    pub fn with_auto_provision(mut self, enabled: bool) -> Self {
        self.auto_provision = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Make sure the `learning_paths` table exists. Idempotent; issues no
    /// provisioning calls when the table is already there.
    pub async fn ensure_table(&self) -> Result<(), PersistenceError> {
        match self.store.probe_table().await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_undefined_table() => {
                debug!(error = %e, "learning_paths table missing");
            }
            Err(e) => return Err(PersistenceError::Backend(e)),
        }

        if !self.auto_provision {
            warn!("learning_paths table missing and auto-provisioning is disabled");
            return Err(PersistenceError::TableMissing);
        }

        info!("provisioning learning_paths table");
        self.store
            .define_provisioner()
            .await
            .map_err(PersistenceError::Provisioning)?;

        if let Err(first) = self.store.invoke_provisioner().await {
            warn!(error = %first, "provisioning call failed, retrying once");
            self.store
                .invoke_provisioner()
                .await
                .map_err(PersistenceError::Provisioning)?;
        }

        self.store.probe_table().await.map_err(classify)?;
        info!("learning_paths table provisioned");
        Ok(())
    }

    /// Store `path` for the session's user. Returns the stored path with
    /// `id`, `created_at`, and `user_id` filled in.
    pub async fn save(
        &self,
        path: &LearningPath,
        session: &Session,
    ) -> Result<LearningPath, PersistenceError> {
        self.ensure_table().await?;

        let record = NewPlanRecord {
            user_id: session.user_id(),
            title: &path.title,
            description: &path.description,
            modules: &path.modules,
            created_at: Utc::now(),
        };
        let stored = self.store.insert(record).await.map_err(classify)?;

        info!(
            path_id = ?stored.id,
            user_id = session.user_id(),
            modules = stored.modules.len(),
            "learning path saved"
        );
        Ok(stored)
    }

    /// The session user's saved paths, newest first.
    pub async fn list_by_user(
        &self,
        session: &Session,
    ) -> Result<Vec<LearningPath>, PersistenceError> {
        self.ensure_table().await?;
        self.store
            .list_by_user(session.user_id())
            .await
            .map_err(classify)
    }

    /// Reopen one of the session user's saved paths by id. Paths owned by
    /// someone else read as absent.
    pub async fn get(
        &self,
        id: Uuid,
        session: &Session,
    ) -> Result<Option<LearningPath>, PersistenceError> {
        self.ensure_table().await?;
        self.store
            .get(id, session.user_id())
            .await
            .map_err(classify)
    }

    /// Delete one of the session user's saved paths. Deleting an absent (or
    /// foreign) id is not an error; the return value says whether anything
    /// was removed.
    pub async fn delete(&self, id: Uuid, session: &Session) -> Result<bool, PersistenceError> {
        let removed = self
            .store
            .delete(id, session.user_id())
            .await
            .map_err(classify)?;
        info!(path_id = %id, user_id = session.user_id(), removed, "learning path delete");
        Ok(removed)
    }
}
