//! # Unit of Work
//!
//! Change tracking for repositories: entities are staged for insert, update
//! or delete and only reach the database when [`UnitOfWork::save`] commits
//! them together in one transaction.
//!
//! Per-entity state machine:
//!
//! ```text
//! Unchanged --stage--> Added | Modified | Deleted --save--> Persisted | Failed
//! ```
//!
//! A failed save rolls the whole transaction back and keeps the staged
//! changes, so callers may retry `save` or `discard` them.

use crate::errors::{Result, SchoolApiError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tracing::{debug, instrument, warn};

/// Tracking state of an entity inside a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unchanged,
    Added,
    Modified,
    Deleted,
    Persisted,
    Failed,
}

/// Kind of a staged change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn verb(self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }

    fn pending_state(self) -> EntityState {
        match self {
            ChangeKind::Insert => EntityState::Added,
            ChangeKind::Update => EntityState::Modified,
            ChangeKind::Delete => EntityState::Deleted,
        }
    }
}

/// A change waiting for the next save
#[derive(Debug, Clone)]
pub struct StagedChange<T> {
    pub kind: ChangeKind,
    pub entity: T,
}

/// An entity the unit of work knows how to write.
///
/// The write methods return the number of affected rows; zero is treated as a
/// failed change by [`UnitOfWork::save`].
#[async_trait]
pub trait Persistable: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync;

    /// Entity name used in log fields and error context
    const ENTITY: &'static str;

    fn id(&self) -> &Self::Id;

    /// Assign a fresh identifier when the current one is unset
    fn ensure_id(&mut self);

    async fn insert(&self, conn: &mut SqliteConnection) -> std::result::Result<u64, sqlx::Error>;

    async fn update(&self, conn: &mut SqliteConnection) -> std::result::Result<u64, sqlx::Error>;

    async fn delete(&self, conn: &mut SqliteConnection) -> std::result::Result<u64, sqlx::Error>;
}

/// Staged changes plus per-entity tracking state for one logical operation
pub struct UnitOfWork<T: Persistable> {
    pool: DbPool,
    tracked: HashMap<T::Id, EntityState>,
    staged: Vec<StagedChange<T>>,
}

impl<T: Persistable> UnitOfWork<T> {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, tracked: HashMap::new(), staged: Vec::new() }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Current tracking state of an entity, if tracked
    pub fn state(&self, id: &T::Id) -> Option<EntityState> {
        self.tracked.get(id).copied()
    }

    pub fn is_tracked(&self, id: &T::Id) -> bool {
        self.tracked.contains_key(id)
    }

    pub fn has_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn pending(&self) -> &[StagedChange<T>] {
        &self.staged
    }

    /// Start tracking an entity loaded from the store
    pub fn attach(&mut self, entity: &T) {
        let id = entity.id();
        if !self.staged.iter().any(|change| change.entity.id() == id) {
            self.tracked.insert(id.clone(), EntityState::Unchanged);
        }
    }

    /// Stage an insert, assigning an id when the entity has none
    pub fn stage_insert(&mut self, mut entity: T) -> T {
        entity.ensure_id();
        let staged = entity.clone();
        self.tracked.insert(entity.id().clone(), EntityState::Added);
        self.staged.push(StagedChange { kind: ChangeKind::Insert, entity });
        staged
    }

    /// Stage an update; folds into an already staged insert or update of the same entity
    pub fn stage_update(&mut self, entity: T) {
        let id = entity.id().clone();

        if let Some(change) = self
            .staged
            .iter_mut()
            .find(|change| change.entity.id() == &id && change.kind != ChangeKind::Delete)
        {
            change.entity = entity;
            self.tracked.insert(id, change.kind.pending_state());
            return;
        }

        self.tracked.insert(id, EntityState::Modified);
        self.staged.push(StagedChange { kind: ChangeKind::Update, entity });
    }

    /// Stage a delete; an entity that was only staged for insert is simply forgotten
    pub fn stage_delete(&mut self, entity: T) {
        let id = entity.id().clone();

        let was_added = self
            .staged
            .iter()
            .any(|change| change.entity.id() == &id && change.kind == ChangeKind::Insert);
        self.staged.retain(|change| change.entity.id() != &id);

        if was_added {
            self.tracked.remove(&id);
            return;
        }

        self.tracked.insert(id, EntityState::Deleted);
        self.staged.push(StagedChange { kind: ChangeKind::Delete, entity });
    }

    /// Drop every staged change and reset tracking for the affected entities
    pub fn discard(&mut self) {
        for change in self.staged.drain(..) {
            let id = change.entity.id().clone();
            match change.kind {
                ChangeKind::Insert => {
                    self.tracked.remove(&id);
                }
                ChangeKind::Update | ChangeKind::Delete => {
                    self.tracked.insert(id, EntityState::Unchanged);
                }
            }
        }
    }

    /// Commit every staged change in one transaction.
    ///
    /// On success the staged entities become `Persisted` and staging is
    /// cleared. On failure nothing is applied, the entities become `Failed`
    /// and the staged changes are kept.
    #[instrument(skip(self), fields(entity = T::ENTITY, changes = self.staged.len()), name = "uow_save")]
    pub async fn save(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }

        match self.commit_staged().await {
            Ok(()) => {
                for change in self.staged.drain(..) {
                    self.tracked.insert(change.entity.id().clone(), EntityState::Persisted);
                }
                debug!("Unit of work committed");
                Ok(())
            }
            Err(e) => {
                for change in &self.staged {
                    self.tracked.insert(change.entity.id().clone(), EntityState::Failed);
                }
                warn!(error = %e, "Unit of work rolled back");
                Err(e)
            }
        }
    }

    async fn commit_staged(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            SchoolApiError::database(e, format!("Failed to begin transaction for {}", T::ENTITY))
        })?;

        match apply_all(&self.staged, &mut *tx).await {
            Ok(()) => tx.commit().await.map_err(|e| {
                SchoolApiError::database(e, format!("Failed to commit {} changes", T::ENTITY))
            }),
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "Failed to roll back transaction");
                }
                Err(e)
            }
        }
    }
}

async fn apply_all<T: Persistable>(
    staged: &[StagedChange<T>],
    conn: &mut SqliteConnection,
) -> Result<()> {
    for change in staged {
        let result = match change.kind {
            ChangeKind::Insert => change.entity.insert(&mut *conn).await,
            ChangeKind::Update => change.entity.update(&mut *conn).await,
            ChangeKind::Delete => change.entity.delete(&mut *conn).await,
        };

        let affected = result.map_err(|e| {
            SchoolApiError::database(
                e,
                format!("Failed to {} {} '{}'", change.kind.verb(), T::ENTITY, change.entity.id()),
            )
        })?;

        if affected == 0 {
            return Err(SchoolApiError::database(
                sqlx::Error::RowNotFound,
                format!(
                    "{} of {} '{}' affected no rows",
                    change.kind.verb(),
                    T::ENTITY,
                    change.entity.id()
                ),
            ));
        }
    }

    Ok(())
}
