//! The active learning path and its per-module status tracking.
//!
//! [`PlanController`] holds at most one open path. Status changes for a
//! path that has been saved are mirrored to a [`StatusStore`] and reapplied
//! when the path is reopened.

pub mod mirror;

use tracing::{debug, warn};
use uuid::Uuid;

use pathsmith_db::models::{LearningPath, ModuleStatus};

pub use mirror::{
    FileStatusStore, MemoryStatusStore, StatusMap, StatusStore, default_status_dir, mirror_key,
};

/// The path currently being viewed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePlan {
    pub path: LearningPath,
    /// True while the path matches what was last saved.
    pub saved: bool,
}

/// Identifies one in-flight generate or load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Module counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(path: &LearningPath) -> Self {
        let mut progress = Self {
            total: path.modules.len(),
            ..Self::default()
        };
        for module in &path.modules {
            match module.status {
                ModuleStatus::NotStarted => progress.not_started += 1,
                ModuleStatus::InProgress => progress.in_progress += 1,
                ModuleStatus::Completed => progress.completed += 1,
            }
        }
        progress
    }

    /// Completed share in whole percent; 0 for an empty path.
    pub fn percent_complete(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed * 100 / self.total) as u32
    }
}

/// Owns the active path and applies status changes to it.
pub struct PlanController<M> {
    mirror: M,
    active: Option<ActivePlan>,
    generation: u64,
}

impl<M: StatusStore> PlanController<M> {
    pub fn new(mirror: M) -> Self {
        Self {
            mirror,
            active: None,
            generation: 0,
        }
    }

    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    pub fn active(&self) -> Option<&ActivePlan> {
        self.active.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.saved)
    }

    pub fn progress(&self) -> Option<Progress> {
        self.active.as_ref().map(|a| Progress::of(&a.path))
    }

    /// Install `path` as the active plan. Supersedes any pending request.
    ///
    /// For a saved path, statuses from the mirror are reapplied and the
    /// mirror is merged with the result in one update: recorded statuses
    /// win, missing modules are added, entries naming modules the path does
    /// not have are dropped.
    pub fn open(&mut self, path: LearningPath, saved: bool) {
        self.generation += 1;
        self.install(path, saved);
    }

    /// Start a generate/load request. A later [`Self::begin_request`],
    /// [`Self::open`], or [`Self::clear`] makes the ticket stale.
    pub fn begin_request(&mut self) -> RequestTicket {
        self.generation += 1;
        RequestTicket(self.generation)
    }

    /// Open `path` only if `ticket` is still current. Returns whether the
    /// path was installed.
    pub fn open_if_current(&mut self, ticket: RequestTicket, path: LearningPath, saved: bool) -> bool {
        if ticket.0 != self.generation {
            debug!(
                ticket = ticket.0,
                current = self.generation,
                "discarding stale response"
            );
            return false;
        }
        self.install(path, saved);
        true
    }

    /// Set one module's status. Unknown module ids (or no active plan) are
    /// a silent no-op returning `false`.
    ///
    /// Any change clears the saved flag. Paths with a persisted id record
    /// the change in the mirror entry, merged with whatever other
    /// controllers sharing the mirror have recorded.
    pub fn set_status(&mut self, module_id: &str, status: ModuleStatus) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let Some(module) = active.path.module_mut(module_id) else {
            debug!(module_id, "status change for unknown module ignored");
            return false;
        };
        module.status = status;

        if let Some(id) = active.path.id {
            update_mirror(&self.mirror, id, &mut |statuses| {
                statuses.insert(module_id.to_string(), status);
            });
        }
        active.saved = false;
        true
    }

    /// Adopt the identity of a freshly saved copy of the active path and
    /// mark it saved. Returns `false` when nothing is open.
    pub fn mark_saved(&mut self, persisted: &LearningPath) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.path.id = persisted.id;
        active.path.created_at = persisted.created_at;
        active.path.user_id.clone_from(&persisted.user_id);
        active.saved = true;

        self.write_mirror();
        true
    }

    /// Drop the active plan and invalidate pending requests.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.active = None;
    }

    /// Delete the mirror entry of a path, e.g. after the path was deleted.
    pub fn forget(&self, path_id: Uuid) {
        if let Err(e) = self.mirror.remove(&mirror_key(path_id)) {
            warn!(path_id = %path_id, error = %e, "failed to remove status mirror");
        }
    }

    fn install(&mut self, mut path: LearningPath, saved: bool) {
        if saved {
            if let Some(id) = path.id {
                sync_with_mirror(&self.mirror, id, &mut path);
            }
        }
        self.active = Some(ActivePlan { path, saved });
    }

    fn write_mirror(&self) {
        let Some(active) = &self.active else {
            return;
        };
        let Some(id) = active.path.id else {
            return;
        };
        let statuses: StatusMap = active
            .path
            .modules
            .iter()
            .map(|m| (m.id.clone(), m.status))
            .collect();
        if let Err(e) = self.mirror.store(&mirror_key(id), &statuses) {
            warn!(path_id = %id, error = %e, "failed to write status mirror");
        }
    }
}

fn update_mirror<M: StatusStore>(
    mirror: &M,
    id: Uuid,
    apply: &mut dyn FnMut(&mut StatusMap),
) -> Option<StatusMap> {
    match mirror.update(&mirror_key(id), apply) {
        Ok(statuses) => Some(statuses),
        Err(e) => {
            warn!(path_id = %id, error = %e, "failed to update status mirror");
            None
        }
    }
}

fn sync_with_mirror<M: StatusStore>(mirror: &M, id: Uuid, path: &mut LearningPath) {
    let merged = update_mirror(mirror, id, &mut |statuses| {
        statuses.retain(|module_id, _| {
            let known = path.module(module_id).is_some();
            if !known {
                debug!(path_id = %id, module_id = %module_id, "mirror entry for absent module dropped");
            }
            known
        });
        for module in &path.modules {
            statuses.entry(module.id.clone()).or_insert(module.status);
        }
    });

    let Some(merged) = merged else {
        return;
    };
    for module in &mut path.modules {
        if let Some(status) = merged.get(&module.id) {
            module.status = *status;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::generate::generate_fallback;
    use crate::goal::LearningGoalInput;
    use pathsmith_db::models::{SkillLevel, TimeAvailability};

    fn fresh_path() -> LearningPath {
        generate_fallback(&LearningGoalInput::new(
            "Woodworking",
            SkillLevel::Beginner,
            TimeAvailability::Low,
        ))
    }

    fn persisted_path() -> LearningPath {
        let mut path = fresh_path();
        path.id = Some(Uuid::new_v4());
        path.created_at = Some(Utc::now());
        path.user_id = Some("alice".to_string());
        path
    }

    fn status_of(controller: &PlanController<MemoryStatusStore>, module_id: &str) -> ModuleStatus {
        controller
            .active()
            .and_then(|a| a.path.module(module_id))
            .map(|m| m.status)
            .unwrap()
    }

    #[test]
    fn set_status_changes_only_target_module() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        controller.open(fresh_path(), false);

        assert!(controller.set_status("module_2", ModuleStatus::InProgress));

        assert_eq!(status_of(&controller, "module_1"), ModuleStatus::NotStarted);
        assert_eq!(status_of(&controller, "module_2"), ModuleStatus::InProgress);
        assert_eq!(status_of(&controller, "module_3"), ModuleStatus::NotStarted);
    }

    #[test]
    fn unknown_module_id_is_a_no_op() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        let path = persisted_path();
        controller.open(path.clone(), true);
        let before = controller.active().cloned();

        assert!(!controller.set_status("module_99", ModuleStatus::Completed));

        assert_eq!(controller.active().cloned(), before);
        assert!(controller.is_saved());
    }

    #[test]
    fn set_status_without_active_plan_is_a_no_op() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        assert!(!controller.set_status("module_1", ModuleStatus::Completed));
    }

    #[test]
    fn unsaved_path_is_not_mirrored() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        controller.open(fresh_path(), false);
        controller.set_status("module_1", ModuleStatus::Completed);

        assert!(controller.mirror().is_empty());
    }

    #[test]
    fn mirror_round_trip_across_reopen() {
        let path = persisted_path();
        let id = path.id.unwrap();
        let mut controller = PlanController::new(MemoryStatusStore::new());

        controller.open(path.clone(), true);
        controller.set_status("module_1", ModuleStatus::Completed);
        controller.set_status("module_3", ModuleStatus::InProgress);
        assert!(!controller.is_saved(), "a change clears the saved flag");

        let stored = controller.mirror().load(&mirror_key(id)).unwrap().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored["module_1"], ModuleStatus::Completed);

        // Reopen the stored copy (all not-started): mirror wins.
        controller.clear();
        controller.open(path, true);
        assert!(controller.is_saved());
        assert_eq!(status_of(&controller, "module_1"), ModuleStatus::Completed);
        assert_eq!(status_of(&controller, "module_2"), ModuleStatus::NotStarted);
        assert_eq!(status_of(&controller, "module_3"), ModuleStatus::InProgress);
    }

    #[test]
    fn mirror_entries_for_absent_modules_are_ignored() {
        let path = persisted_path();
        let id = path.id.unwrap();
        let mirror = MemoryStatusStore::new();
        mirror
            .store(
                &mirror_key(id),
                &StatusMap::from([
                    ("module_2".to_string(), ModuleStatus::Completed),
                    ("gone".to_string(), ModuleStatus::Completed),
                ]),
            )
            .unwrap();

        let mut controller = PlanController::new(mirror);
        controller.open(path, true);

        assert_eq!(status_of(&controller, "module_2"), ModuleStatus::Completed);
        let rewritten = controller.mirror().load(&mirror_key(id)).unwrap().unwrap();
        assert!(!rewritten.contains_key("gone"));
        assert_eq!(rewritten.len(), 3);
    }

    #[test]
    fn interleaved_controllers_keep_each_others_changes() {
        let path = persisted_path();
        let shared = Arc::new(MemoryStatusStore::new());
        let mut first = PlanController::new(Arc::clone(&shared));
        let mut second = PlanController::new(Arc::clone(&shared));

        first.open(path.clone(), true);
        second.open(path.clone(), true);
        assert!(first.set_status("module_1", ModuleStatus::Completed));
        assert!(second.set_status("module_2", ModuleStatus::Completed));

        let mut reopened = PlanController::new(Arc::clone(&shared));
        reopened.open(path, true);
        let statuses: Vec<ModuleStatus> = reopened
            .active()
            .unwrap()
            .path
            .modules
            .iter()
            .map(|m| m.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                ModuleStatus::Completed,
                ModuleStatus::Completed,
                ModuleStatus::NotStarted,
            ]
        );
    }

    #[test]
    fn concurrent_file_backed_controllers_lose_no_updates() {
        let tmp = tempfile::TempDir::new().unwrap();
        let shared = Arc::new(FileStatusStore::new(tmp.path()));
        let path = persisted_path();
        let id = path.id.unwrap();

        std::thread::scope(|scope| {
            for module_id in ["module_1", "module_2", "module_3"] {
                let shared = Arc::clone(&shared);
                let path = path.clone();
                scope.spawn(move || {
                    let mut controller = PlanController::new(shared);
                    controller.open(path, true);
                    assert!(controller.set_status(module_id, ModuleStatus::InProgress));
                });
            }
        });

        let stored = shared.load(&mirror_key(id)).unwrap().unwrap();
        assert!(stored.values().all(|s| *s == ModuleStatus::InProgress));
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn mark_saved_adopts_identity_and_mirrors() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        controller.open(fresh_path(), false);
        controller.set_status("module_1", ModuleStatus::InProgress);

        let persisted = persisted_path();
        assert!(controller.mark_saved(&persisted));

        let active = controller.active().unwrap();
        assert!(active.saved);
        assert_eq!(active.path.id, persisted.id);
        assert_eq!(active.path.user_id.as_deref(), Some("alice"));
        let stored = controller
            .mirror()
            .load(&mirror_key(persisted.id.unwrap()))
            .unwrap()
            .unwrap();
        assert_eq!(stored["module_1"], ModuleStatus::InProgress);
    }

    #[test]
    fn mark_saved_without_active_plan_returns_false() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        assert!(!controller.mark_saved(&persisted_path()));
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut controller = PlanController::new(MemoryStatusStore::new());

        let first = controller.begin_request();
        let second = controller.begin_request();

        assert!(!controller.open_if_current(first, fresh_path(), false));
        assert!(controller.active().is_none());
        assert!(controller.open_if_current(second, fresh_path(), false));
        assert!(controller.active().is_some());
    }

    #[test]
    fn clear_invalidates_pending_request() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        let ticket = controller.begin_request();
        controller.clear();

        assert!(!controller.open_if_current(ticket, fresh_path(), false));
        assert!(controller.active().is_none());
    }

    #[test]
    fn open_supersedes_pending_request() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        let ticket = controller.begin_request();
        let opened = persisted_path();
        controller.open(opened.clone(), true);

        assert!(!controller.open_if_current(ticket, fresh_path(), false));
        assert_eq!(controller.active().unwrap().path.id, opened.id);
    }

    #[test]
    fn forget_removes_mirror_entry() {
        let path = persisted_path();
        let id = path.id.unwrap();
        let mut controller = PlanController::new(MemoryStatusStore::new());
        controller.open(path, true);
        assert!(controller.mirror().load(&mirror_key(id)).unwrap().is_some());

        controller.forget(id);
        assert!(controller.mirror().load(&mirror_key(id)).unwrap().is_none());
    }

    #[test]
    fn progress_counts_statuses() {
        let mut controller = PlanController::new(MemoryStatusStore::new());
        assert!(controller.progress().is_none());

        controller.open(fresh_path(), false);
        controller.set_status("module_1", ModuleStatus::Completed);
        controller.set_status("module_2", ModuleStatus::InProgress);

        let progress = controller.progress().unwrap();
        assert_eq!(
            progress,
            Progress {
                not_started: 1,
                in_progress: 1,
                completed: 1,
                total: 3,
            }
        );
        assert_eq!(progress.percent_complete(), 33);
    }
}
