//! Task synchronization layer
//!
//! [`TaskState`] is a pure reducer: [`TaskState::apply`] makes the optimistic
//! local edit for an intent and [`TaskState::reconcile`] folds in the server's
//! answer. [`TaskSync`] pairs the reducer with a [`TaskGateway`] and the
//! current session.
//!
//! Toggle is rolled back on failure. Delete is not: a failed delete leaves
//! the task removed locally and raises an error, because the prior position
//! cannot be reconstructed. Callers relying on a restored list must re-fetch.
//!
//! List fetches are stamped with the state's clock when issued. A list never
//! overrides a mutation confirmed after it was issued, and a list older than
//! one already applied is dropped.

use common::{ApiResult, ClientError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::{
    gateway::TaskGateway,
    models::{AuthContext, NewTask, Task, TaskUpdate},
    session::SessionStore,
    validation::{validate_new_task, validate_task_update},
};

/// A user action against the task collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskIntent {
    /// Initial page load; failure shows a retryable page-level error
    Load { issued: u64 },
    /// Re-fetch after a mutation; failure shows a dismissible banner
    Refresh { issued: u64 },
    Create(NewTask),
    Update { id: i64, changes: TaskUpdate },
    Toggle { id: i64 },
    Delete { id: i64 },
}

/// Successful server answer to an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Listed(Vec<Task>),
    Created(Task),
    Updated(Task),
    Toggled(Task),
    Deleted,
}

/// Mutation in flight for a task id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    Toggle { previous: bool },
    Update,
    Delete,
}

/// Server-confirmed result of a mutation, `None` once deleted
#[derive(Debug, Clone, PartialEq, Eq)]
struct Confirmed {
    at: u64,
    task: Option<Task>,
}

/// Task collection of one authenticated view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    tasks: Vec<Task>,
    pending: BTreeMap<i64, PendingOp>,
    confirmed: BTreeMap<i64, Confirmed>,
    clock: u64,
    listed_at: Option<u64>,
    creating: bool,
    loading: bool,
    error: Option<String>,
    load_error: Option<String>,
}

impl TaskState {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    /// Number of mutations confirmed so far; stamps list fetches
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Tasks in display order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Whether the controls of task `id` should be disabled
    pub fn is_pending(&self, id: i64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Dismissible error banner
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Page-level error of the last full load
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn dismiss_error(mut self) -> Self {
        self.error = None;
        self
    }

    /// Whether `intent` can start now
    ///
    /// Per-task mutations need the task present and idle; only one create
    /// runs at a time.
    pub fn accepts(&self, intent: &TaskIntent) -> bool {
        match intent {
            TaskIntent::Load { .. } | TaskIntent::Refresh { .. } => true,
            TaskIntent::Create(_) => !self.creating,
            TaskIntent::Update { id, .. }
            | TaskIntent::Toggle { id }
            | TaskIntent::Delete { id } => self.task(*id).is_some() && !self.is_pending(*id),
        }
    }

    /// Optimistic local edit, made before the request is sent
    pub fn apply(mut self, intent: &TaskIntent) -> Self {
        if !self.accepts(intent) {
            return self;
        }

        match intent {
            TaskIntent::Load { .. } => {
                self.loading = true;
                self.load_error = None;
            }
            TaskIntent::Refresh { .. } => {}
            TaskIntent::Create(_) => self.creating = true,
            TaskIntent::Update { id, .. } => {
                self.pending.insert(*id, PendingOp::Update);
            }
            TaskIntent::Toggle { id } => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) {
                    let previous = task.completed;
                    task.completed = !previous;
                    self.pending.insert(*id, PendingOp::Toggle { previous });
                }
            }
            TaskIntent::Delete { id } => {
                self.tasks.retain(|t| t.id != *id);
                self.pending.insert(*id, PendingOp::Delete);
            }
        }

        self
    }

    /// Fold the settled request for `intent` into the state
    pub fn reconcile(
        mut self,
        intent: &TaskIntent,
        result: Result<&TaskOutcome, &ClientError>,
    ) -> Self {
        match (intent, result) {
            (TaskIntent::Load { issued }, Ok(TaskOutcome::Listed(tasks))) => {
                self.loading = false;
                self.replace_all(tasks, *issued);
            }
            (TaskIntent::Load { .. }, Err(e)) => {
                self.loading = false;
                self.load_error = Some(e.to_string());
            }
            (TaskIntent::Refresh { issued }, Ok(TaskOutcome::Listed(tasks))) => {
                self.replace_all(tasks, *issued)
            }
            (TaskIntent::Create(_), Ok(TaskOutcome::Created(task))) => {
                self.creating = false;
                self.upsert(task);
                self.confirm(task.id, Some(task));
            }
            (TaskIntent::Create(_), Err(_)) => self.creating = false,
            (TaskIntent::Update { id, .. }, Ok(TaskOutcome::Updated(task))) => {
                self.pending.remove(id);
                self.replace(task);
                self.confirm(*id, Some(task));
            }
            (TaskIntent::Toggle { id }, Ok(TaskOutcome::Toggled(task))) => {
                self.pending.remove(id);
                self.replace(task);
                self.confirm(*id, Some(task));
            }
            (TaskIntent::Toggle { id }, Err(_)) => {
                if let Some(PendingOp::Toggle { previous }) = self.pending.remove(id) {
                    if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) {
                        task.completed = previous;
                    }
                }
            }
            (TaskIntent::Delete { id }, Ok(TaskOutcome::Deleted)) => {
                self.pending.remove(id);
                self.tasks.retain(|t| t.id != *id);
                self.confirm(*id, None);
            }
            (TaskIntent::Update { id, .. } | TaskIntent::Delete { id }, Err(_)) => {
                self.pending.remove(id);
            }
            _ => {}
        }

        // load errors are page-level, everything else goes to the banner
        if let Err(e) = result {
            if !matches!(intent, TaskIntent::Load { .. }) {
                self.error = Some(e.to_string());
            }
        }

        self
    }

    fn confirm(&mut self, id: i64, task: Option<&Task>) {
        self.clock += 1;
        self.confirmed.insert(
            id,
            Confirmed {
                at: self.clock,
                task: task.cloned(),
            },
        );
    }

    /// Take a list issued at clock `issued`
    ///
    /// Mutations confirmed after `issued` win over the list's entries, and
    /// optimistic edits still in flight are re-applied on top.
    fn replace_all(&mut self, tasks: &[Task], issued: u64) {
        if self.listed_at.is_some_and(|at| issued < at) {
            return;
        }
        self.listed_at = Some(issued);
        self.load_error = None;

        let newer = |id: i64| self.confirmed.get(&id).filter(|c| c.at > issued);

        let mut merged: Vec<Task> = tasks
            .iter()
            .filter_map(|t| match newer(t.id) {
                Some(confirmed) => confirmed.task.clone(),
                None => Some(t.clone()),
            })
            .collect();
        for confirmed in self.confirmed.values().filter(|c| c.at > issued) {
            if let Some(task) = &confirmed.task {
                if !merged.iter().any(|t| t.id == task.id) {
                    merged.push(task.clone());
                }
            }
        }

        self.tasks = merged
            .into_iter()
            .filter(|t| !matches!(self.pending.get(&t.id), Some(PendingOp::Delete)))
            .map(|mut t| {
                if let Some(PendingOp::Toggle { previous }) = self.pending.get(&t.id) {
                    t.completed = !previous;
                }
                t
            })
            .collect();

        // a later list is never issued before this one
        self.confirmed.retain(|_, c| c.at > issued);
    }

    fn replace(&mut self, task: &Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task.clone();
        }
    }

    fn upsert(&mut self, task: &Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task.clone(),
            None => self.tasks.push(task.clone()),
        }
    }
}

/// Task state of one view, synchronized with the remote API
pub struct TaskSync<G> {
    gateway: G,
    session: Arc<SessionStore>,
    state: Mutex<TaskState>,
}

impl<G: TaskGateway> TaskSync<G> {
    pub fn new(gateway: G, session: Arc<SessionStore>) -> Self {
        Self {
            gateway,
            session,
            state: Mutex::new(TaskState::default()),
        }
    }

    /// Copy of the current state for rendering
    pub fn state(&self) -> TaskState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dismiss_error(&self) {
        self.transition(TaskState::dismiss_error);
    }

    fn transition(&self, f: impl FnOnce(TaskState) -> TaskState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::take(&mut *state);
        *state = f(current);
    }

    /// Apply `intent` if it can start; false when it was refused
    fn begin(&self, intent: &TaskIntent) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.accepts(intent) {
            return false;
        }
        let current = std::mem::take(&mut *state);
        *state = current.apply(intent);
        true
    }

    async fn auth(&self) -> ApiResult<AuthContext> {
        self.session
            .auth_context()
            .await
            .ok_or_else(|| ClientError::Auth("Not authenticated".to_string()))
    }

    async fn settle(
        &self,
        intent: &TaskIntent,
        result: ApiResult<TaskOutcome>,
    ) -> ApiResult<TaskOutcome> {
        if let Err(e) = &result {
            warn!("Task operation {:?} failed: {}", intent, e);
            if e.is_auth() {
                self.session.invalidate().await;
            }
        }

        self.transition(|state| state.reconcile(intent, result.as_ref()));
        result
    }

    fn clock(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clock()
    }

    /// Fetch the full list for the current user
    pub async fn load(&self) -> ApiResult<()> {
        let auth = self.auth().await?;
        let intent = TaskIntent::Load {
            issued: self.clock(),
        };
        self.begin(&intent);

        let result = self.gateway.list_tasks(&auth).await.map(TaskOutcome::Listed);
        self.settle(&intent, result).await?;
        info!("Loaded tasks for user: {}", auth.user_id);
        Ok(())
    }

    /// Replace local state with the authoritative list
    pub async fn refresh(&self) -> ApiResult<()> {
        let auth = self.auth().await?;
        let intent = TaskIntent::Refresh {
            issued: self.clock(),
        };

        let result = self.gateway.list_tasks(&auth).await.map(TaskOutcome::Listed);
        self.settle(&intent, result).await.map(|_| ())
    }

    /// Create a task; nothing is added locally until the server answers
    pub async fn create(&self, title: &str, description: Option<&str>) -> ApiResult<Task> {
        let task = validate_new_task(title, description)?;
        let auth = self.auth().await?;
        let intent = TaskIntent::Create(task.clone());
        if !self.begin(&intent) {
            return Err(ClientError::Validation(
                "A task is already being added".to_string(),
            ));
        }

        let result = self
            .gateway
            .create_task(&auth, &task)
            .await
            .map(TaskOutcome::Created);

        match self.settle(&intent, result).await? {
            TaskOutcome::Created(task) => {
                info!("Created task: {}", task.id);
                Ok(task)
            }
            other => Err(ClientError::InvalidResponse(format!(
                "unexpected outcome {:?}",
                other
            ))),
        }
    }

    /// Replace title and description of task `id`
    pub async fn update(&self, id: i64, title: &str, description: Option<&str>) -> ApiResult<Task> {
        let changes = validate_task_update(title, description)?;
        let auth = self.auth().await?;
        let intent = TaskIntent::Update {
            id,
            changes: changes.clone(),
        };
        if !self.begin(&intent) {
            return Err(ClientError::Validation(
                "Task is not available for editing".to_string(),
            ));
        }

        let result = self
            .gateway
            .update_task(&auth, id, &changes)
            .await
            .map(TaskOutcome::Updated);

        match self.settle(&intent, result).await? {
            TaskOutcome::Updated(task) => Ok(task),
            other => Err(ClientError::InvalidResponse(format!(
                "unexpected outcome {:?}",
                other
            ))),
        }
    }

    /// Flip completion now, confirm with the server, then re-fetch the list
    ///
    /// On failure the flag is restored to its pre-toggle value.
    pub async fn toggle(&self, id: i64) -> ApiResult<()> {
        let auth = self.auth().await?;
        let intent = TaskIntent::Toggle { id };
        if !self.begin(&intent) {
            debug!("Ignoring toggle of unavailable task: {}", id);
            return Ok(());
        }

        let result = self
            .gateway
            .toggle_task(&auth, id)
            .await
            .map(TaskOutcome::Toggled);
        self.settle(&intent, result).await?;

        self.refresh().await
    }

    /// Remove the task now, then delete it on the server
    ///
    /// A failed delete is reported but the task stays removed locally.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let auth = self.auth().await?;
        let intent = TaskIntent::Delete { id };
        if !self.begin(&intent) {
            debug!("Ignoring delete of unavailable task: {}", id);
            return Ok(());
        }

        let result = self
            .gateway
            .delete_task(&auth, id)
            .await
            .map(|()| TaskOutcome::Deleted);
        self.settle(&intent, result).await?;
        info!("Deleted task: {}", id);
        Ok(())
    }
}
