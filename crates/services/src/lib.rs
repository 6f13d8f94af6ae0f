//! # services
//!
//! Request-level use cases. Every call takes the acting [`Principal`]
//! explicitly, loads the target entities through the store ports, runs the
//! guard, and only then mutates.

pub mod board_service;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod task_service;

use std::sync::Arc;

use domains::{Board, BoardId, BoardRepository, DomainError, Principal, Store, Task, TaskId, TaskRepository};

pub use board_service::{BoardDetail, BoardService, BoardView};
pub use error::{Result, ServiceError};
pub use guard::{AccessObserver, Guard, NoopObserver};
pub use lifecycle::{BoardLifecycle, Transition};
pub use task_service::{DeletedTask, TaskDetail, TaskService};

pub type SharedStore = Arc<dyn Store>;

/// All use cases over one store, sharing one guard.
#[derive(Clone)]
pub struct Services {
    pub boards: BoardService,
    pub lifecycle: BoardLifecycle,
    pub tasks: TaskService,
}

impl Services {
    pub fn new(store: SharedStore, observer: Arc<dyn AccessObserver>) -> Self {
        let guard = Guard::new(observer);
        Self {
            boards: BoardService::new(store.clone(), guard.clone()),
            lifecycle: BoardLifecycle::new(store.clone(), guard.clone()),
            tasks: TaskService::new(store, guard),
        }
    }

    /// Records the principal in the local directory so it can be offered
    /// as an assignee.
    pub async fn register_principal(&self, principal: &Principal) -> Result<()> {
        self.tasks.register_principal(principal).await
    }
}

pub(crate) async fn load_board(store: &dyn Store, id: BoardId) -> Result<Board> {
    store
        .get_board(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Board", id).into())
}

pub(crate) async fn load_task(store: &dyn Store, id: TaskId) -> Result<Task> {
    store
        .get_task(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Task", id).into())
}
