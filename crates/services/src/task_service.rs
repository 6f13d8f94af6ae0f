//! Task use cases. Editing and deleting require board-editor access on an
//! open board; viewing requires board visibility.

use domains::{
    BoardId, Capability, DomainError, NewTask, Principal, PrincipalDirectory, Task, TaskId,
    TaskRepository, TaskStatus, TaskUpdate,
};
use serde::Serialize;

use crate::error::{Result, ServiceError, DENIED_TASK_VIEW};
use crate::guard::Guard;
use crate::{load_board, load_task, SharedStore};

pub const TASK_UPDATED: &str = "Task updated successfully.";

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub board_title: String,
    pub board_archived: bool,
    /// Owner and allowed principals of the task's board.
    pub assignees: Vec<Principal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedTask {
    pub name: String,
    pub board_id: BoardId,
}

impl DeletedTask {
    pub fn message(&self) -> String {
        format!("Task {} has been deleted", self.name)
    }
}

#[derive(Clone)]
pub struct TaskService {
    store: SharedStore,
    guard: Guard,
}

impl TaskService {
    pub fn new(store: SharedStore, guard: Guard) -> Self {
        Self { store, guard }
    }

    pub(crate) async fn register_principal(&self, principal: &Principal) -> Result<()> {
        self.store.upsert_principal(principal).await?;
        Ok(())
    }

    /// Creates a task under an existing board; the principal becomes author.
    pub async fn create(&self, principal: &Principal, board_id: BoardId, input: NewTask) -> Result<Task> {
        let board = load_board(self.store.as_ref(), board_id).await?;
        let task = Task::new(board.id, principal.id, input)?;
        self.store.insert_task(&task).await?;
        tracing::info!(principal = %principal.id, board = %board_id, task = %task.id, "task created");
        Ok(task)
    }

    /// Task plus the principals it may be assigned to. A hidden task reads
    /// the same as a missing one.
    pub async fn view(&self, principal: &Principal, id: TaskId) -> Result<TaskDetail> {
        let task = load_task(self.store.as_ref(), id).await.map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::AuthorizationDenied(DENIED_TASK_VIEW.to_string()),
            other => other,
        })?;
        let board = load_board(self.store.as_ref(), task.board_id).await?;
        self.guard
            .require_task(principal, &task, &board, Capability::View)
            .map_err(|_| ServiceError::AuthorizationDenied(DENIED_TASK_VIEW.to_string()))?;

        let assignees = self.store.get_principals(&board.candidate_assignees()).await?;
        Ok(TaskDetail {
            task,
            board_title: board.title,
            board_archived: board.is_archived,
            assignees,
        })
    }

    /// Replaces name, description, status and assignee. The assignee must
    /// be the board owner or on its allowed list.
    pub async fn update(&self, principal: &Principal, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let mut task = load_task(self.store.as_ref(), id).await?;
        let board = load_board(self.store.as_ref(), task.board_id).await?;
        self.guard.require_task(principal, &task, &board, Capability::EditTask)?;

        if let Some(assignee) = update.assignee.principal() {
            if self.store.get_principal(assignee).await?.is_none() {
                return Err(DomainError::not_found("Principal", assignee).into());
            }
            if !board.candidate_assignees().contains(&assignee) {
                return Err(ServiceError::InvariantViolation(format!(
                    "principal {assignee} has no access to board {}",
                    board.id
                )));
            }
        }

        task.apply(update)?;
        self.store.update_task(&task).await?;
        tracing::info!(principal = %principal.id, task = %id, status = %task.status, "task updated");
        Ok(task)
    }

    pub async fn change_status(&self, principal: &Principal, id: TaskId, status: TaskStatus) -> Result<Task> {
        let mut task = load_task(self.store.as_ref(), id).await?;
        let board = load_board(self.store.as_ref(), task.board_id).await?;
        self.guard.require_task(principal, &task, &board, Capability::EditTask)?;

        if task.status != status {
            task.status = status;
            self.store.update_task(&task).await?;
        }
        tracing::info!(principal = %principal.id, task = %id, %status, "task status changed");
        Ok(task)
    }

    /// Archived boards reject deletion like any other task mutation.
    pub async fn delete(&self, principal: &Principal, id: TaskId) -> Result<DeletedTask> {
        let task = load_task(self.store.as_ref(), id).await?;
        let board = load_board(self.store.as_ref(), task.board_id).await?;
        self.guard.require_task(principal, &task, &board, Capability::DeleteTask)?;

        if !self.store.delete_task(id).await? {
            return Err(DomainError::not_found("Task", id).into());
        }
        tracing::info!(principal = %principal.id, task = %id, board = %board.id, "task deleted");
        Ok(DeletedTask {
            name: task.name,
            board_id: board.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ARCHIVED_TASK, DENIED_TASK_EDIT};
    use domains::{AssigneeChoice, Board, BoardRepository, NewBoard};
    use std::sync::Arc;
    use storage_adapters::memory::MemoryStore;

    struct Ctx {
        svc: TaskService,
        store: Arc<MemoryStore>,
        owner: Principal,
        member: Principal,
        stranger: Principal,
        board: Board,
        task: Task,
    }

    async fn ctx() -> Ctx {
        let store = Arc::new(MemoryStore::new());
        let svc = TaskService::new(store.clone(), Guard::default());
        let owner = Principal::new("owner");
        let member = Principal::new("member");
        let stranger = Principal::new("stranger");
        for p in [&owner, &member, &stranger] {
            store.upsert_principal(p).await.unwrap();
        }
        let board = Board::new(
            owner.id,
            NewBoard {
                title: Some("Sprint1".into()),
                ..NewBoard::default()
            },
        )
        .unwrap();
        store.insert_board(&board).await.unwrap();
        store.grant_access(board.id, member.id).await.unwrap();
        let board = store.get_board(board.id).await.unwrap().unwrap();

        let task = svc
            .create(
                &owner,
                board.id,
                NewTask {
                    name: Some("Fix bug".into()),
                    ..NewTask::default()
                },
            )
            .await
            .unwrap();

        Ctx {
            svc,
            store,
            owner,
            member,
            stranger,
            board,
            task,
        }
    }

    fn update(assignee: AssigneeChoice, status: TaskStatus) -> TaskUpdate {
        TaskUpdate {
            name: Some("updated task name".into()),
            assignee,
            status,
            description: Some("updated task description".into()),
        }
    }

    #[tokio::test]
    async fn created_task_starts_not_started() {
        let c = ctx().await;
        assert_eq!(c.task.status, TaskStatus::NotStarted);
        assert_eq!(c.task.author, c.owner.id);

        let done = c.svc.change_status(&c.owner, c.task.id, TaskStatus::Done).await.unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        let stored = c.store.get_task(c.task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn view_lists_owner_and_members_as_assignees() {
        let c = ctx().await;
        let detail = c.svc.view(&c.member, c.task.id).await.unwrap();
        let names: Vec<_> = detail.assignees.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["owner", "member"]);
        assert_eq!(detail.board_title, "Sprint1");

        assert_eq!(
            c.svc.view(&c.stranger, c.task.id).await.unwrap_err(),
            ServiceError::AuthorizationDenied(DENIED_TASK_VIEW.into())
        );
        assert!(c.svc.view(&Principal::superuser("root"), c.task.id).await.is_ok());
    }

    #[tokio::test]
    async fn member_updates_and_unassigns() {
        let c = ctx().await;
        let assigned = c
            .svc
            .update(&c.member, c.task.id, update(AssigneeChoice::Principal(c.member.id), TaskStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(assigned.assignee, Some(c.member.id));
        assert_eq!(assigned.name, "updated task name");

        c.svc
            .update(&c.owner, c.task.id, update(AssigneeChoice::Unassigned, TaskStatus::InProgress))
            .await
            .unwrap();
        let stored = c.store.get_task(c.task.id).await.unwrap().unwrap();
        assert_eq!(stored.assignee, None);
    }

    #[tokio::test]
    async fn assignee_must_have_board_access() {
        let c = ctx().await;
        let err = c
            .svc
            .update(&c.owner, c.task.id, update(AssigneeChoice::Principal(c.stranger.id), TaskStatus::Done))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));

        let err = c
            .svc
            .update(&c.owner, c.task.id, update(AssigneeChoice::Principal(domains::PrincipalId::new()), TaskStatus::Done))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn stranger_cannot_touch_tasks() {
        let c = ctx().await;
        let denied = ServiceError::AuthorizationDenied(DENIED_TASK_EDIT.into());
        assert_eq!(
            c.svc.update(&c.stranger, c.task.id, update(AssigneeChoice::Unassigned, TaskStatus::Done)).await.unwrap_err(),
            denied
        );
        assert_eq!(c.svc.delete(&c.stranger, c.task.id).await.unwrap_err(), denied);
        assert_eq!(c.svc.change_status(&c.stranger, c.task.id, TaskStatus::Done).await.unwrap_err(), denied);
    }

    #[tokio::test]
    async fn archived_board_rejects_every_task_mutation() {
        let c = ctx().await;
        c.store.close_board(c.board.id).await.unwrap();
        let archived = ServiceError::ArchivedConflict(ARCHIVED_TASK.into());

        for p in [&c.owner, &c.member] {
            assert_eq!(
                c.svc.update(p, c.task.id, update(AssigneeChoice::Unassigned, TaskStatus::NotStarted)).await.unwrap_err(),
                archived
            );
            assert_eq!(c.svc.change_status(p, c.task.id, TaskStatus::Blocked).await.unwrap_err(), archived);
            assert_eq!(c.svc.delete(p, c.task.id).await.unwrap_err(), archived);
        }
        let root = Principal::superuser("root");
        assert_eq!(c.svc.delete(&root, c.task.id).await.unwrap_err(), archived);

        let stored = c.store.get_task(c.task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Done);
        assert_eq!(stored.name, "Fix bug");
    }

    #[tokio::test]
    async fn delete_reports_name_and_board() {
        let c = ctx().await;
        let deleted = c.svc.delete(&c.member, c.task.id).await.unwrap();
        assert_eq!(deleted.board_id, c.board.id);
        assert_eq!(deleted.message(), "Task Fix bug has been deleted");
        assert!(c.store.get_task(c.task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_on_missing_board_is_not_found() {
        let c = ctx().await;
        let err = c
            .svc
            .create(&c.owner, BoardId::new(), NewTask { name: Some("x".into()), ..NewTask::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    /// Memory store whose task writes land just after a close of the
    /// task's board commits.
    struct CloseBeforeTaskWrite(MemoryStore);

    #[async_trait::async_trait]
    impl BoardRepository for CloseBeforeTaskWrite {
        async fn insert_board(&self, board: &Board) -> domains::Result<()> {
            self.0.insert_board(board).await
        }
        async fn get_board(&self, id: BoardId) -> domains::Result<Option<Board>> {
            self.0.get_board(id).await
        }
        async fn list_boards(&self, filter: domains::BoardFilter) -> domains::Result<Vec<Board>> {
            self.0.list_boards(filter).await
        }
        async fn update_board_details(&self, board: &Board) -> domains::Result<()> {
            self.0.update_board_details(board).await
        }
        async fn delete_board(&self, id: BoardId) -> domains::Result<bool> {
            self.0.delete_board(id).await
        }
        async fn grant_access(&self, board: BoardId, principal: domains::PrincipalId) -> domains::Result<bool> {
            self.0.grant_access(board, principal).await
        }
        async fn revoke_access(&self, board: BoardId, principal: domains::PrincipalId) -> domains::Result<bool> {
            self.0.revoke_access(board, principal).await
        }
        async fn close_board(&self, id: BoardId) -> domains::Result<domains::CloseOutcome> {
            self.0.close_board(id).await
        }
        async fn reopen_board(&self, id: BoardId) -> domains::Result<bool> {
            self.0.reopen_board(id).await
        }
    }

    #[async_trait::async_trait]
    impl TaskRepository for CloseBeforeTaskWrite {
        async fn insert_task(&self, task: &Task) -> domains::Result<()> {
            self.0.insert_task(task).await
        }
        async fn get_task(&self, id: TaskId) -> domains::Result<Option<Task>> {
            self.0.get_task(id).await
        }
        async fn list_tasks(&self, board: BoardId) -> domains::Result<Vec<Task>> {
            self.0.list_tasks(board).await
        }
        async fn update_task(&self, task: &Task) -> domains::Result<()> {
            self.0.close_board(task.board_id).await?;
            self.0.update_task(task).await
        }
        async fn delete_task(&self, id: TaskId) -> domains::Result<bool> {
            if let Some(task) = self.0.get_task(id).await? {
                self.0.close_board(task.board_id).await?;
            }
            self.0.delete_task(id).await
        }
    }

    #[async_trait::async_trait]
    impl PrincipalDirectory for CloseBeforeTaskWrite {
        async fn upsert_principal(&self, principal: &Principal) -> domains::Result<()> {
            self.0.upsert_principal(principal).await
        }
        async fn get_principal(&self, id: domains::PrincipalId) -> domains::Result<Option<Principal>> {
            self.0.get_principal(id).await
        }
        async fn get_principals(&self, ids: &[domains::PrincipalId]) -> domains::Result<Vec<Principal>> {
            self.0.get_principals(ids).await
        }
    }

    #[tokio::test]
    async fn close_landing_after_the_check_still_wins() {
        let store = Arc::new(CloseBeforeTaskWrite(MemoryStore::new()));
        let svc = TaskService::new(store.clone(), Guard::default());
        let owner = Principal::new("owner");
        store.upsert_principal(&owner).await.unwrap();
        let board = Board::new(
            owner.id,
            NewBoard {
                title: Some("Sprint1".into()),
                ..NewBoard::default()
            },
        )
        .unwrap();
        store.insert_board(&board).await.unwrap();
        let input = NewTask {
            name: Some("Fix bug".into()),
            ..NewTask::default()
        };
        let task = svc.create(&owner, board.id, input).await.unwrap();

        let err = svc.change_status(&owner, task.id, TaskStatus::InProgress).await.unwrap_err();
        assert_eq!(err, ServiceError::ArchivedConflict(ARCHIVED_TASK.to_string()));
        let err = svc
            .update(&owner, task.id, update(AssigneeChoice::Unassigned, TaskStatus::Blocked))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::ArchivedConflict(ARCHIVED_TASK.to_string()));
        assert!(store.get_board(board.id).await.unwrap().unwrap().is_archived);
        assert_eq!(store.get_task(task.id).await.unwrap().unwrap().status, TaskStatus::Done);
    }
}
