//! # In-memory store
//!
//! Arena-style: boards, tasks and principals live in maps keyed by id, and
//! tasks are additionally indexed by board so deleting a board removes its
//! tasks explicitly. One `RwLock` guards the whole arena, which makes every
//! multi-row write (close, cascade delete) atomic for concurrent readers.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use domains::lifecycle;
use domains::{
    Board, BoardFilter, BoardId, BoardRepository, CloseOutcome, DomainError, Principal,
    PrincipalDirectory, PrincipalId, Result, Task, TaskId, TaskRepository,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Arena {
    boards: HashMap<BoardId, Board>,
    tasks: HashMap<TaskId, Task>,
    tasks_by_board: HashMap<BoardId, BTreeSet<TaskId>>,
    principals: HashMap<PrincipalId, Principal>,
}

impl Arena {
    /// Task writes are refused while the owning board is archived.
    fn ensure_open(&self, board: BoardId) -> Result<()> {
        match self.boards.get(&board) {
            Some(b) if b.is_archived => Err(DomainError::BoardArchived(board.to_string())),
            _ => Ok(()),
        }
    }

    fn board_mut(&mut self, id: BoardId) -> Result<&mut Board> {
        self.boards
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Board", id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    arena: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(filter: &BoardFilter, board: &Board) -> bool {
    let visible = filter
        .visible_to
        .is_none_or(|p| board.is_owned_by(&p) || board.is_allowed(&p));
    visible && filter.archived.is_none_or(|a| board.is_archived == a)
}

#[async_trait]
impl BoardRepository for MemoryStore {
    async fn insert_board(&self, board: &Board) -> Result<()> {
        let mut arena = self.arena.write().await;
        if arena.boards.contains_key(&board.id) {
            return Err(DomainError::InvariantViolation(format!("board {} already exists", board.id)));
        }
        arena.boards.insert(board.id, board.clone());
        arena.tasks_by_board.entry(board.id).or_default();
        Ok(())
    }

    async fn get_board(&self, id: BoardId) -> Result<Option<Board>> {
        Ok(self.arena.read().await.boards.get(&id).cloned())
    }

    async fn list_boards(&self, filter: BoardFilter) -> Result<Vec<Board>> {
        let arena = self.arena.read().await;
        let mut boards: Vec<Board> = arena
            .boards
            .values()
            .filter(|b| matches(&filter, b))
            .cloned()
            .collect();
        boards.sort_by_key(|b| (b.created_at, b.id));
        Ok(boards)
    }

    async fn update_board_details(&self, board: &Board) -> Result<()> {
        let mut arena = self.arena.write().await;
        let stored = arena.board_mut(board.id)?;
        stored.title = board.title.clone();
        stored.description = board.description.clone();
        Ok(())
    }

    async fn delete_board(&self, id: BoardId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        if arena.boards.remove(&id).is_none() {
            return Ok(false);
        }
        let task_ids = arena.tasks_by_board.remove(&id).unwrap_or_default();
        for task_id in &task_ids {
            arena.tasks.remove(task_id);
        }
        tracing::debug!(board = %id, tasks = task_ids.len(), "board removed with its tasks");
        Ok(true)
    }

    async fn grant_access(&self, board: BoardId, principal: PrincipalId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(arena.board_mut(board)?.grant(principal))
    }

    async fn revoke_access(&self, board: BoardId, principal: PrincipalId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(arena.board_mut(board)?.revoke(&principal))
    }

    async fn close_board(&self, id: BoardId) -> Result<CloseOutcome> {
        let mut guard = self.arena.write().await;
        let arena = &mut *guard;
        let board = arena
            .boards
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Board", id))?;

        let ids = arena.tasks_by_board.get(&id).cloned().unwrap_or_default();
        let mut tasks: Vec<Task> = ids.iter().filter_map(|t| arena.tasks.get(t).cloned()).collect();
        let outcome = lifecycle::close(board, &mut tasks);
        for task in tasks {
            arena.tasks.insert(task.id, task);
        }
        Ok(outcome)
    }

    async fn reopen_board(&self, id: BoardId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(lifecycle::reopen(arena.board_mut(id)?))
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn insert_task(&self, task: &Task) -> Result<()> {
        let mut arena = self.arena.write().await;
        if !arena.boards.contains_key(&task.board_id) {
            return Err(DomainError::not_found("Board", task.board_id));
        }
        arena.tasks.insert(task.id, task.clone());
        arena.tasks_by_board.entry(task.board_id).or_default().insert(task.id);
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.arena.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, board: BoardId) -> Result<Vec<Task>> {
        let arena = self.arena.read().await;
        let mut tasks: Vec<Task> = arena
            .tasks_by_board
            .get(&board)
            .into_iter()
            .flatten()
            .filter_map(|id| arena.tasks.get(id).cloned())
            .collect();
        tasks.sort_by_key(|t| (t.created_at, t.id));
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut arena = self.arena.write().await;
        let board_id = arena
            .tasks
            .get(&task.id)
            .map(|t| t.board_id)
            .ok_or_else(|| DomainError::not_found("Task", task.id))?;
        if board_id != task.board_id {
            return Err(DomainError::InvariantViolation("a task cannot move between boards".into()));
        }
        arena.ensure_open(board_id)?;
        arena.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        let Some(board_id) = arena.tasks.get(&id).map(|t| t.board_id) else {
            return Ok(false);
        };
        arena.ensure_open(board_id)?;
        let Some(task) = arena.tasks.remove(&id) else {
            return Ok(false);
        };
        if let Some(index) = arena.tasks_by_board.get_mut(&task.board_id) {
            index.remove(&id);
        }
        Ok(true)
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryStore {
    async fn upsert_principal(&self, principal: &Principal) -> Result<()> {
        self.arena
            .write()
            .await
            .principals
            .insert(principal.id, principal.clone());
        Ok(())
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.arena.read().await.principals.get(&id).cloned())
    }

    async fn get_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>> {
        let arena = self.arena.read().await;
        Ok(ids.iter().filter_map(|id| arena.principals.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{NewBoard, NewTask, TaskStatus};

    fn board(owner: PrincipalId, title: &str) -> Board {
        Board::new(
            owner,
            NewBoard {
                title: Some(title.into()),
                ..NewBoard::default()
            },
        )
        .unwrap()
    }

    fn task(board: &Board, status: TaskStatus) -> Task {
        Task::new(
            board.id,
            board.owner,
            NewTask {
                name: Some("t".into()),
                status,
                ..NewTask::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn deleting_a_board_cascades_to_its_tasks_only() {
        let store = MemoryStore::new();
        let owner = PrincipalId::new();
        let doomed = board(owner, "doomed");
        let kept = board(owner, "kept");
        store.insert_board(&doomed).await.unwrap();
        store.insert_board(&kept).await.unwrap();
        let t1 = task(&doomed, TaskStatus::NotStarted);
        let t2 = task(&kept, TaskStatus::NotStarted);
        store.insert_task(&t1).await.unwrap();
        store.insert_task(&t2).await.unwrap();

        assert!(store.delete_board(doomed.id).await.unwrap());
        assert!(store.get_task(t1.id).await.unwrap().is_none());
        assert!(store.get_task(t2.id).await.unwrap().is_some());
        assert!(!store.delete_board(doomed.id).await.unwrap());
    }

    #[tokio::test]
    async fn filter_selects_owned_and_shared() {
        let store = MemoryStore::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();
        let mine = board(alice, "mine");
        let theirs = board(bob, "theirs");
        store.insert_board(&mine).await.unwrap();
        store.insert_board(&theirs).await.unwrap();

        let filter = BoardFilter {
            visible_to: Some(alice),
            archived: None,
        };
        assert_eq!(store.list_boards(filter).await.unwrap().len(), 1);
        store.grant_access(theirs.id, alice).await.unwrap();
        assert_eq!(store.list_boards(filter).await.unwrap().len(), 2);
        assert_eq!(store.list_boards(BoardFilter::default()).await.unwrap().len(), 2);

        store.close_board(theirs.id).await.unwrap();
        let archived = BoardFilter {
            visible_to: Some(alice),
            archived: Some(true),
        };
        let listed = store.list_boards(archived).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, theirs.id);
    }

    #[tokio::test]
    async fn close_is_atomic_and_idempotent() {
        let store = MemoryStore::new();
        let b = board(PrincipalId::new(), "b");
        store.insert_board(&b).await.unwrap();
        for status in [TaskStatus::Blocked, TaskStatus::Done, TaskStatus::InProgress] {
            store.insert_task(&task(&b, status)).await.unwrap();
        }

        let first = store.close_board(b.id).await.unwrap();
        assert_eq!(first.completed.len(), 2);
        let second = store.close_board(b.id).await.unwrap();
        assert!(second.completed.is_empty());
        assert!(second.was_archived);
        assert!(store
            .list_tasks(b.id)
            .await
            .unwrap()
            .iter()
            .all(|t| t.status == TaskStatus::Done));

        assert!(store.reopen_board(b.id).await.unwrap());
        assert!(!store.get_board(b.id).await.unwrap().unwrap().is_archived);
    }

    #[tokio::test]
    async fn task_writes_after_close_are_refused() {
        let store = MemoryStore::new();
        let b = board(PrincipalId::new(), "b");
        store.insert_board(&b).await.unwrap();
        let mut stale = task(&b, TaskStatus::NotStarted);
        store.insert_task(&stale).await.unwrap();

        store.close_board(b.id).await.unwrap();
        stale.status = TaskStatus::InProgress;
        let err = store.update_task(&stale).await.unwrap_err();
        assert!(matches!(err, DomainError::BoardArchived(_)));
        assert!(matches!(store.delete_task(stale.id).await, Err(DomainError::BoardArchived(_))));
        assert_eq!(store.get_task(stale.id).await.unwrap().unwrap().status, TaskStatus::Done);

        store.reopen_board(b.id).await.unwrap();
        store.update_task(&stale).await.unwrap();
        assert!(store.delete_task(stale.id).await.unwrap());
    }

    #[tokio::test]
    async fn task_on_unknown_board_is_rejected() {
        let store = MemoryStore::new();
        let b = board(PrincipalId::new(), "ghost");
        let err = store.insert_task(&task(&b, TaskStatus::NotStarted)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
