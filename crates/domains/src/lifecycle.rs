//! Board lifecycle: `Open` <-> `Archived`.
//!
//! Closing forces every task of the board to `done`; reopening only clears
//! the archived flag. Prior statuses are not restored.

use serde::Serialize;

use crate::ids::TaskId;
use crate::models::{Board, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardState {
    Open,
    Archived,
}

impl Board {
    pub fn state(&self) -> BoardState {
        if self.is_archived {
            BoardState::Archived
        } else {
            BoardState::Open
        }
    }
}

/// What a close transition changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloseOutcome {
    /// Tasks moved to `done` by this transition.
    pub completed: Vec<TaskId>,
    pub was_archived: bool,
}

/// Applies the close transition in memory. Tasks of other boards are left
/// alone. Idempotent: a second call completes nothing.
pub fn close(board: &mut Board, tasks: &mut [Task]) -> CloseOutcome {
    let completed = tasks
        .iter_mut()
        .filter(|t| t.board_id == board.id && !t.is_done())
        .map(|t| {
            t.status = TaskStatus::Done;
            t.id
        })
        .collect();

    let was_archived = board.is_archived;
    board.is_archived = true;
    CloseOutcome {
        completed,
        was_archived,
    }
}

/// Returns true when the board was archived before the call.
pub fn reopen(board: &mut Board) -> bool {
    std::mem::replace(&mut board.is_archived, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BoardId, PrincipalId};
    use crate::models::{NewBoard, NewTask};

    fn board_with_tasks(statuses: &[TaskStatus]) -> (Board, Vec<Task>) {
        let owner = PrincipalId::new();
        let board = Board::new(
            owner,
            NewBoard {
                title: Some("b".into()),
                ..NewBoard::default()
            },
        )
        .unwrap();
        let tasks = statuses
            .iter()
            .map(|s| {
                Task::new(
                    board.id,
                    owner,
                    NewTask {
                        name: Some("t".into()),
                        status: *s,
                        ..NewTask::default()
                    },
                )
                .unwrap()
            })
            .collect();
        (board, tasks)
    }

    #[test]
    fn close_completes_all_tasks_and_archives() {
        let (mut board, mut tasks) = board_with_tasks(&[
            TaskStatus::NotStarted,
            TaskStatus::Blocked,
            TaskStatus::Done,
        ]);
        let outcome = close(&mut board, &mut tasks);

        assert_eq!(board.state(), BoardState::Archived);
        assert!(tasks.iter().all(Task::is_done));
        assert_eq!(outcome.completed, vec![tasks[0].id, tasks[1].id]);
        assert!(!outcome.was_archived);
    }

    #[test]
    fn close_twice_equals_close_once() {
        let (mut board, mut tasks) = board_with_tasks(&[TaskStatus::InProgress]);
        close(&mut board, &mut tasks);
        let snapshot = (board.clone(), tasks.clone());

        let second = close(&mut board, &mut tasks);
        assert!(second.completed.is_empty());
        assert!(second.was_archived);
        assert_eq!((board, tasks), snapshot);
    }

    #[test]
    fn close_ignores_tasks_of_other_boards() {
        let (mut board, mut tasks) = board_with_tasks(&[TaskStatus::Blocked]);
        tasks[0].board_id = BoardId::new();
        close(&mut board, &mut tasks);
        assert_eq!(tasks[0].status, TaskStatus::Blocked);
    }

    #[test]
    fn reopen_does_not_restore_statuses() {
        let (mut board, mut tasks) = board_with_tasks(&[TaskStatus::Blocked]);
        close(&mut board, &mut tasks);
        assert!(reopen(&mut board));
        assert_eq!(board.state(), BoardState::Open);
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert!(!reopen(&mut board));
    }
}
