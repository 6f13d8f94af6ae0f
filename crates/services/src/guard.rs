//! Explicit guard calls made at the top of every use case.

use std::sync::Arc;

use domains::{decide, task_decision, Board, Capability, Decision, Principal, Task};

use crate::error::{ServiceError, ARCHIVED_TASK, DENIED_BOARD_ADMIN, DENIED_BOARD_VIEW, DENIED_TASK_EDIT};

/// Receives every access decision, e.g. for metrics.
pub trait AccessObserver: Send + Sync {
    fn record(&self, capability: Capability, decision: Decision);
}

/// Observer that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AccessObserver for NoopObserver {
    fn record(&self, _: Capability, _: Decision) {}
}

#[derive(Clone)]
pub struct Guard {
    observer: Arc<dyn AccessObserver>,
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}

impl Guard {
    pub fn new(observer: Arc<dyn AccessObserver>) -> Self {
        Self { observer }
    }

    /// Board-level check for `capability`.
    pub fn require(&self, principal: &Principal, board: &Board, capability: Capability) -> Result<(), ServiceError> {
        let decision = decide(principal, board, capability);
        self.finish(principal, capability, decision)
    }

    /// Task-level check. The task must belong to `board`.
    pub fn require_task(
        &self,
        principal: &Principal,
        task: &Task,
        board: &Board,
        capability: Capability,
    ) -> Result<(), ServiceError> {
        let decision = match capability {
            Capability::EditTask | Capability::DeleteTask => task_decision(principal, task, board),
            _ if task.board_id != board.id => Decision::Denied,
            _ => decide(principal, board, capability),
        };
        self.finish(principal, capability, decision)
    }

    fn finish(&self, principal: &Principal, capability: Capability, decision: Decision) -> Result<(), ServiceError> {
        self.observer.record(capability, decision);
        match decision {
            Decision::Allowed => Ok(()),
            Decision::Archived => {
                tracing::info!(principal = %principal.id, capability = capability.as_str(), "board archived");
                Err(ServiceError::ArchivedConflict(ARCHIVED_TASK.to_string()))
            }
            Decision::Denied => {
                tracing::info!(principal = %principal.id, capability = capability.as_str(), "access denied");
                Err(ServiceError::AuthorizationDenied(denied_message(capability).to_string()))
            }
        }
    }
}

fn denied_message(capability: Capability) -> &'static str {
    match capability {
        Capability::View => DENIED_BOARD_VIEW,
        Capability::EditTask | Capability::DeleteTask => DENIED_TASK_EDIT,
        Capability::ManageLifecycle | Capability::Administer => DENIED_BOARD_ADMIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{NewBoard, NewTask};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Capability, Decision)>>);

    impl AccessObserver for Recorder {
        fn record(&self, capability: Capability, decision: Decision) {
            self.0.lock().unwrap().push((capability, decision));
        }
    }

    #[test]
    fn every_check_is_observed() {
        let recorder = Arc::new(Recorder::default());
        let guard = Guard::new(recorder.clone());
        let owner = Principal::new("owner");
        let stranger = Principal::new("stranger");
        let mut board = Board::new(
            owner.id,
            NewBoard {
                title: Some("b".into()),
                ..NewBoard::default()
            },
        )
        .unwrap();
        let task = Task::new(
            board.id,
            owner.id,
            NewTask {
                name: Some("t".into()),
                ..NewTask::default()
            },
        )
        .unwrap();

        assert!(guard.require(&owner, &board, Capability::View).is_ok());
        assert_eq!(
            guard.require(&stranger, &board, Capability::Administer),
            Err(ServiceError::AuthorizationDenied(DENIED_BOARD_ADMIN.into()))
        );
        board.is_archived = true;
        assert_eq!(
            guard.require_task(&owner, &task, &board, Capability::EditTask),
            Err(ServiceError::ArchivedConflict(ARCHIVED_TASK.into()))
        );

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (Capability::View, Decision::Allowed),
                (Capability::Administer, Decision::Denied),
                (Capability::EditTask, Decision::Archived),
            ]
        );
    }
}
