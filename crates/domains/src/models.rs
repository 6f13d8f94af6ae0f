//! # Domain Models
//!
//! These structs represent the core entities of Taskboard.
//! Constructors enforce the entity invariants; the persistence layer
//! never sees a Board without a title or a Task without a name.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::ids::{BoardId, PrincipalId, TaskId};

pub const TITLE_MAX_LEN: usize = 150;
pub const BOARD_DESCRIPTION_MAX_LEN: usize = 200;

/// An authenticated actor, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    /// Bypasses every per-resource check.
    pub is_superuser: bool,
    /// Group memberships. Carried for the identity provider's benefit;
    /// board access is decided by ownership and the allowed list only.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(),
            username: username.into(),
            is_superuser: false,
            roles: BTreeSet::new(),
        }
    }

    pub fn superuser(username: impl Into<String>) -> Self {
        Self {
            is_superuser: true,
            ..Self::new(username)
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// A named collection of Tasks with an owner and an access list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub description: Option<String>,
    /// Set at creation; there is no ownership transfer.
    pub owner: PrincipalId,
    pub allowed_principals: BTreeSet<PrincipalId>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for board creation. `title` is optional here so an absent title
/// reaches the constructor and is rejected there.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBoard {
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_principals: BTreeSet<PrincipalId>,
}

/// Title/description edit of an existing board.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardPatch {
    #[serde(rename = "boardTitle")]
    pub title: Option<String>,
    #[serde(rename = "boardDescription", default)]
    pub description: Option<String>,
}

impl Board {
    /// Creates an open board owned by `owner`.
    pub fn new(owner: PrincipalId, input: NewBoard) -> Result<Self> {
        let title = validate_title("board title", input.title)?;
        let description = validate_description(input.description)?;
        let mut allowed = input.allowed_principals;
        allowed.remove(&owner);

        Ok(Self {
            id: BoardId::new(),
            title,
            description,
            owner,
            allowed_principals: allowed,
            is_archived: false,
            created_at: Utc::now(),
        })
    }

    pub fn is_owned_by(&self, principal: &PrincipalId) -> bool {
        self.owner == *principal
    }

    pub fn is_allowed(&self, principal: &PrincipalId) -> bool {
        self.allowed_principals.contains(principal)
    }

    /// Adds `principal` to the allowed list. Returns false when nothing
    /// changed (already allowed, or the owner).
    pub fn grant(&mut self, principal: PrincipalId) -> bool {
        if self.is_owned_by(&principal) {
            return false;
        }
        self.allowed_principals.insert(principal)
    }

    pub fn revoke(&mut self, principal: &PrincipalId) -> bool {
        self.allowed_principals.remove(principal)
    }

    /// Principals eligible as a task assignee: the owner first, then the
    /// allowed list.
    pub fn candidate_assignees(&self) -> Vec<PrincipalId> {
        std::iter::once(self.owner)
            .chain(self.allowed_principals.iter().copied())
            .collect()
    }

    pub fn apply(&mut self, patch: BoardPatch) -> Result<()> {
        self.title = validate_title("board title", patch.title)?;
        self.description = validate_description(patch.description)?;
        Ok(())
    }
}

/// Task progress. Legacy two-letter codes are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "NS")]
    NotStarted,
    #[serde(alias = "BL")]
    Blocked,
    #[serde(alias = "PR")]
    InProgress,
    #[serde(alias = "DN")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::Blocked,
        TaskStatus::InProgress,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Blocked => "blocked",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "not_started" | "NS" => Ok(TaskStatus::NotStarted),
            "blocked" | "BL" => Ok(TaskStatus::Blocked),
            "in_progress" | "PR" => Ok(TaskStatus::InProgress),
            "done" | "DN" => Ok(TaskStatus::Done),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

/// A unit of work belonging to exactly one Board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub board_id: BoardId,
    pub name: String,
    pub description: Option<String>,
    pub author: PrincipalId,
    pub assignee: Option<PrincipalId>,
    pub status: TaskStatus,
    pub high_priority: bool,
    pub due_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub high_priority: bool,
    #[serde(default)]
    pub due_to: Option<DateTime<Utc>>,
}

/// Assignee selector as sent by clients: `"unassigned"` or a principal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AssigneeChoice {
    Unassigned,
    Principal(PrincipalId),
}

impl TryFrom<String> for AssigneeChoice {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value.trim() == "unassigned" {
            return Ok(AssigneeChoice::Unassigned);
        }
        value
            .parse::<PrincipalId>()
            .map(AssigneeChoice::Principal)
            .map_err(|e| format!("invalid assignee '{value}': {e}"))
    }
}

impl AssigneeChoice {
    pub fn principal(&self) -> Option<PrincipalId> {
        match self {
            AssigneeChoice::Unassigned => None,
            AssigneeChoice::Principal(id) => Some(*id),
        }
    }
}

/// Full task edit, matching the task-update JSON payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskUpdate {
    #[serde(rename = "taskName")]
    pub name: Option<String>,
    #[serde(rename = "taskAssignee")]
    pub assignee: AssigneeChoice,
    #[serde(rename = "taskStatus")]
    pub status: TaskStatus,
    #[serde(rename = "taskDescription", default)]
    pub description: Option<String>,
}

impl Task {
    pub fn new(board_id: BoardId, author: PrincipalId, input: NewTask) -> Result<Self> {
        Ok(Self {
            id: TaskId::new(),
            board_id,
            name: validate_title("task name", input.name)?,
            description: input.description,
            author,
            assignee: None,
            status: input.status,
            high_priority: input.high_priority,
            due_to: input.due_to,
            created_at: Utc::now(),
        })
    }

    pub fn apply(&mut self, update: TaskUpdate) -> Result<()> {
        self.name = validate_title("task name", update.name)?;
        self.description = update.description;
        self.status = update.status;
        self.assignee = update.assignee.principal();
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

fn validate_title(what: &str, value: Option<String>) -> Result<String> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(DomainError::InvariantViolation(format!("{what} is required")));
    }
    if value.chars().count() > TITLE_MAX_LEN {
        return Err(DomainError::InvariantViolation(format!(
            "{what} must be at most {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(value)
}

fn validate_description(value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(d) if d.chars().count() > BOARD_DESCRIPTION_MAX_LEN => Err(
            DomainError::InvariantViolation(format!(
                "board description must be at most {BOARD_DESCRIPTION_MAX_LEN} characters"
            )),
        ),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_board(title: Option<&str>) -> NewBoard {
        NewBoard {
            title: title.map(str::to_string),
            ..NewBoard::default()
        }
    }

    #[test]
    fn board_without_title_is_rejected() {
        let owner = PrincipalId::new();
        for title in [None, Some(""), Some("   ")] {
            let err = Board::new(owner, new_board(title)).unwrap_err();
            assert!(matches!(err, DomainError::InvariantViolation(_)));
        }
    }

    #[test]
    fn new_board_is_open_and_owner_is_not_in_allowed_list() {
        let owner = PrincipalId::new();
        let other = PrincipalId::new();
        let board = Board::new(
            owner,
            NewBoard {
                title: Some("Sprint1".into()),
                description: None,
                allowed_principals: [owner, other].into_iter().collect(),
            },
        )
        .unwrap();

        assert!(!board.is_archived);
        assert!(board.is_owned_by(&owner));
        assert!(!board.is_allowed(&owner));
        assert!(board.is_allowed(&other));
    }

    #[test]
    fn granting_the_owner_is_a_no_op() {
        let owner = PrincipalId::new();
        let mut board = Board::new(owner, new_board(Some("b"))).unwrap();
        assert!(!board.grant(owner));
        assert!(board.allowed_principals.is_empty());

        let guest = PrincipalId::new();
        assert!(board.grant(guest));
        assert!(!board.grant(guest));
        assert_eq!(board.candidate_assignees(), vec![owner, guest]);
        assert!(board.revoke(&guest));
        assert_eq!(board.candidate_assignees(), vec![owner]);
    }

    #[test]
    fn task_defaults_to_not_started() {
        let task = Task::new(
            BoardId::new(),
            PrincipalId::new(),
            NewTask {
                name: Some("Fix bug".into()),
                ..NewTask::default()
            },
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert!(!task.high_priority);
        assert_eq!(task.assignee, None);
    }

    #[test]
    fn status_accepts_legacy_codes() {
        let status: TaskStatus = serde_json::from_str("\"DN\"").unwrap();
        assert_eq!(status, TaskStatus::Done);
        assert_eq!("PR".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(serde_json::to_string(&TaskStatus::Blocked).unwrap(), "\"blocked\"");
        assert!("XX".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn update_payload_clears_assignee_when_unassigned() {
        let mut task = Task::new(
            BoardId::new(),
            PrincipalId::new(),
            NewTask {
                name: Some("t".into()),
                ..NewTask::default()
            },
        )
        .unwrap();
        task.assignee = Some(PrincipalId::new());

        let update: TaskUpdate = serde_json::from_value(serde_json::json!({
            "taskName": "renamed",
            "taskAssignee": "unassigned",
            "taskStatus": "NS",
            "taskDescription": "d",
        }))
        .unwrap();
        task.apply(update).unwrap();

        assert_eq!(task.assignee, None);
        assert_eq!(task.name, "renamed");
        assert_eq!(task.description.as_deref(), Some("d"));
    }

    #[test]
    fn garbage_assignee_fails_to_deserialize() {
        let result: std::result::Result<TaskUpdate, _> = serde_json::from_value(serde_json::json!({
            "taskName": "x",
            "taskAssignee": "nobody",
            "taskStatus": "done",
        }));
        assert!(result.is_err());
    }
}
