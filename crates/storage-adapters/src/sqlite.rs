//! # SQLite store
//!
//! Maps the relational model onto the domain entities. Ids are stored as
//! hyphenated UUID text. Multi-row writes (close, cascade delete, board
//! creation with its allowed list) run inside one transaction.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use domains::{
    Board, BoardFilter, BoardId, BoardRepository, CloseOutcome, DomainError, Principal,
    PrincipalDirectory, PrincipalId, Result, Task, TaskId, TaskRepository, TaskStatus,
};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const BOARD_COLUMNS: &str = "b.id, b.title, b.description, b.owner_id, b.is_archived, b.created_at, \
     (SELECT group_concat(m.principal_id) FROM board_members m WHERE m.board_id = b.id) AS members";

/// Appended to task writes so a close committed after the caller's access
/// check still wins.
const BOARD_IS_OPEN: &str =
    "EXISTS (SELECT 1 FROM boards b WHERE b.id = tasks.board_id AND b.is_archived = 0)";

const TASK_COLUMNS: &str =
    "id, board_id, name, description, author_id, assignee_id, status, high_priority, due_to, created_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and runs migrations.
    pub async fn open(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;
        tracing::info!(url, "sqlite store ready");
        Ok(Self { pool })
    }

    /// Private database per store; a single connection keeps it alive.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        Self::open("sqlite::memory:", 1).await
    }
}

fn backend(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.kind(), ErrorKind::CheckViolation | ErrorKind::NotNullViolation) {
            return DomainError::InvariantViolation(db.message().to_string());
        }
    }
    tracing::error!(error = %err, "sqlite error");
    DomainError::Storage(err.to_string())
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| DomainError::Storage(format!("corrupt id '{raw}': {e}")))
}

fn row_to_board(row: &SqliteRow) -> Result<Board> {
    let members: Option<String> = row.try_get("members").map_err(backend)?;
    let allowed_principals = members
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_uuid(s).map(PrincipalId))
        .collect::<Result<BTreeSet<_>>>()?;

    Ok(Board {
        id: BoardId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        title: row.try_get("title").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        owner: PrincipalId(parse_uuid(&row.try_get::<String, _>("owner_id").map_err(backend)?)?),
        allowed_principals,
        is_archived: row.try_get("is_archived").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    let assignee: Option<String> = row.try_get("assignee_id").map_err(backend)?;
    let status: String = row.try_get("status").map_err(backend)?;

    Ok(Task {
        id: TaskId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        board_id: BoardId(parse_uuid(&row.try_get::<String, _>("board_id").map_err(backend)?)?),
        name: row.try_get("name").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        author: PrincipalId(parse_uuid(&row.try_get::<String, _>("author_id").map_err(backend)?)?),
        assignee: assignee.as_deref().map(parse_uuid).transpose()?.map(PrincipalId),
        status: status.parse::<TaskStatus>()?,
        high_priority: row.try_get("high_priority").map_err(backend)?,
        due_to: row.try_get("due_to").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

fn row_to_principal(row: &SqliteRow) -> Result<Principal> {
    let roles: String = row.try_get("roles").map_err(backend)?;
    Ok(Principal {
        id: PrincipalId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        username: row.try_get("username").map_err(backend)?,
        is_superuser: row.try_get("is_superuser").map_err(backend)?,
        roles: serde_json::from_str(&roles).map_err(|e| DomainError::Storage(e.to_string()))?,
    })
}

#[async_trait]
impl BoardRepository for SqliteStore {
    async fn insert_board(&self, board: &Board) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO boards (id, title, description, owner_id, is_archived, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(board.id.to_string())
        .bind(&board.title)
        .bind(&board.description)
        .bind(board.owner.to_string())
        .bind(board.is_archived)
        .bind(board.created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for member in &board.allowed_principals {
            sqlx::query("INSERT OR IGNORE INTO board_members (board_id, principal_id) VALUES (?, ?)")
                .bind(board.id.to_string())
                .bind(member.to_string())
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }

    async fn get_board(&self, id: BoardId) -> Result<Option<Board>> {
        let row = sqlx::query(&format!("SELECT {BOARD_COLUMNS} FROM boards b WHERE b.id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(row_to_board).transpose()
    }

    async fn list_boards(&self, filter: BoardFilter) -> Result<Vec<Board>> {
        let sql = format!(
            "SELECT {BOARD_COLUMNS} FROM boards b \
             WHERE (?1 IS NULL OR b.owner_id = ?1 \
                    OR EXISTS (SELECT 1 FROM board_members m WHERE m.board_id = b.id AND m.principal_id = ?1)) \
               AND (?2 IS NULL OR b.is_archived = ?2) \
             ORDER BY b.created_at, b.id"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.visible_to.map(|p| p.to_string()))
            .bind(filter.archived)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_board).collect()
    }

    async fn update_board_details(&self, board: &Board) -> Result<()> {
        let done = sqlx::query("UPDATE boards SET title = ?, description = ? WHERE id = ?")
            .bind(&board.title)
            .bind(&board.description)
            .bind(board.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("Board", board.id));
        }
        Ok(())
    }

    /// Tasks and memberships are removed explicitly, in the same transaction.
    async fn delete_board(&self, id: BoardId) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let key = id.to_string();

        let tasks = sqlx::query("DELETE FROM tasks WHERE board_id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM board_members WHERE board_id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        let boards = sqlx::query("DELETE FROM boards WHERE id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        tracing::debug!(board = %id, tasks = tasks.rows_affected(), "board removed with its tasks");
        Ok(boards.rows_affected() > 0)
    }

    async fn grant_access(&self, board: BoardId, principal: PrincipalId) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let owner: Option<String> = sqlx::query_scalar("SELECT owner_id FROM boards WHERE id = ?")
            .bind(board.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let owner = owner.ok_or_else(|| DomainError::not_found("Board", board))?;
        if owner == principal.to_string() {
            return Ok(false);
        }

        let done = sqlx::query("INSERT OR IGNORE INTO board_members (board_id, principal_id) VALUES (?, ?)")
            .bind(board.to_string())
            .bind(principal.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(done.rows_affected() > 0)
    }

    async fn revoke_access(&self, board: BoardId, principal: PrincipalId) -> Result<bool> {
        if self.get_board(board).await?.is_none() {
            return Err(DomainError::not_found("Board", board));
        }
        let done = sqlx::query("DELETE FROM board_members WHERE board_id = ? AND principal_id = ?")
            .bind(board.to_string())
            .bind(principal.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(done.rows_affected() > 0)
    }

    async fn close_board(&self, id: BoardId) -> Result<CloseOutcome> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(backend)?;
        let key = id.to_string();

        let was_archived: Option<bool> = sqlx::query_scalar("SELECT is_archived FROM boards WHERE id = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let was_archived = was_archived.ok_or_else(|| DomainError::not_found("Board", id))?;

        let pending: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE board_id = ? AND status <> 'done' ORDER BY created_at, id",
        )
        .bind(&key)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query("UPDATE tasks SET status = 'done' WHERE board_id = ? AND status <> 'done'")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("UPDATE boards SET is_archived = 1 WHERE id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        let completed = pending
            .iter()
            .map(|raw| parse_uuid(raw).map(TaskId))
            .collect::<Result<Vec<_>>>()?;
        Ok(CloseOutcome {
            completed,
            was_archived,
        })
    }

    async fn reopen_board(&self, id: BoardId) -> Result<bool> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(backend)?;
        let was_archived: Option<bool> = sqlx::query_scalar("SELECT is_archived FROM boards WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let was_archived = was_archived.ok_or_else(|| DomainError::not_found("Board", id))?;

        sqlx::query("UPDATE boards SET is_archived = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(was_archived)
    }
}

#[async_trait]
impl TaskRepository for SqliteStore {
    async fn insert_task(&self, task: &Task) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM boards WHERE id = ?")
            .bind(task.board_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        if exists.is_none() {
            return Err(DomainError::not_found("Board", task.board_id));
        }

        sqlx::query(&format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(task.id.to_string())
        .bind(task.board_id.to_string())
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.author.to_string())
        .bind(task.assignee.map(|a| a.to_string()))
        .bind(task.status.as_str())
        .bind(task.high_priority)
        .bind(task.due_to)
        .bind(task.created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn list_tasks(&self, board: BoardId) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE board_id = ? ORDER BY created_at, id"
        ))
        .bind(board.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(row_to_task).collect()
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let done = sqlx::query(&format!(
            "UPDATE tasks SET name = ?, description = ?, assignee_id = ?, status = ?, high_priority = ?, due_to = ? \
             WHERE id = ? AND board_id = ? AND {BOARD_IS_OPEN}"
        ))
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.assignee.map(|a| a.to_string()))
        .bind(task.status.as_str())
        .bind(task.high_priority)
        .bind(task.due_to)
        .bind(task.id.to_string())
        .bind(task.board_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if done.rows_affected() == 0 {
            return Err(match self.archived_board_of(task.id).await? {
                Some(board) => DomainError::BoardArchived(board.to_string()),
                None => DomainError::not_found("Task", task.id),
            });
        }
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let done = sqlx::query(&format!("DELETE FROM tasks WHERE id = ? AND {BOARD_IS_OPEN}"))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if done.rows_affected() > 0 {
            return Ok(true);
        }
        match self.archived_board_of(id).await? {
            Some(board) => Err(DomainError::BoardArchived(board.to_string())),
            None => Ok(false),
        }
    }
}

impl SqliteStore {
    /// The task's board, if the task exists and that board is archived.
    async fn archived_board_of(&self, task: TaskId) -> Result<Option<BoardId>> {
        let board: Option<String> = sqlx::query_scalar(
            "SELECT b.id FROM tasks t JOIN boards b ON b.id = t.board_id WHERE t.id = ? AND b.is_archived = 1",
        )
        .bind(task.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        board.as_deref().map(|raw| parse_uuid(raw).map(BoardId)).transpose()
    }
}

#[async_trait]
impl PrincipalDirectory for SqliteStore {
    async fn upsert_principal(&self, principal: &Principal) -> Result<()> {
        let roles = serde_json::to_string(&principal.roles).map_err(|e| DomainError::Storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO principals (id, username, is_superuser, roles) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET username = excluded.username, \
                 is_superuser = excluded.is_superuser, roles = excluded.roles",
        )
        .bind(principal.id.to_string())
        .bind(&principal.username)
        .bind(principal.is_superuser)
        .bind(roles)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        let row = sqlx::query("SELECT id, username, is_superuser, roles FROM principals WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(row_to_principal).transpose()
    }

    async fn get_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, username, is_superuser, roles FROM principals WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;

        let by_id = rows
            .iter()
            .map(|row| row_to_principal(row).map(|p| (p.id, p)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }
}
