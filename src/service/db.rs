use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use playground_common::{
    ConnectedIdea, Dimensions, Idea, IdeaFilters, IdeaPatch, IdeaRecord, NewIdea, TitleValidation,
};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::errors::PlaygroundError;

/// Async-safe handle to the idea store.
///
/// Wraps `IdeaStore` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`. Every store call is therefore
/// serialized within one server process.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<std::sync::Mutex<IdeaStore>>,
}

impl StoreHandle {
    pub fn new(store: IdeaStore) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(store)),
        }
    }

    /// Run a closure with access to the store on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&IdeaStore) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = store.lock().map_err(|_| PlaygroundError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("Store task panicked")?
    }

    /// Acquire the store mutex synchronously. For startup and tests only.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, IdeaStore>> {
        self.inner
            .lock()
            .map_err(|_| PlaygroundError::LockPoisoned.into())
    }
}

pub struct IdeaStore {
    conn: Connection,
}

const IDEA_COLUMNS: &str = "id, title, content, content_json, field, readiness, complexity, connected_idea, relation_strength, sub_ideas, sort_order, created_at, updated_at";

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl IdeaStore {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            PlaygroundError::Database(anyhow::Error::new(e).context("Failed to open SQLite database"))
        })?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PlaygroundError::Database(
                anyhow::Error::new(e).context("Failed to open in-memory SQLite database"),
            )
        })?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS ideas (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    content_json TEXT,
                    field TEXT NOT NULL DEFAULT '',
                    readiness INTEGER NOT NULL,
                    complexity INTEGER NOT NULL,
                    connected_idea TEXT,
                    relation_strength REAL,
                    sub_ideas TEXT NOT NULL DEFAULT '[]',
                    sort_order INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS config (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                );

                CREATE INDEX IF NOT EXISTS idx_ideas_order ON ideas(sort_order);
                CREATE INDEX IF NOT EXISTS idx_ideas_title ON ideas(title);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Idea reads ────────────────────────────────────────────────────

    /// All ideas matching `filters`, ascending by `order`.
    pub fn list_ideas(&self, filters: &IdeaFilters) -> Result<Vec<IdeaRecord>> {
        let sql = format!(
            "SELECT {IDEA_COLUMNS} FROM ideas
             WHERE (?1 IS NULL OR field = ?1)
               AND (?2 IS NULL OR readiness = ?2)
               AND (?3 IS NULL OR complexity = ?3)
             ORDER BY sort_order, id"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_ideas")?;
        let rows = stmt
            .query_map(
                params![filters.field, filters.readiness, filters.complexity],
                IdeaRow::from_row,
            )
            .context("Failed to query ideas")?;
        let mut ideas = Vec::new();
        for row in rows {
            let r = row.context("Failed to read idea row")?;
            ideas.push(r.into_record()?);
        }
        Ok(ideas)
    }

    pub fn get_idea(&self, id: &str) -> Result<Option<IdeaRecord>> {
        let sql = format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], IdeaRow::from_row)
            .optional()
            .context("Failed to query idea")?;
        row.map(IdeaRow::into_record).transpose()
    }

    fn find_title_owner(&self, title: &str, exclude_id: Option<&str>) -> Result<Option<(String, String)>> {
        self.conn
            .query_row(
                "SELECT id, title FROM ideas WHERE title = ?1 AND (?2 IS NULL OR id != ?2) ORDER BY sort_order LIMIT 1",
                params![title, exclude_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to look up title")
    }

    // ── Idea writes ───────────────────────────────────────────────────

    /// Insert a new idea with `order` one past the current maximum across
    /// all ideas. Title check, order read and insert share a transaction.
    pub fn create_idea(&self, new: NewIdea) -> Result<IdeaRecord> {
        if new.title.trim().is_empty() || new.content.trim().is_empty() {
            return Err(PlaygroundError::InvalidInput("Title and content are required".into()).into());
        }

        // Safety: StoreHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        if self.find_title_owner(&new.title, None)?.is_some() {
            return Err(PlaygroundError::DuplicateTitle { title: new.title }.into());
        }

        let max_order: i64 = tx
            .query_row("SELECT COALESCE(MAX(sort_order), 0) FROM ideas", [], |row| {
                row.get(0)
            })
            .context("Failed to get max order")?;

        let now = now_timestamp();
        let record = IdeaRecord {
            id: uuid::Uuid::new_v4().to_string(),
            idea: Idea {
                title: new.title,
                content: new.content,
                content_json: new.content_json,
                dimensions: new.dimensions,
                sub_ideas: new.sub_ideas,
                order: max_order + 1,
                created_at: now.clone(),
                updated_at: now,
            },
        };

        let row = IdeaRow::from_record(&record)?;
        tx.execute(
            &format!(
                "INSERT INTO ideas ({IDEA_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                row.id,
                row.title,
                row.content,
                row.content_json,
                row.field,
                row.readiness,
                row.complexity,
                row.connected_idea,
                row.relation_strength,
                row.sub_ideas,
                row.sort_order,
                row.created_at,
                row.updated_at,
            ],
        )
        .context("Failed to insert idea")?;
        tx.commit().context("Failed to commit idea insert")?;

        Ok(record)
    }

    /// Merge `patch` into an existing idea and refresh `updatedAt`. `order`
    /// only changes when the patch carries it.
    pub fn update_idea(&self, id: &str, patch: IdeaPatch) -> Result<IdeaRecord> {
        let mut record = self
            .get_idea(id)?
            .ok_or_else(|| PlaygroundError::NotFound { id: id.to_string() })?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(PlaygroundError::InvalidInput("Title cannot be empty".into()).into());
            }
            if self.find_title_owner(title, Some(id))?.is_some() {
                return Err(PlaygroundError::DuplicateTitle {
                    title: title.clone(),
                }
                .into());
            }
        }

        record.idea.apply_patch(&patch);
        record.idea.updated_at = now_timestamp();

        let row = IdeaRow::from_record(&record)?;
        self.conn
            .execute(
                "UPDATE ideas SET title = ?1, content = ?2, content_json = ?3, field = ?4, readiness = ?5,
                    complexity = ?6, connected_idea = ?7, relation_strength = ?8, sub_ideas = ?9,
                    sort_order = ?10, updated_at = ?11
                 WHERE id = ?12",
                params![
                    row.title,
                    row.content,
                    row.content_json,
                    row.field,
                    row.readiness,
                    row.complexity,
                    row.connected_idea,
                    row.relation_strength,
                    row.sub_ideas,
                    row.sort_order,
                    row.updated_at,
                    row.id,
                ],
            )
            .context("Failed to update idea")?;

        Ok(record)
    }

    /// Remove an idea. Links from other ideas are left dangling.
    pub fn delete_idea(&self, id: &str) -> Result<()> {
        let count = self
            .conn
            .execute("DELETE FROM ideas WHERE id = ?1", params![id])
            .context("Failed to delete idea")?;
        if count == 0 {
            return Err(PlaygroundError::NotFound { id: id.to_string() }.into());
        }
        Ok(())
    }

    /// Set `order = position + 1` for each id, all or nothing. An unknown id
    /// aborts the batch before commit.
    pub fn reorder_ideas(&self, ids: &[String]) -> Result<usize> {
        let mut seen = HashSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(PlaygroundError::InvalidInput(format!(
                "Duplicate id in reorder list: {}",
                dup
            ))
            .into());
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let now = now_timestamp();
        for (index, id) in ids.iter().enumerate() {
            let count = tx
                .execute(
                    "UPDATE ideas SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                    params![index as i64 + 1, now, id],
                )
                .context("Failed to update idea order")?;
            if count == 0 {
                // Dropping `tx` rolls back the writes made so far.
                return Err(PlaygroundError::NotFound { id: id.clone() }.into());
            }
        }
        tx.commit().context("Failed to commit reorder batch")?;
        Ok(ids.len())
    }

    pub fn validate_title(&self, title: &str, exclude_id: Option<&str>) -> Result<TitleValidation> {
        if title.is_empty() {
            return Err(PlaygroundError::InvalidInput("Title is required".into()).into());
        }
        Ok(match self.find_title_owner(title, exclude_id)? {
            Some((id, title)) => TitleValidation::conflict(id, title),
            None => TitleValidation::valid(),
        })
    }

    // ── Config documents ──────────────────────────────────────────────

    pub fn get_config(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query config")?;
        raw.map(|s| serde_json::from_str(&s).context("Failed to parse config document"))
            .transpose()
    }

    pub fn set_config(&self, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value).context("Failed to serialize config document")?;
        self.conn
            .execute(
                "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, raw, now_timestamp()],
            )
            .context("Failed to upsert config")?;
        Ok(())
    }
}

// ── Internal row helpers ──────────────────────────────────────────────

/// Flat row of the `ideas` table, before JSON columns and the connection
/// pair are folded back into typed values.
struct IdeaRow {
    id: String,
    title: String,
    content: String,
    content_json: Option<String>,
    field: String,
    readiness: i64,
    complexity: i64,
    connected_idea: Option<String>,
    relation_strength: Option<f64>,
    sub_ideas: String,
    sort_order: i64,
    created_at: String,
    updated_at: String,
}

impl IdeaRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            content_json: row.get(3)?,
            field: row.get(4)?,
            readiness: row.get(5)?,
            complexity: row.get(6)?,
            connected_idea: row.get(7)?,
            relation_strength: row.get(8)?,
            sub_ideas: row.get(9)?,
            sort_order: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn from_record(record: &IdeaRecord) -> Result<Self> {
        let idea = &record.idea;
        let content_json = idea
            .content_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize content_json")?;
        let sub_ideas =
            serde_json::to_string(&idea.sub_ideas).context("Failed to serialize sub_ideas")?;
        let (connected_idea, relation_strength) = match &idea.dimensions.potentially_connected_idea {
            Some(link) => (Some(link.idea.clone()), Some(link.relation_strength)),
            None => (None, None),
        };
        Ok(Self {
            id: record.id.clone(),
            title: idea.title.clone(),
            content: idea.content.clone(),
            content_json,
            field: idea.dimensions.field.clone(),
            readiness: idea.dimensions.readiness,
            complexity: idea.dimensions.complexity,
            connected_idea,
            relation_strength,
            sub_ideas,
            sort_order: idea.order,
            created_at: idea.created_at.clone(),
            updated_at: idea.updated_at.clone(),
        })
    }

    fn into_record(self) -> Result<IdeaRecord> {
        let content_json = self
            .content_json
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("Failed to parse content_json")?;
        let sub_ideas: Vec<String> =
            serde_json::from_str(&self.sub_ideas).context("Failed to parse sub_ideas JSON")?;
        let potentially_connected_idea = match (self.connected_idea, self.relation_strength) {
            (Some(idea), Some(relation_strength)) => Some(ConnectedIdea {
                idea,
                relation_strength,
            }),
            _ => None,
        };

        Ok(IdeaRecord {
            id: self.id,
            idea: Idea {
                title: self.title,
                content: self.content,
                content_json,
                dimensions: Dimensions {
                    field: self.field,
                    readiness: self.readiness,
                    complexity: self.complexity,
                    potentially_connected_idea,
                },
                sub_ideas,
                order: self.sort_order,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
