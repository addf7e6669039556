use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{
    datastore::{DataStore, NoteOrder, NoteQuery},
    Note, Workspace,
};

static MIGRATOR: Migrator = sqlx::migrate!();

const NOTE_COLUMNS: &str = "id, user_id, workspace_id, title, content, created_at, updated_at";
const WORKSPACE_COLUMNS: &str = "id, user_id, name, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pub pool: PgPool,
}

impl PgDataStore {
    /// Establish connection to database and create the notes and workspaces
    /// tables if not exists
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgDataStore { pool })
    }
}

fn order_clause(order_by: NoteOrder, descending: bool) -> &'static str {
    match (order_by, descending) {
        (NoteOrder::UpdatedAt, true) => "ORDER BY updated_at DESC",
        (NoteOrder::UpdatedAt, false) => "ORDER BY updated_at ASC",
        (NoteOrder::CreatedAt, true) => "ORDER BY created_at DESC",
        (NoteOrder::CreatedAt, false) => "ORDER BY created_at ASC",
        (NoteOrder::Title, true) => "ORDER BY title DESC",
        (NoteOrder::Title, false) => "ORDER BY title ASC",
    }
}

impl DataStore for PgDataStore {
    async fn insert_note(&self, note: &Note) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notes (id, user_id, workspace_id, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&note.id)
        .bind(&note.user_id)
        .bind(&note.workspace_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            tracing::error!(error = ?err, note_id = %note.id, "Failed to insert note")
        })
        .context("Failed to insert note")?;

        Ok(())
    }

    async fn get_note(&self, id: &str) -> anyhow::Result<Option<Note>> {
        sqlx::query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|err| tracing::error!(error = ?err, note_id = %id, "Failed to fetch note"))
            .context("Failed to fetch note")
    }

    async fn update_note(&self, note: &Note) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE notes
            SET workspace_id = $2, title = $3, content = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(&note.id)
        .bind(&note.workspace_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            tracing::error!(error = ?err, note_id = %note.id, "Failed to update note")
        })
        .context("Failed to update note")?;

        Ok(())
    }

    async fn delete_note(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|err| tracing::error!(error = ?err, note_id = %id, "Failed to delete note"))
            .context("Failed to delete note")?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_notes(&self, query: &NoteQuery) -> anyhow::Result<Vec<Note>> {
        let order = order_clause(query.order_by, query.descending);
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let notes = match &query.workspace_id {
            Some(workspace_id) => {
                sqlx::query_as::<_, Note>(&format!(
                    "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 AND workspace_id = $2 {order} LIMIT $3"
                ))
                .bind(&query.user_id)
                .bind(workspace_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Note>(&format!(
                    "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 {order} LIMIT $2"
                ))
                .bind(&query.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .inspect_err(|err| tracing::error!(error = ?err, "Failed to query notes"))
        .context("Failed to query notes")?;

        Ok(notes)
    }

    async fn insert_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workspaces (id, user_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&workspace.id)
        .bind(&workspace.user_id)
        .bind(&workspace.name)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            tracing::error!(error = ?err, workspace_id = %workspace.id, "Failed to insert workspace")
        })
        .context("Failed to insert workspace")?;

        Ok(())
    }

    async fn get_workspace(&self, id: &str) -> anyhow::Result<Option<Workspace>> {
        sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| tracing::error!(error = ?err, workspace_id = %id, "Failed to fetch workspace"))
        .context("Failed to fetch workspace")
    }

    async fn update_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        sqlx::query("UPDATE workspaces SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(&workspace.id)
            .bind(&workspace.name)
            .bind(workspace.updated_at)
            .execute(&self.pool)
            .await
            .inspect_err(|err| {
                tracing::error!(error = ?err, workspace_id = %workspace.id, "Failed to update workspace")
            })
            .context("Failed to update workspace")?;

        Ok(())
    }

    async fn delete_workspace(&self, id: &str) -> anyhow::Result<bool> {
        // notes.workspace_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|err| {
                tracing::error!(error = ?err, workspace_id = %id, "Failed to delete workspace")
            })
            .context("Failed to delete workspace")?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_workspaces(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<Workspace>> {
        sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE user_id = $1 ORDER BY updated_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .inspect_err(|err| tracing::error!(error = ?err, "Failed to query workspaces"))
        .context("Failed to query workspaces")
    }
}
