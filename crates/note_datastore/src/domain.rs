use chrono::{DateTime, Utc};
use serde::Serialize;

/// A user-owned note.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub workspace_id: Option<String>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub workspace_id: Option<String>,
}

/// Partial update; `None` leaves a field untouched.
///
/// `workspace_id` is doubly optional so that a note can be moved out of its
/// workspace (`Some(None)`) as well as into another one.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub workspace_id: Option<Option<String>>,
}

impl Note {
    pub fn new(user_id: impl Into<String>, new: NewNote) -> Self {
        let now = Utc::now();
        Note {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            workspace_id: new.workspace_id,
            title: new.title,
            content: new.content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `update` in place and bumps `updated_at`.
    pub fn apply(&mut self, update: NoteUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(workspace_id) = update.workspace_id {
            self.workspace_id = workspace_id;
        }
        self.updated_at = Utc::now();
    }
}

/// A named grouping of notes owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewWorkspace {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
}

impl Workspace {
    pub fn new(user_id: impl Into<String>, new: NewWorkspace) -> Self {
        let now = Utc::now();
        Workspace {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: new.name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: WorkspaceUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        self.updated_at = Utc::now();
    }
}
