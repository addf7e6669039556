use std::future::Future;

use crate::{Note, Workspace};

pub mod memory;
pub mod postgres;

/// Column a note listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteOrder {
    #[default]
    UpdatedAt,
    CreatedAt,
    Title,
}

/// Owner-scoped note listing.
#[derive(Debug, Clone)]
pub struct NoteQuery {
    pub user_id: String,
    pub workspace_id: Option<String>,
    pub order_by: NoteOrder,
    pub descending: bool,
    pub limit: usize,
}

impl NoteQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        NoteQuery {
            user_id: user_id.into(),
            workspace_id: None,
            order_by: NoteOrder::default(),
            descending: true,
            limit: 50,
        }
    }
}

pub trait DataStore {
    fn insert_note(&self, note: &Note) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_note(&self, id: &str) -> impl Future<Output = anyhow::Result<Option<Note>>> + Send;

    fn update_note(&self, note: &Note) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Returns `false` when no note with `id` existed.
    fn delete_note(&self, id: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn query_notes(
        &self,
        query: &NoteQuery,
    ) -> impl Future<Output = anyhow::Result<Vec<Note>>> + Send;

    fn insert_workspace(
        &self,
        workspace: &Workspace,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_workspace(
        &self,
        id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Workspace>>> + Send;

    fn update_workspace(
        &self,
        workspace: &Workspace,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Deletes the workspace and detaches its notes. Returns `false` when no
    /// workspace with `id` existed.
    fn delete_workspace(&self, id: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Workspaces owned by `user_id`, most recently updated first.
    fn query_workspaces(
        &self,
        user_id: &str,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<Workspace>>> + Send;
}

impl<T: DataStore + Send + Sync> DataStore for &T {
    async fn insert_note(&self, note: &Note) -> anyhow::Result<()> {
        (**self).insert_note(note).await
    }

    async fn get_note(&self, id: &str) -> anyhow::Result<Option<Note>> {
        (**self).get_note(id).await
    }

    async fn update_note(&self, note: &Note) -> anyhow::Result<()> {
        (**self).update_note(note).await
    }

    async fn delete_note(&self, id: &str) -> anyhow::Result<bool> {
        (**self).delete_note(id).await
    }

    async fn query_notes(&self, query: &NoteQuery) -> anyhow::Result<Vec<Note>> {
        (**self).query_notes(query).await
    }

    async fn insert_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        (**self).insert_workspace(workspace).await
    }

    async fn get_workspace(&self, id: &str) -> anyhow::Result<Option<Workspace>> {
        (**self).get_workspace(id).await
    }

    async fn update_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        (**self).update_workspace(workspace).await
    }

    async fn delete_workspace(&self, id: &str) -> anyhow::Result<bool> {
        (**self).delete_workspace(id).await
    }

    async fn query_workspaces(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<Workspace>> {
        (**self).query_workspaces(user_id, limit).await
    }
}
