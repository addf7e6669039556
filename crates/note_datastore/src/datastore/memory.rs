//! In-memory [`DataStore`] for local runs and tests.
//!
//! Everything lives behind a single `std::sync::RwLock`; state is lost on
//! restart.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use itertools::Itertools;

use crate::{
    datastore::{DataStore, NoteOrder, NoteQuery},
    Note, Workspace,
};

#[derive(Debug, Default)]
struct Tables {
    notes: HashMap<String, Note>,
    workspaces: HashMap<String, Workspace>,
}

#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    tables: RwLock<Tables>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow::anyhow!("In-memory datastore lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow::anyhow!("In-memory datastore lock poisoned"))
    }
}

impl DataStore for InMemoryDataStore {
    async fn insert_note(&self, note: &Note) -> anyhow::Result<()> {
        let mut tables = self.write()?;
        if tables.notes.contains_key(&note.id) {
            anyhow::bail!("Note {} already exists", note.id);
        }
        tables.notes.insert(note.id.clone(), note.clone());
        Ok(())
    }

    async fn get_note(&self, id: &str) -> anyhow::Result<Option<Note>> {
        Ok(self.read()?.notes.get(id).cloned())
    }

    async fn update_note(&self, note: &Note) -> anyhow::Result<()> {
        let mut tables = self.write()?;
        match tables.notes.get_mut(&note.id) {
            Some(existing) => *existing = note.clone(),
            None => tracing::debug!(note_id = %note.id, "Update for missing note ignored"),
        }
        Ok(())
    }

    async fn delete_note(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.write()?.notes.remove(id).is_some())
    }

    async fn query_notes(&self, query: &NoteQuery) -> anyhow::Result<Vec<Note>> {
        let tables = self.read()?;
        let notes = tables
            .notes
            .values()
            .filter(|n| n.user_id == query.user_id)
            .filter(|n| match &query.workspace_id {
                Some(ws) => n.workspace_id.as_deref() == Some(ws.as_str()),
                None => true,
            })
            .sorted_by(|a, b| {
                let ordering = match query.order_by {
                    NoteOrder::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                    NoteOrder::CreatedAt => a.created_at.cmp(&b.created_at),
                    NoteOrder::Title => a.title.cmp(&b.title),
                };
                if query.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .take(query.limit)
            .cloned()
            .collect();

        Ok(notes)
    }

    async fn insert_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        let mut tables = self.write()?;
        if tables.workspaces.contains_key(&workspace.id) {
            anyhow::bail!("Workspace {} already exists", workspace.id);
        }
        tables
            .workspaces
            .insert(workspace.id.clone(), workspace.clone());
        Ok(())
    }

    async fn get_workspace(&self, id: &str) -> anyhow::Result<Option<Workspace>> {
        Ok(self.read()?.workspaces.get(id).cloned())
    }

    async fn update_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.workspaces.get_mut(&workspace.id) {
            *existing = workspace.clone();
        }
        Ok(())
    }

    async fn delete_workspace(&self, id: &str) -> anyhow::Result<bool> {
        let mut tables = self.write()?;
        let removed = tables.workspaces.remove(id).is_some();
        if removed {
            tables
                .notes
                .values_mut()
                .filter(|n| n.workspace_id.as_deref() == Some(id))
                .for_each(|n| n.workspace_id = None);
        }
        Ok(removed)
    }

    async fn query_workspaces(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<Workspace>> {
        let tables = self.read()?;
        Ok(tables
            .workspaces
            .values()
            .filter(|w| w.user_id == user_id)
            .sorted_by(|a, b| b.updated_at.cmp(&a.updated_at))
            .take(limit)
            .cloned()
            .collect())
    }
}
