//! # DataStore Module
//!
//! Owner-scoped persistence for notes and workspaces.
//!
//! The module provides a [`DataStore`] abstraction with two implementations:
//! [`PgDataStore`] backed by Postgres via sqlx, and [`InMemoryDataStore`] for
//! local runs and tests. Ownership is recorded on every row but never enforced
//! here; callers compare `user_id` against the authenticated identity.

mod datastore;
mod domain;

pub use datastore::memory::InMemoryDataStore;
pub use datastore::postgres::PgDataStore;
pub use datastore::{DataStore, NoteOrder, NoteQuery};
pub use domain::{NewNote, NewWorkspace, Note, NoteUpdate, Workspace, WorkspaceUpdate};
