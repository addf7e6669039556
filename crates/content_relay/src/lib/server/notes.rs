//! Owner-scoped passthrough to the [`DataStore`]. Every handler resolves the
//! caller from the bearer token first; records belonging to someone else are
//! `403`, records that do not exist are `404`.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    routing::get,
    Json, Router,
};
use note_datastore::{
    DataStore, NewNote, NewWorkspace, Note, NoteOrder, NoteQuery, NoteUpdate, Workspace,
    WorkspaceUpdate,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::{
    auth::{bearer_token, Caller, TokenVerifier},
    error::{NotFound, ValidationError},
    server::gate::{self, GateJson, GateQuery},
    Error,
};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

pub struct NotesState<D, V> {
    pub store: D,
    pub verifier: V,
}

type NotesStateRef<D, V> = State<Arc<NotesState<D, V>>>;

pub(super) fn router<D, V>(store: D, verifier: V) -> Router
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    Router::new()
        .route(
            "/notes",
            get(list_notes::<D, V>).post(create_note::<D, V>),
        )
        .route(
            "/notes/{id}",
            get(get_note::<D, V>)
                .patch(update_note::<D, V>)
                .delete(delete_note::<D, V>),
        )
        .route(
            "/workspaces",
            get(list_workspaces::<D, V>).post(create_workspace::<D, V>),
        )
        .route(
            "/workspaces/{id}",
            get(get_workspace::<D, V>)
                .patch(update_workspace::<D, V>)
                .delete(delete_workspace::<D, V>),
        )
        .with_state(Arc::new(NotesState { store, verifier }))
}

impl<D, V> FromRequestParts<Arc<NotesState<D, V>>> for Caller
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<NotesState<D, V>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user_id = state
            .verifier
            .verify(token)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Token verification failed"))?;
        Ok(Caller { user_id })
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListNotesParams {
    workspace_id: Option<String>,
    order_by: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ListWorkspacesParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateNoteBody {
    title: Option<String>,
    #[serde(default)]
    content: String,
    workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateNoteBody {
    title: Option<String>,
    content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    workspace_id: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceBody {
    name: Option<String>,
}

fn parse_order(value: Option<&str>) -> Result<NoteOrder, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(NoteOrder::default()),
        Some("updatedAt" | "updated_at") => Ok(NoteOrder::UpdatedAt),
        Some("createdAt" | "created_at") => Ok(NoteOrder::CreatedAt),
        Some("title") => Ok(NoteOrder::Title),
        Some(other) => Err(ValidationError::UnknownVariant {
            field: "orderBy",
            value: other.to_string(),
            expected: "updatedAt, createdAt, title",
        }),
    }
}

fn parse_descending(value: Option<&str>) -> Result<bool, ValidationError> {
    match value.map(str::trim) {
        None | Some("") | Some("desc") => Ok(true),
        Some("asc") => Ok(false),
        Some(other) => Err(ValidationError::UnknownVariant {
            field: "order",
            value: other.to_string(),
            expected: "asc, desc",
        }),
    }
}

async fn owned_note<D: DataStore>(store: &D, id: &str, caller: &Caller) -> Result<Note, Error> {
    let note = store
        .get_note(id)
        .await?
        .ok_or_else(|| NotFound::Note(id.to_string()))?;
    gate::ensure_owner(&note.user_id, caller, &format!("note {id}"))?;
    Ok(note)
}

async fn owned_workspace<D: DataStore>(
    store: &D,
    id: &str,
    caller: &Caller,
) -> Result<Workspace, Error> {
    let workspace = store
        .get_workspace(id)
        .await?
        .ok_or_else(|| NotFound::Workspace(id.to_string()))?;
    gate::ensure_owner(&workspace.user_id, caller, &format!("workspace {id}"))?;
    Ok(workspace)
}

async fn list_notes<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    GateQuery(params): GateQuery<ListNotesParams>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let mut query = NoteQuery::for_user(&caller.user_id);
    query.order_by = parse_order(params.order_by.as_deref())?;
    query.descending = parse_descending(params.order.as_deref())?;
    query.limit = gate::limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT)?;

    if let Some(workspace_id) = params.workspace_id.filter(|w| !w.trim().is_empty()) {
        owned_workspace(&state.store, &workspace_id, &caller).await?;
        query.workspace_id = Some(workspace_id);
    }

    let notes = state.store.query_notes(&query).await?;
    Ok(Json(json!({ "success": true, "notes": notes })))
}

async fn create_note<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    GateJson(body): GateJson<CreateNoteBody>,
) -> Result<(StatusCode, Json<Value>), Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let title = gate::required("title", body.title.as_deref())?.to_string();
    if let Some(workspace_id) = &body.workspace_id {
        owned_workspace(&state.store, workspace_id, &caller).await?;
    }

    let note = Note::new(
        &caller.user_id,
        NewNote {
            title,
            content: body.content,
            workspace_id: body.workspace_id,
        },
    );
    state.store.insert_note(&note).await?;
    tracing::info!(note_id = %note.id, "Created note");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "note": note })),
    ))
}

async fn get_note<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let note = owned_note(&state.store, &id, &caller).await?;
    Ok(Json(json!({ "success": true, "note": note })))
}

async fn update_note<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    Path(id): Path<String>,
    GateJson(body): GateJson<UpdateNoteBody>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let title = match body.title.as_deref() {
        Some(title) => Some(gate::required("title", Some(title))?.to_string()),
        None => None,
    };

    let mut note = owned_note(&state.store, &id, &caller).await?;
    if let Some(Some(workspace_id)) = &body.workspace_id {
        owned_workspace(&state.store, workspace_id, &caller).await?;
    }

    note.apply(NoteUpdate {
        title,
        content: body.content,
        workspace_id: body.workspace_id,
    });
    state.store.update_note(&note).await?;

    Ok(Json(json!({ "success": true, "note": note })))
}

async fn delete_note<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    owned_note(&state.store, &id, &caller).await?;
    if !state.store.delete_note(&id).await? {
        return Err(NotFound::Note(id).into());
    }
    tracing::info!(note_id = %id, "Deleted note");

    Ok(Json(json!({ "success": true, "id": id })))
}

async fn list_workspaces<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    GateQuery(params): GateQuery<ListWorkspacesParams>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let limit = gate::limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT)?;
    let workspaces = state
        .store
        .query_workspaces(&caller.user_id, limit)
        .await?;
    Ok(Json(json!({ "success": true, "workspaces": workspaces })))
}

async fn create_workspace<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    GateJson(body): GateJson<WorkspaceBody>,
) -> Result<(StatusCode, Json<Value>), Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let name = gate::required("name", body.name.as_deref())?.to_string();
    let workspace = Workspace::new(&caller.user_id, NewWorkspace { name });
    state.store.insert_workspace(&workspace).await?;
    tracing::info!(workspace_id = %workspace.id, "Created workspace");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "workspace": workspace })),
    ))
}

async fn get_workspace<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let workspace = owned_workspace(&state.store, &id, &caller).await?;
    Ok(Json(json!({ "success": true, "workspace": workspace })))
}

async fn update_workspace<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    Path(id): Path<String>,
    GateJson(body): GateJson<WorkspaceBody>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    let name = match body.name.as_deref() {
        Some(name) => Some(gate::required("name", Some(name))?.to_string()),
        None => None,
    };

    let mut workspace = owned_workspace(&state.store, &id, &caller).await?;
    workspace.apply(WorkspaceUpdate { name });
    state.store.update_workspace(&workspace).await?;

    Ok(Json(json!({ "success": true, "workspace": workspace })))
}

async fn delete_workspace<D, V>(
    State(state): NotesStateRef<D, V>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error>
where
    D: DataStore + Send + Sync + 'static,
    V: TokenVerifier,
{
    owned_workspace(&state.store, &id, &caller).await?;
    if !state.store.delete_workspace(&id).await? {
        return Err(NotFound::Workspace(id).into());
    }
    tracing::info!(workspace_id = %id, "Deleted workspace");

    Ok(Json(json!({ "success": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order(None).unwrap(), NoteOrder::UpdatedAt);
        assert_eq!(parse_order(Some("createdAt")).unwrap(), NoteOrder::CreatedAt);
        assert_eq!(parse_order(Some("title")).unwrap(), NoteOrder::Title);
        assert!(parse_order(Some("random")).is_err());

        assert!(parse_descending(None).unwrap());
        assert!(!parse_descending(Some("asc")).unwrap());
        assert!(parse_descending(Some("sideways")).is_err());
    }

    #[test]
    fn test_update_body_distinguishes_null_from_absent() {
        let absent: UpdateNoteBody = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(absent.workspace_id, None);

        let cleared: UpdateNoteBody = serde_json::from_str(r#"{"workspaceId":null}"#).unwrap();
        assert_eq!(cleared.workspace_id, Some(None));

        let moved: UpdateNoteBody = serde_json::from_str(r#"{"workspaceId":"w1"}"#).unwrap();
        assert_eq!(moved.workspace_id, Some(Some("w1".to_string())));
    }
}
