//! Staff JSON API: players, events, invitations, outreach, and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::channels::whatsapp::strip_channel_prefix;
use crate::error::{DatabaseError, OutreachError};
use crate::league::{NewEvent, NewPlayer, ResponseStatus};
use crate::templates::MessageKind;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const DASHBOARD_LIMIT: usize = 5;

/// Error response with a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Constraint(_) => Self {
                status: StatusCode::CONFLICT,
                message: e.to_string(),
            },
            other => {
                error!(error = %other, "Database error in API handler");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal database error".into(),
                }
            }
        }
    }
}

impl From<OutreachError> for ApiError {
    fn from(e: OutreachError) -> Self {
        match e {
            OutreachError::EventNotFound(_) => Self::not_found(e.to_string()),
            OutreachError::InvalidRequest(message) => Self::bad_request(message),
            OutreachError::Database(db) => db.into(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/players", get(list_players).post(create_player))
        .route(
            "/api/players/{id}",
            get(get_player).put(update_player).delete(delete_player),
        )
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/events/{id}/invitations", post(invite_players))
        .route(
            "/api/events/{id}/invitations/{player_id}",
            delete(remove_invitation),
        )
        .route("/api/events/{id}/stats", get(event_stats))
        .route("/api/events/{id}/players", get(event_players))
        .route("/api/events/{id}/send", post(send_event_messages))
        .route("/api/invitations/{id}", patch(update_invitation))
        .route("/api/messages", get(list_messages))
        .route("/api/messages/bulk", post(send_bulk))
        .route("/api/responses", get(list_responses))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

impl HistoryQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 1000)
    }
}

// ── Dashboard ───────────────────────────────────────────────────────────

async fn dashboard(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let counts = state.db.dashboard_counts().await?;
    let upcoming = state
        .db
        .upcoming_events(Utc::now().date_naive(), DASHBOARD_LIMIT)
        .await?;
    let recent = state.db.recent_players(DASHBOARD_LIMIT).await?;
    Ok(Json(json!({
        "counts": counts,
        "upcoming_events": upcoming,
        "recent_players": recent,
    })))
}

// ── Players ─────────────────────────────────────────────────────────────

fn validate_player(mut player: NewPlayer) -> ApiResult<NewPlayer> {
    player.first_name = player.first_name.trim().to_string();
    player.last_name = player.last_name.trim().to_string();
    player.phone_number = strip_channel_prefix(&player.phone_number).to_string();
    if player.first_name.is_empty() || player.last_name.is_empty() {
        return Err(ApiError::bad_request("first_name and last_name are required"));
    }
    if player.phone_number.is_empty() {
        return Err(ApiError::bad_request("phone_number is required"));
    }
    Ok(player)
}

async fn list_players(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_players().await?))
}

async fn create_player(
    State(state): State<AppState>,
    Json(body): Json<NewPlayer>,
) -> ApiResult<impl IntoResponse> {
    let player = state.db.create_player(&validate_player(body)?).await?;
    info!(player_id = player.id, "Player registered");
    Ok((StatusCode::CREATED, Json(player)))
}

async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let player = state
        .db
        .get_player(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Player {id} not found")))?;
    let invitations = state.db.list_invitations_for_player(id).await?;
    Ok(Json(json!({ "player": player, "invitations": invitations })))
}

async fn update_player(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewPlayer>,
) -> ApiResult<impl IntoResponse> {
    let player = state
        .db
        .update_player(id, &validate_player(body)?)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Player {id} not found")))?;
    Ok(Json(player))
}

async fn delete_player(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.db.delete_player(id).await? {
        info!(player_id = id, "Player deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Player {id} not found")))
    }
}

// ── Events ──────────────────────────────────────────────────────────────

fn validate_event(mut event: NewEvent) -> ApiResult<NewEvent> {
    event.name = event.name.trim().to_string();
    event.location = event.location.trim().to_string();
    if event.name.is_empty() || event.location.is_empty() {
        return Err(ApiError::bad_request("name and location are required"));
    }
    if event.end_date.is_some_and(|end| end < event.start_date) {
        return Err(ApiError::bad_request("end_date is before start_date"));
    }
    Ok(event)
}

async fn list_events(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_events().await?))
}

async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<NewEvent>,
) -> ApiResult<impl IntoResponse> {
    let event = state.db.create_event(&validate_event(body)?).await?;
    info!(event_id = event.id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .db
        .get_event(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Event {id} not found")))?;
    let invitations = state.db.list_invitations_for_event(id).await?;
    let stats = state.db.event_response_stats(id).await?;
    Ok(Json(json!({
        "event": event,
        "invitations": invitations,
        "stats": stats,
    })))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewEvent>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .db
        .update_event(id, &validate_event(body)?)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Event {id} not found")))?;
    Ok(Json(event))
}

async fn delete_event(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if state.db.delete_event(id).await? {
        info!(event_id = id, "Event deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Event {id} not found")))
    }
}

// ── Invitations ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InviteRequest {
    player_ids: Vec<i64>,
}

async fn invite_players(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(body): Json<InviteRequest>,
) -> ApiResult<impl IntoResponse> {
    if state.db.get_event(event_id).await?.is_none() {
        return Err(ApiError::not_found(format!("Event {event_id} not found")));
    }

    let (mut invited, mut already_invited, mut unknown) = (0, 0, 0);
    for player_id in body.player_ids {
        if state.db.get_player(player_id).await?.is_none() {
            unknown += 1;
            continue;
        }
        match state.db.invite_player(event_id, player_id).await? {
            Some(_) => invited += 1,
            None => already_invited += 1,
        }
    }
    info!(event_id, invited, already_invited, unknown, "Players invited");
    Ok(Json(json!({
        "invited": invited,
        "already_invited": already_invited,
        "unknown": unknown,
    })))
}

async fn remove_invitation(
    State(state): State<AppState>,
    Path((event_id, player_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    if state.db.remove_invitation(event_id, player_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Invitation not found"))
    }
}

#[derive(Debug, Deserialize)]
struct InvitationEdit {
    response_status: ResponseStatus,
    #[serde(default)]
    notes: Option<String>,
}

async fn update_invitation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<InvitationEdit>,
) -> ApiResult<impl IntoResponse> {
    let invitation = state
        .db
        .update_invitation(id, body.response_status, body.notes.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Invitation {id} not found")))?;
    info!(
        invitation_id = id,
        status = %invitation.response_status,
        "Invitation edited"
    );
    Ok(Json(invitation))
}

async fn event_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if state.db.get_event(id).await?.is_none() {
        return Err(ApiError::not_found(format!("Event {id} not found")));
    }
    Ok(Json(state.db.event_response_stats(id).await?))
}

#[derive(Debug, Deserialize)]
struct PlayersQuery {
    status: Option<ResponseStatus>,
}

async fn event_players(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PlayersQuery>,
) -> ApiResult<impl IntoResponse> {
    if state.db.get_event(id).await?.is_none() {
        return Err(ApiError::not_found(format!("Event {id} not found")));
    }
    let players = match query.status {
        Some(status) => state.db.players_by_response(id, status).await?,
        None => state.db.invited_players(id).await?,
    };
    Ok(Json(players))
}

// ── Outreach ────────────────────────────────────────────────────────────

fn default_kind() -> MessageKind {
    MessageKind::Invitation
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default = "default_kind")]
    kind: MessageKind,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    test_mode: bool,
}

async fn send_event_messages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SendRequest>,
) -> ApiResult<impl IntoResponse> {
    let report = state
        .outreach
        .send_event_messages(id, body.kind, body.message.as_deref(), body.test_mode)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    player_ids: Vec<i64>,
    message: String,
    #[serde(default)]
    test_mode: bool,
}

async fn send_bulk(
    State(state): State<AppState>,
    Json(body): Json<BulkRequest>,
) -> ApiResult<impl IntoResponse> {
    let report = state
        .outreach
        .send_bulk(&body.player_ids, &body.message, body.test_mode)
        .await?;
    Ok(Json(report))
}

// ── History ─────────────────────────────────────────────────────────────

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_outbound_messages(query.limit()).await?))
}

async fn list_responses(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_response_logs(query.limit()).await?))
}
