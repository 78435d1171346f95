use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use lightline_core::room::normalize_room_name;

use crate::error::AppError;
use crate::game_loop::RoomCommand;
use crate::room_manager::RoomSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomSummary>,
}

/// GET /api/v1/rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomsResponse> {
    let rooms = state.rooms.read().await.list();
    Json(RoomsResponse { rooms })
}

/// GET /api/v1/rooms/{room}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    state
        .rooms
        .read()
        .await
        .room(&room)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no room named {room}")))
}

/// POST /api/v1/rooms/{room}/pause
pub async fn pause_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<StatusCode, AppError> {
    send_command(&state, &room, RoomCommand::Pause).await
}

/// POST /api/v1/rooms/{room}/resume
pub async fn resume_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<StatusCode, AppError> {
    send_command(&state, &room, RoomCommand::Resume).await
}

/// POST /api/v1/rooms/{room}/stop: end the room's loop and disconnect
/// everyone in it.
pub async fn stop_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<StatusCode, AppError> {
    send_command(&state, &room, RoomCommand::Stop).await
}

async fn send_command(
    state: &AppState,
    room: &str,
    command: RoomCommand,
) -> Result<StatusCode, AppError> {
    let name = normalize_room_name(room)
        .ok_or_else(|| AppError::BadRequest(format!("invalid room name: {room}")))?;
    if state.rooms.read().await.command(&name, command) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::NotFound(format!("no room named {name}")))
    }
}
