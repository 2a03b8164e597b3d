//! Wire records for the tic-tac-toe service.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently;
//! the end-to-end test catches drift between the two. Response records
//! implement `Default` because a success status with an empty body is a
//! valid reply, and collection or optional fields default when absent.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Lifecycle of a room: waiting for a guest, full, or hosting a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    #[default]
    Open,
    Full,
    Playing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Login of the player who created the room.
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<String>,
    pub phase: RoomPhase,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomResponse {
    pub room: Room,
}

/// One page of open rooms. `total` counts every open room, not just this page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListResponse {
    #[serde(default)]
    pub rooms: Vec<Room>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room: Room,
}

/// Content of a board cell. The host plays `X`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mark {
    #[default]
    Empty,
    X,
    O,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    InProgress,
    Won,
    Draw,
}

/// Game state. `board` lists the nine cells row by row, so position `4`
/// is the centre.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub room_id: Uuid,
    #[serde(default)]
    pub board: Vec<Mark>,
    pub status: GameStatus,
    /// Login of the player expected to move next; absent once finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResponse {
    pub game: Game,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub login: String,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingResponse {
    #[serde(default)]
    pub ranking: Vec<RankingEntry>,
    pub total: u64,
}

/// Body the service sends with every non-success status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
