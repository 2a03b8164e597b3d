//! In-memory tic-tac-toe service speaking the client's wire protocol.
//!
//! Everything lives in one `Store` behind a tokio `RwLock`. Handlers
//! authenticate with the bearer token issued by `/api/login` and reply with
//! `{code, message}` envelopes on every rejection.

use std::{cmp::Reverse, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    Open,
    Full,
    Playing,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<String>,
    pub phase: RoomPhase,
}

impl Room {
    fn has_member(&self, login: &str) -> bool {
        self.host == login || self.guest.as_deref() == Some(login)
    }
}

#[derive(Serialize, Deserialize)]
pub struct RoomResponse {
    pub room: Room,
}

#[derive(Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<Room>,
    pub total: usize,
}

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mark {
    Empty,
    X,
    O,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    Won,
    Draw,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub room_id: Uuid,
    pub board: [Mark; 9],
    pub status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// X then O.
    #[serde(skip)]
    players: [String; 2],
}

impl Game {
    fn new(room: &Room, guest: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room.id,
            board: [Mark::Empty; 9],
            status: GameStatus::InProgress,
            turn: Some(room.host.clone()),
            winner: None,
            players: [room.host.clone(), guest],
        }
    }

    fn mark_of(&self, login: &str) -> Mark {
        if self.players[0] == login {
            Mark::X
        } else {
            Mark::O
        }
    }

    fn opponent_of(&self, login: &str) -> &str {
        if self.players[0] == login {
            &self.players[1]
        } else {
            &self.players[0]
        }
    }

    fn is_winning(&self, mark: Mark) -> bool {
        WIN_LINES
            .iter()
            .any(|line| line.iter().all(|&cell| self.board[cell] == mark))
    }
}

#[derive(Serialize, Deserialize)]
pub struct GameResponse {
    pub game: Game,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RankingEntry {
    pub login: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: u32,
}

#[derive(Serialize, Deserialize)]
pub struct RankingResponse {
    pub ranking: Vec<RankingEntry>,
    pub total: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

impl PageQuery {
    fn slice<T: Clone>(&self, items: &[T]) -> Result<Vec<T>, ServiceError> {
        if self.page == 0 || self.page_size == 0 {
            return Err(ServiceError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_PAGE",
                "page and pageSize start at 1",
            ));
        }
        Ok(items
            .iter()
            .skip((self.page - 1).saturating_mul(self.page_size))
            .take(self.page_size)
            .cloned()
            .collect())
    }
}

/// Rejection sent as a `{code, message}` envelope.
#[derive(Debug)]
pub struct ServiceError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ServiceError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn room_not_found(id: Uuid) -> Self {
        Self::new(StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", format!("room {id} does not exist"))
    }

    fn not_a_member() -> Self {
        Self::new(StatusCode::FORBIDDEN, "NOT_IN_ROOM", "you are not in this room")
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Default)]
pub struct Store {
    /// token -> login
    sessions: HashMap<String, String>,
    /// Creation order, which is also listing order.
    rooms: Vec<Room>,
    /// room id -> current or last game
    games: HashMap<Uuid, Game>,
    ranking: HashMap<String, RankingEntry>,
}

impl Store {
    fn authenticate(&self, headers: &HeaderMap) -> Result<String, ServiceError> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|token| self.sessions.get(token))
            .cloned()
            .ok_or_else(|| {
                ServiceError::new(StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED", "login required")
            })
    }

    fn room_of(&self, login: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.has_member(login))
    }

    fn room_mut(&mut self, id: Uuid) -> Result<&mut Room, ServiceError> {
        self.rooms
            .iter_mut()
            .find(|room| room.id == id)
            .ok_or_else(|| ServiceError::room_not_found(id))
    }

    fn check_member(&self, id: Uuid, login: &str) -> Result<&Room, ServiceError> {
        let room = self
            .rooms
            .iter()
            .find(|room| room.id == id)
            .ok_or_else(|| ServiceError::room_not_found(id))?;
        if !room.has_member(login) {
            return Err(ServiceError::not_a_member());
        }
        Ok(room)
    }

    fn member_room(&mut self, id: Uuid, login: &str) -> Result<&mut Room, ServiceError> {
        let room = self.room_mut(id)?;
        if !room.has_member(login) {
            return Err(ServiceError::not_a_member());
        }
        Ok(room)
    }

    fn record_result(&mut self, game: &Game) {
        let [x, o] = &game.players;
        match (&game.status, &game.winner) {
            (GameStatus::Won, Some(winner)) => {
                let loser = game.opponent_of(winner).to_string();
                let entry = self.ranking.entry(winner.clone()).or_default();
                entry.wins += 1;
                entry.points += 3;
                self.ranking.entry(loser).or_default().losses += 1;
            }
            (GameStatus::Draw, _) => {
                for login in [x, o] {
                    let entry = self.ranking.entry(login.clone()).or_default();
                    entry.draws += 1;
                    entry.points += 1;
                }
            }
            _ => {}
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/login", post(login))
        .route("/api/room", get(current_room))
        .route("/api/rooms", get(open_rooms).post(create_room))
        .route("/api/rooms/{id}/player", post(join_room).delete(leave_room))
        .route("/api/rooms/{id}/game", get(get_game).post(create_game))
        .route("/api/rooms/{id}/game/board/{position}", post(make_move))
        .route("/api/ranking", get(ranking))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    if input.login.is_empty() || input.password.is_empty() {
        return Err(ServiceError::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "login and password are required",
        ));
    }
    let token = Uuid::new_v4().simple().to_string();
    let mut store = db.write().await;
    store.sessions.insert(token.clone(), input.login.clone());
    store
        .ranking
        .entry(input.login.clone())
        .or_insert_with(|| RankingEntry {
            login: input.login.clone(),
            ..RankingEntry::default()
        });
    info!(login = %input.login, "login");
    Ok(Json(LoginResponse { token }))
}

async fn current_room(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<RoomResponse>, ServiceError> {
    let store = db.read().await;
    let login = store.authenticate(&headers)?;
    store
        .room_of(&login)
        .cloned()
        .map(|room| Json(RoomResponse { room }))
        .ok_or_else(|| ServiceError::new(StatusCode::NOT_FOUND, "NOT_IN_ROOM", "you are not in a room"))
}

async fn open_rooms(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<RoomListResponse>, ServiceError> {
    let store = db.read().await;
    store.authenticate(&headers)?;
    let open: Vec<Room> = store
        .rooms
        .iter()
        .filter(|room| room.phase == RoomPhase::Open)
        .cloned()
        .collect();
    Ok(Json(RoomListResponse {
        rooms: query.slice(&open)?,
        total: open.len(),
    }))
}

async fn create_room(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ServiceError> {
    let mut store = db.write().await;
    let login = store.authenticate(&headers)?;
    if input.title.trim().is_empty() {
        return Err(ServiceError::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", "title is required"));
    }
    if store.room_of(&login).is_some() {
        return Err(ServiceError::new(StatusCode::CONFLICT, "ALREADY_IN_ROOM", "leave your room first"));
    }
    let room = Room {
        id: Uuid::new_v4(),
        title: input.title,
        description: input.description,
        host: login,
        guest: None,
        phase: RoomPhase::Open,
    };
    store.rooms.push(room.clone());
    info!(room = %room.id, host = %room.host, "room created");
    Ok((StatusCode::CREATED, Json(RoomResponse { room })))
}

async fn join_room(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let mut store = db.write().await;
    let login = store.authenticate(&headers)?;
    if store.room_of(&login).is_some() {
        return Err(ServiceError::new(StatusCode::CONFLICT, "ALREADY_IN_ROOM", "leave your room first"));
    }
    let room = store.room_mut(id)?;
    if room.guest.is_some() {
        return Err(ServiceError::new(StatusCode::CONFLICT, "ROOM_FULL", "room is full"));
    }
    room.guest = Some(login);
    room.phase = RoomPhase::Full;
    Ok(StatusCode::OK)
}

async fn leave_room(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let mut store = db.write().await;
    let login = store.authenticate(&headers)?;
    let room = store.member_room(id, &login)?;
    if room.phase == RoomPhase::Playing {
        return Err(ServiceError::new(
            StatusCode::CONFLICT,
            "GAME_IN_PROGRESS",
            "finish the game before leaving",
        ));
    }
    if room.host == login {
        store.rooms.retain(|room| room.id != id);
    } else {
        room.guest = None;
        room.phase = RoomPhase::Open;
    }
    store.games.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn create_game(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let mut store = db.write().await;
    let login = store.authenticate(&headers)?;
    let room = store.member_room(id, &login)?;
    if room.phase == RoomPhase::Playing {
        return Ok(StatusCode::OK);
    }
    let Some(guest) = room.guest.clone() else {
        return Err(ServiceError::new(StatusCode::CONFLICT, "ROOM_NOT_FULL", "waiting for a guest"));
    };
    room.phase = RoomPhase::Playing;
    let game = Game::new(room, guest);
    store.games.insert(id, game);
    Ok(StatusCode::CREATED)
}

async fn get_game(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<GameResponse>, ServiceError> {
    let store = db.read().await;
    let login = store.authenticate(&headers)?;
    store.check_member(id, &login)?;
    store
        .games
        .get(&id)
        .cloned()
        .map(|game| Json(GameResponse { game }))
        .ok_or_else(|| ServiceError::new(StatusCode::NOT_FOUND, "GAME_NOT_FOUND", "no game in this room"))
}

async fn make_move(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, position)): Path<(Uuid, usize)>,
) -> Result<StatusCode, ServiceError> {
    let mut store = db.write().await;
    let login = store.authenticate(&headers)?;
    store.member_room(id, &login)?;
    let game = store
        .games
        .get_mut(&id)
        .ok_or_else(|| ServiceError::new(StatusCode::NOT_FOUND, "GAME_NOT_FOUND", "no game in this room"))?;

    if game.status != GameStatus::InProgress {
        return Err(ServiceError::new(StatusCode::CONFLICT, "GAME_OVER", "the game has finished"));
    }
    if game.turn.as_deref() != Some(login.as_str()) {
        return Err(ServiceError::new(StatusCode::CONFLICT, "NOT_YOUR_TURN", "wait for your opponent"));
    }
    let mark = game.mark_of(&login);
    let cell = game.board.get_mut(position).ok_or_else(|| {
        ServiceError::new(StatusCode::BAD_REQUEST, "INVALID_POSITION", "position must be 0..=8")
    })?;
    if *cell != Mark::Empty {
        return Err(ServiceError::new(StatusCode::CONFLICT, "CELL_OCCUPIED", "cell is taken"));
    }
    *cell = mark;
    if game.is_winning(mark) {
        game.status = GameStatus::Won;
        game.winner = Some(login.clone());
        game.turn = None;
    } else if game.board.iter().all(|&cell| cell != Mark::Empty) {
        game.status = GameStatus::Draw;
        game.turn = None;
    } else {
        game.turn = Some(game.opponent_of(&login).to_string());
    }

    if game.status != GameStatus::InProgress {
        let finished = game.clone();
        info!(room = %id, status = ?finished.status, "game finished");
        store.record_result(&finished);
        store.room_mut(id)?.phase = RoomPhase::Full;
    }
    Ok(StatusCode::OK)
}

async fn ranking(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<RankingResponse>, ServiceError> {
    let store = db.read().await;
    store.authenticate(&headers)?;
    let mut entries: Vec<RankingEntry> = store
        .ranking
        .iter()
        .map(|(login, entry)| RankingEntry {
            login: login.clone(),
            ..entry.clone()
        })
        .collect();
    entries.sort_by_key(|entry| (Reverse(entry.points), Reverse(entry.wins), entry.login.clone()));
    Ok(Json(RankingResponse {
        ranking: query.slice(&entries)?,
        total: entries.len(),
    }))
}
