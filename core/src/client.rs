//! Session-holding client for the tic-tac-toe service.
//!
//! # Design
//! Every operation funnels into [`perform`], which serializes the payload,
//! executes one round trip through a [`Transport`], and classifies the
//! response by status code. The action methods on [`GameClient`] only pick
//! a method, a URL and the payload/result types.
//!
//! The session is the base URL plus a header map. `login` is the only
//! method taking `&mut self`: it is the single point where the header map
//! changes, so a client shared behind `&` can never race a token update.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, Transport, UreqTransport};
use crate::types::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, GameResponse, LoginRequest,
    LoginResponse, RankingResponse, RoomListResponse, RoomResponse,
};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";

/// Statuses whose non-empty bodies are parsed as results rather than as
/// error envelopes.
const SUCCESS_STATUSES: [u16; 3] = [200, 201, 202];
const STATUS_CREATED: u16 = 201;

/// Run one request and classify the response.
///
/// Returns the final status together with the parsed result. The result is
/// `None` when the body is empty, whatever the status. A non-empty body is
/// parsed as `R` for 200/201/202 and as an [`ErrorResponse`] for anything
/// else, which becomes [`ApiError::RemoteError`]. Bodies that fail to parse
/// under either shape are local errors.
pub fn perform<P, R, T>(
    transport: &T,
    method: HttpMethod,
    url: &str,
    headers: &BTreeMap<String, String>,
    payload: Option<&P>,
) -> Result<(u16, Option<R>), ApiError>
where
    P: Serialize + ?Sized,
    R: DeserializeOwned,
    T: Transport + ?Sized,
{
    let body = payload
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|e| ApiError::SerializationError(e.to_string()))?;

    let request = HttpRequest {
        method,
        url: url.to_string(),
        headers: headers
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        body,
    };
    debug!(%method, url, has_body = request.body.is_some(), "sending request");

    let response = transport.execute(&request)?;
    let status = response.status;
    if response.body.is_empty() {
        debug!(status, "empty response body");
        return Ok((status, None));
    }

    if SUCCESS_STATUSES.contains(&status) {
        let result = serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        return Ok((status, Some(result)));
    }

    let envelope: ErrorResponse = serde_json::from_slice(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    warn!(status, code = %envelope.code, %method, url, "service rejected request");
    Err(ApiError::remote(status, envelope.code, &envelope.message))
}

/// Client for the tic-tac-toe service API.
///
/// Each method is one blocking round trip. Nothing is retried.
pub struct GameClient<T = UreqTransport> {
    base_url: String,
    headers: BTreeMap<String, String>,
    transport: T,
}

impl GameClient<UreqTransport> {
    /// Client for `{host}:{port}/api` using the default ureq transport.
    pub fn new(host: &str, port: u16) -> Self {
        Self::from_config(&ClientConfig::new(host, port))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_config_and_transport(config, UreqTransport::from_config(config))
    }
}

impl<T: Transport> GameClient<T> {
    pub fn with_transport(host: &str, port: u16, transport: T) -> Self {
        Self::with_config_and_transport(&ClientConfig::new(host, port), transport)
    }

    fn with_config_and_transport(config: &ClientConfig, transport: T) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        Self {
            base_url: config.base_url(),
            headers,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers attached to every request.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Bearer token stored by the last successful login.
    pub fn token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    fn call<P, R>(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Option<&P>,
    ) -> Result<(u16, Option<R>), ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        perform(&self.transport, method, url, &self.headers, payload)
    }

    fn fetch<R>(&self, method: HttpMethod, url: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned + Default,
    {
        let (_, result) = self.call::<(), R>(method, url, None)?;
        Ok(result.unwrap_or_default())
    }

    fn send<P, R>(&self, method: HttpMethod, url: &str, payload: &P) -> Result<R, ApiError>
    where
        P: Serialize,
        R: DeserializeOwned + Default,
    {
        let (_, result) = self.call::<P, R>(method, url, Some(payload))?;
        Ok(result.unwrap_or_default())
    }

    fn act(&self, method: HttpMethod, url: &str) -> Result<u16, ApiError> {
        let (status, _) = self.call::<(), IgnoredAny>(method, url, None)?;
        Ok(status)
    }

    /// `POST /login`. On success the returned token is sent as
    /// `Authorization: Bearer {token}` on every later call. A failed login
    /// leaves the session untouched. A success reply without a token is a
    /// local error.
    pub fn login(&mut self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let url = format!("{}/login", self.base_url);
        let (status, response) =
            self.call::<LoginRequest, LoginResponse>(HttpMethod::Post, &url, Some(request))?;
        let response = match response {
            Some(response) if !response.token.is_empty() => response,
            _ => {
                return Err(ApiError::DeserializationError(format!(
                    "login reply with status {status} carried no token"
                )))
            }
        };
        self.headers
            .insert(AUTHORIZATION.to_string(), format!("Bearer {}", response.token));
        info!(login = %request.login, "logged in");
        Ok(response)
    }

    /// `GET /room`: the room the caller is currently in.
    pub fn get_room(&self) -> Result<RoomResponse, ApiError> {
        self.fetch(HttpMethod::Get, &format!("{}/room", self.base_url))
    }

    /// `GET /rooms?page={page}&pageSize={page_size}`.
    pub fn get_open_rooms(&self, page: u32, page_size: u32) -> Result<RoomListResponse, ApiError> {
        let url = format!("{}/rooms?page={page}&pageSize={page_size}", self.base_url);
        self.fetch(HttpMethod::Get, &url)
    }

    pub fn create_room(&self, request: &CreateRoomRequest) -> Result<CreateRoomResponse, ApiError> {
        self.send(HttpMethod::Post, &format!("{}/rooms", self.base_url), request)
    }

    pub fn join_room(&self, room_id: Uuid) -> Result<(), ApiError> {
        self.act(HttpMethod::Post, &format!("{}/rooms/{room_id}/player", self.base_url))?;
        Ok(())
    }

    pub fn leave_room(&self, room_id: Uuid) -> Result<(), ApiError> {
        self.act(HttpMethod::Delete, &format!("{}/rooms/{room_id}/player", self.base_url))?;
        Ok(())
    }

    /// `POST /rooms/{room_id}/game`. Returns `true` when the service created
    /// a new game (201) and `false` for any other success status, which the
    /// service uses to report a game that already exists.
    pub fn create_game(&self, room_id: Uuid) -> Result<bool, ApiError> {
        let status = self.act(HttpMethod::Post, &format!("{}/rooms/{room_id}/game", self.base_url))?;
        Ok(status == STATUS_CREATED)
    }

    pub fn get_game(&self, room_id: Uuid) -> Result<GameResponse, ApiError> {
        self.fetch(HttpMethod::Get, &format!("{}/rooms/{room_id}/game", self.base_url))
    }

    /// `POST /rooms/{room_id}/game/board/{position}`. Positions run 0..=8
    /// row by row; the service validates them.
    pub fn make_move(&self, room_id: Uuid, position: u8) -> Result<(), ApiError> {
        let url = format!("{}/rooms/{room_id}/game/board/{position}", self.base_url);
        self.act(HttpMethod::Post, &url)?;
        Ok(())
    }

    /// `GET /ranking?page={page}&pageSize={page_size}`.
    pub fn get_ranking(&self, page: u32, page_size: u32) -> Result<RankingResponse, ApiError> {
        let url = format!("{}/ranking?page={page}&pageSize={page_size}", self.base_url);
        self.fetch(HttpMethod::Get, &url)
    }
}
