//! Blocking client for the tic-tac-toe game service.
//!
//! # Overview
//! Wraps the service's HTTP+JSON API (login, rooms, games, moves, ranking)
//! in typed methods on [`GameClient`]. Every call is one synchronous round
//! trip whose response is classified by status code into a typed result or
//! an [`ApiError`].
//!
//! # Design
//! - [`perform`] is the only place that serializes payloads, executes
//!   requests and interprets status codes; the action methods just choose
//!   a URL and the payload/result types.
//! - The network sits behind the [`Transport`] trait. [`UreqTransport`] is
//!   the default; tests substitute recording or mock transports.
//! - Errors distinguish local failures (code `CLIENT_ERROR`) from service
//!   rejections, which carry the service's own code.
//! - DTOs are defined independently from the mock-server crate; the
//!   end-to-end test catches schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::{perform, GameClient};
pub use config::ClientConfig;
pub use error::{ApiError, CLIENT_ERROR_CODE};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, Game, GameResponse, GameStatus,
    LoginRequest, LoginResponse, Mark, RankingEntry, RankingResponse, Room, RoomListResponse,
    RoomPhase, RoomResponse,
};
