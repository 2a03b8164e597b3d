//! Full game lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives two clients (host
//! and guest) through every action over real HTTP with the default ureq
//! transport. Validates request building, bearer-token handling and
//! response classification end-to-end.

use std::net::SocketAddr;

use tictactoe_client::{
    ApiError, CreateRoomRequest, GameClient, GameStatus, LoginRequest, Mark, RoomPhase,
};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn logged_in(addr: SocketAddr, login: &str) -> GameClient {
    let mut client = GameClient::new("http://127.0.0.1", addr.port());
    let response = client
        .login(&LoginRequest {
            login: login.to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
    assert_eq!(client.token(), Some(response.token.as_str()));
    client
}

fn remote_code(err: ApiError) -> String {
    assert!(err.is_remote(), "expected remote error, got {err}");
    err.code().to_string()
}

#[test]
fn calls_before_login_are_rejected_by_the_service() {
    let addr = start_server();
    let client = GameClient::new("http://127.0.0.1/", addr.port());
    let err = client.get_open_rooms(1, 10).unwrap_err();
    assert_eq!(err.code(), "NOT_AUTHENTICATED");
    assert_eq!(err.status(), Some(401));
}

#[test]
fn game_lifecycle() {
    let addr = start_server();
    let mut host = logged_in(addr, "ann");
    let guest = logged_in(addr, "bob");

    // Step 1: nobody is in a room yet.
    assert!(host.get_open_rooms(1, 10).unwrap().rooms.is_empty());
    assert_eq!(remote_code(host.get_room().unwrap_err()), "NOT_IN_ROOM");

    // Step 2: host creates a room and sees it listed.
    let created = host
        .create_room(&CreateRoomRequest {
            title: "Integration".to_string(),
            description: "e2e".to_string(),
        })
        .unwrap();
    let room_id = created.room.id;
    assert_eq!(created.room.host, "ann");
    assert_eq!(created.room.phase, RoomPhase::Open);
    let list = guest.get_open_rooms(1, 10).unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.rooms[0].id, room_id);

    // Step 3: a game needs a guest.
    assert_eq!(remote_code(host.create_game(room_id).unwrap_err()), "ROOM_NOT_FULL");

    // Step 4: guest joins; room leaves the open list.
    guest.join_room(room_id).unwrap();
    assert_eq!(guest.get_room().unwrap().room.guest.as_deref(), Some("bob"));
    assert_eq!(host.get_open_rooms(1, 10).unwrap().total, 0);

    // Step 5: create-game is idempotent: created, then already there.
    assert!(host.create_game(room_id).unwrap());
    assert!(!guest.create_game(room_id).unwrap());

    // Step 6: play. Host is X and opens.
    let err = guest.make_move(room_id, 4).unwrap_err();
    assert_eq!(err.code(), "NOT_YOUR_TURN");
    assert_eq!(err.message(), "NOT_YOUR_TURN: wait for your opponent");

    host.make_move(room_id, 4).unwrap();
    assert_eq!(remote_code(guest.make_move(room_id, 4).unwrap_err()), "CELL_OCCUPIED");
    guest.make_move(room_id, 0).unwrap();
    host.make_move(room_id, 2).unwrap();
    guest.make_move(room_id, 1).unwrap();

    let game = guest.get_game(room_id).unwrap().game;
    assert_eq!(game.status, GameStatus::InProgress);
    assert_eq!(game.turn.as_deref(), Some("ann"));
    assert_eq!(game.board[4], Mark::X);
    assert_eq!(game.board[0], Mark::O);

    host.make_move(room_id, 6).unwrap();
    let game = host.get_game(room_id).unwrap().game;
    assert_eq!(game.status, GameStatus::Won);
    assert_eq!(game.winner.as_deref(), Some("ann"));
    assert_eq!(remote_code(guest.make_move(room_id, 8).unwrap_err()), "GAME_OVER");

    // Step 7: ranking reflects the result.
    let ranking = guest.get_ranking(1, 10).unwrap();
    assert_eq!(ranking.total, 2);
    assert_eq!(ranking.ranking[0].login, "ann");
    assert_eq!(ranking.ranking[0].wins, 1);
    assert_eq!(ranking.ranking[1].login, "bob");
    assert_eq!(ranking.ranking[1].losses, 1);

    // Step 8: guest leaves, room reopens.
    guest.leave_room(room_id).unwrap();
    assert_eq!(host.get_open_rooms(1, 10).unwrap().total, 1);

    // Step 9: a fresh login replaces the token; the old session still works
    // server-side but the client only sends the new one.
    let previous = host.token().map(str::to_string);
    host.login(&LoginRequest {
        login: "ann".to_string(),
        password: "pw".to_string(),
    })
    .unwrap();
    assert_ne!(host.token().map(str::to_string), previous);
    assert_eq!(host.get_room().unwrap().room.id, room_id);
}
