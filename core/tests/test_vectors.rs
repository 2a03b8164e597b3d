//! Replay every action against JSON test vectors stored in `test-vectors/`.
//!
//! Each case names an action, its arguments, the request the client must
//! produce, the response the service sends back, and either the expected
//! result or the expected error code. A recording transport stands in for
//! the network. Results are compared as parsed JSON so field order never
//! matters.

use std::cell::RefCell;

use serde::Serialize;
use serde_json::Value;
use tictactoe_client::{
    ApiError, CreateRoomRequest, GameClient, HttpMethod, HttpRequest, HttpResponse, LoginRequest,
    Transport,
};
use uuid::Uuid;

/// Answers every request with one canned response and keeps what it saw.
struct ReplayTransport {
    response: HttpResponse,
    seen: RefCell<Vec<HttpRequest>>,
}

impl ReplayTransport {
    fn new(status: u16, body: &str) -> Self {
        Self {
            response: HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            },
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for &ReplayTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.borrow_mut().push(request.clone());
        Ok(self.response.clone())
    }
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn to_value<T: Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    result.map(|value| serde_json::to_value(value).unwrap())
}

fn page_args(args: &Value) -> (u32, u32) {
    (
        args["page"].as_u64().unwrap() as u32,
        args["pageSize"].as_u64().unwrap() as u32,
    )
}

fn run_action(
    client: &mut GameClient<&ReplayTransport>,
    action: &str,
    args: &Value,
    room_id: Uuid,
) -> Result<Value, ApiError> {
    match action {
        "login" => {
            let request: LoginRequest = serde_json::from_value(args.clone()).unwrap();
            to_value(client.login(&request))
        }
        "get_room" => to_value(client.get_room()),
        "get_open_rooms" => {
            let (page, page_size) = page_args(args);
            to_value(client.get_open_rooms(page, page_size))
        }
        "create_room" => {
            let request: CreateRoomRequest = serde_json::from_value(args.clone()).unwrap();
            to_value(client.create_room(&request))
        }
        "join_room" => to_value(client.join_room(room_id)),
        "leave_room" => to_value(client.leave_room(room_id)),
        "create_game" => to_value(client.create_game(room_id)),
        "get_game" => to_value(client.get_game(room_id)),
        "make_move" => {
            let position = args["position"].as_u64().unwrap() as u8;
            to_value(client.make_move(room_id, position))
        }
        "get_ranking" => {
            let (page, page_size) = page_args(args);
            to_value(client.get_ranking(page, page_size))
        }
        other => panic!("unknown action: {other}"),
    }
}

#[test]
fn action_test_vectors() {
    let raw = include_str!("../../test-vectors/actions.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();
    let room_id: Uuid = vectors["room_id"].as_str().unwrap().parse().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let transport = ReplayTransport::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );
        let mut client = GameClient::with_transport("http://localhost", 8080, &transport);
        assert_eq!(client.base_url(), base_url, "{name}: base url");

        let outcome = run_action(&mut client, case["action"].as_str().unwrap(), &case["args"], room_id);

        // Verify the request
        let seen = transport.seen.borrow();
        assert_eq!(seen.len(), 1, "{name}: exactly one round trip");
        let req = &seen[0];
        let expected_req = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(
            req.url,
            format!("{base_url}{}", expected_req["path"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content type");
        match &expected_req["body"] {
            Value::Null => assert!(req.body.is_none(), "{name}: body should be None"),
            expected => {
                let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&body, expected, "{name}: body");
            }
        }

        // Verify the outcome
        if let Some(expected_error) = case.get("expected_error") {
            let err = outcome.expect_err(name);
            assert_eq!(err.code(), expected_error["code"].as_str().unwrap(), "{name}: code");
            if let Some(message) = expected_error.get("message") {
                assert_eq!(err.message(), message.as_str().unwrap(), "{name}: message");
                assert!(err.is_remote(), "{name}: remote");
            } else {
                assert!(err.is_local(), "{name}: local");
            }
        } else {
            let value = outcome.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            assert_eq!(value, case["expected_result"], "{name}: result");
        }
    }
}
