#[allow(dead_code)]
mod common;

use common::{
    TestServer, add_player, eventually_json, get_json, ws_connect, ws_read, ws_read_until, ws_send,
};
use lightline_core::net::actions::ClientAction;

async fn post(server: &TestServer, path: &str) -> u16 {
    reqwest::Client::new()
        .post(format!("{}{path}", server.base_url()))
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

#[tokio::test]
async fn health_reports_rooms() {
    let server = TestServer::new().await;
    let (status, body) = get_json(&server, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["rooms"]["active"], 0);

    let mut stream = ws_connect(&server.ws_url("pulse")).await;
    let _ = ws_read(&mut stream).await;
    eventually_json(&server, "/health", |b| b["rooms"]["active"] == 1).await;
}

#[tokio::test]
async fn list_rooms_starts_empty() {
    let server = TestServer::new().await;
    let (status, body) = get_json(&server, "/api/v1/rooms").await;
    assert_eq!(status, 200);
    assert_eq!(body["rooms"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn joined_room_is_listed() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url("listed")).await;
    let _ = ws_read(&mut stream).await;

    let body = eventually_json(&server, "/api/v1/rooms", |b| {
        b["rooms"][0]["connections"] == 1
    })
    .await;
    assert_eq!(body["rooms"][0]["name"], "listed");
    assert_eq!(body["rooms"][0]["phase"], "lobby");
}

#[tokio::test]
async fn room_detail_tracks_the_match() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url("detail")).await;
    let _ = ws_read(&mut stream).await;
    ws_send(&mut stream, &add_player("Ada")).await;
    ws_send(&mut stream, &add_player("Bo")).await;
    ws_send(&mut stream, &ClientAction::Start).await;
    let _ = ws_read_until(&mut stream, "UPDATE_PLAYERS").await;

    let body = eventually_json(&server, "/api/v1/rooms/detail", |b| b["phase"] == "running").await;
    assert_eq!(body["name"], "detail");
    assert_eq!(body["round"], 1);
    assert_eq!(body["players"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["players"][0]["name"], "Ada");
}

#[tokio::test]
async fn unknown_room_is_404() {
    let server = TestServer::new().await;
    let (status, body) = get_json(&server, "/api/v1/rooms/nowhere").await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("nowhere"));

    assert_eq!(post(&server, "/api/v1/rooms/nowhere/pause").await, 404);
}

#[tokio::test]
async fn invalid_room_name_is_400() {
    let server = TestServer::new().await;
    assert_eq!(post(&server, "/api/v1/rooms/no%20way/pause").await, 400);
}

#[tokio::test]
async fn pause_and_resume_a_room() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url("sleepy")).await;
    let _ = ws_read(&mut stream).await;

    assert_eq!(post(&server, "/api/v1/rooms/sleepy/pause").await, 202);
    eventually_json(&server, "/api/v1/rooms/sleepy", |b| b["paused"] == true).await;

    assert_eq!(post(&server, "/api/v1/rooms/sleepy/resume").await, 202);
    eventually_json(&server, "/api/v1/rooms/sleepy", |b| b["paused"] == false).await;
}
