//! Integration tests for the HTTP admin endpoint.
//!
//! cargo test --test api

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;

use udpt::apis::server;
use udpt::config::ephemeral_configuration;
use udpt::tracker::Tracker;

const SAMPLE_INFO_HASH: &str = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0";

struct RunningApi {
    bind_address: SocketAddr,
    tracker: Arc<Tracker>,
    _shutdown: watch::Sender<bool>,
}

async fn start_api_server(is_dynamic: bool) -> RunningApi {
    let mut configuration = ephemeral_configuration();
    configuration.tracker.is_dynamic = is_dynamic;

    let config = Arc::new(configuration);
    let tracker = Arc::new(Tracker::new(&config).expect("tracker should be created"));

    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let (bind_address, server) =
        server::start("127.0.0.1:0".parse().unwrap(), tracker.clone(), shutdown_receiver).expect("api server should bind");

    tokio::spawn(server);

    RunningApi {
        bind_address,
        tracker,
        _shutdown: shutdown_sender,
    }
}

fn url(running: &RunningApi, path: &str) -> String {
    format!("http://{}{}", running.bind_address, path)
}

#[tokio::test]
async fn the_home_page_identifies_the_tracker() {
    let running = start_api_server(true).await;

    let response = reqwest::get(url(&running, "/")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("udpt"));
}

#[tokio::test]
async fn the_announce_page_tells_http_clients_to_use_udp() {
    let running = start_api_server(true).await;

    let response = reqwest::get(url(&running, "/announce")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "d14:failure reason41:udpt: This is a udp tracker, not HTTP(s).e"
    );
}

#[tokio::test]
async fn adding_a_torrent_registers_it_on_the_tracker() {
    let running = start_api_server(false).await;

    let response = reqwest::Client::new()
        .post(url(&running, &format!("/api/torrents?info_hash={SAMPLE_INFO_HASH}")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["result"], "Okay");
    assert!(body.get("note").is_none());

    assert!(running.tracker.is_info_hash_allowed(&SAMPLE_INFO_HASH.parse().unwrap()).await);
}

#[tokio::test]
async fn a_mutation_on_a_dynamic_tracker_reports_the_mode() {
    let running = start_api_server(true).await;

    let response = reqwest::Client::new()
        .post(url(&running, &format!("/api/torrents?info_hash={SAMPLE_INFO_HASH}")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["result"], "Okay");
    assert_eq!(body["note"], "tracker is in dynamic mode.");
}

#[tokio::test]
async fn removing_a_torrent_unregisters_it() {
    let running = start_api_server(false).await;
    let client = reqwest::Client::new();

    client
        .post(url(&running, &format!("/api/torrents?info_hash={SAMPLE_INFO_HASH}")))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(url(&running, &format!("/api/torrents?info_hash={SAMPLE_INFO_HASH}")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(!running.tracker.is_info_hash_allowed(&SAMPLE_INFO_HASH.parse().unwrap()).await);
}

#[tokio::test]
async fn a_missing_info_hash_parameter_is_a_bad_request() {
    let running = start_api_server(false).await;

    let response = reqwest::Client::new().post(url(&running, "/api/torrents")).send().await.unwrap();

    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("info_hash"));
}

#[tokio::test]
async fn an_info_hash_of_the_wrong_length_is_a_bad_request() {
    let running = start_api_server(false).await;

    let response = reqwest::Client::new()
        .post(url(&running, "/api/torrents?info_hash=abcdef"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "info_hash length is incorrect.");
}

#[tokio::test]
async fn a_non_hexadecimal_info_hash_is_a_bad_request() {
    let running = start_api_server(false).await;

    let response = reqwest::Client::new()
        .post(url(&running, &format!("/api/torrents?info_hash={}", "Z".repeat(40))))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn the_torrent_list_reports_every_known_swarm() {
    use std::net::SocketAddr;

    use udpt::protocol::clock::current_timestamp;
    use udpt::protocol::common::{AnnounceEvent, NumberOfBytes, PeerId};
    use udpt::tracker::peer::Peer;

    let running = start_api_server(true).await;

    let peer = Peer {
        peer_id: PeerId(*b"-qB00000000000000000"),
        peer_addr: "126.0.0.1:6881".parse::<SocketAddr>().unwrap(),
        updated: current_timestamp(),
        uploaded: NumberOfBytes(0),
        downloaded: NumberOfBytes(0),
        left: NumberOfBytes(100),
        event: AnnounceEvent::Started,
    };
    running
        .tracker
        .update_torrent_with_peer_and_get_stats(&SAMPLE_INFO_HASH.parse().unwrap(), &peer)
        .await;

    let response = reqwest::get(url(&running, "/api/torrents")).await.unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let torrents = body.as_array().unwrap();
    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0]["info_hash"], SAMPLE_INFO_HASH);
    assert_eq!(torrents[0]["leechers"], 1);
    assert_eq!(torrents[0]["seeders"], 0);
}

#[tokio::test]
async fn the_stats_endpoint_reports_swarm_totals() {
    let running = start_api_server(true).await;

    let response = reqwest::get(url(&running, "/api/stats")).await.unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["torrents"], 0);
    assert_eq!(body["udp4_connections_handled"], 0);
}

#[tokio::test]
async fn an_unknown_path_is_not_found() {
    let running = start_api_server(true).await;

    let response = reqwest::get(url(&running, "/no-such-page")).await.unwrap();

    assert_eq!(response.status(), 404);
}
