//! Upstream client, live sources and fallback chain against mock APIs.

use std::sync::Arc;
use std::time::Duration;

use lib_common::core::{FallbackChain, OperationMode};
use lib_common::retrieve::ApiClient;
use lib_common::sources::{
    JolpicaClient, JolpicaSource, LiveSource, OpenF1Query, OpenF1Source, SimulationSource,
};
use lib_common::FeedError;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(2);

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn client_classifies_failures() {
    let server = MockServer::start().await;
    mount_json(&server, "/ok", json!({"status": "ok"})).await;
    Mock::given(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    Mock::given(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new("mock", &server.uri(), Duration::from_millis(200)).unwrap();

    assert_eq!(client.get_json("ok", &[]).await.unwrap(), json!({"status": "ok"}));
    assert!(matches!(
        client.get_json("down", &[]).await,
        Err(FeedError::Status { status: 503, .. })
    ));
    assert!(matches!(
        client.get_json("garbage", &[]).await,
        Err(FeedError::Decode { .. })
    ));
    let slow = client.get_json("slow", &[]).await.unwrap_err();
    assert!(slow.is_transport(), "expected timeout, got {:?}", slow);
}

#[tokio::test]
async fn client_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    mount_json(&server, "/new", json!([1, 2, 3])).await;

    let client = ApiClient::new("mock", &server.uri(), TIMEOUT).unwrap();
    assert_eq!(client.get_json("old", &[]).await.unwrap(), json!([1, 2, 3]));
}

async fn mount_openf1_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .and(query_param("meeting_name", "Las Vegas"))
        .and(query_param("year", "2024"))
        .and(query_param("session_name", "Race"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"session_key": 9644, "date_start": "2024-11-23T06:00:00+00:00"}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn openf1_joins_the_session_collections() {
    let server = MockServer::start().await;
    mount_openf1_session(&server).await;

    for (route, body) in [
        ("/v1/laps", json!([{"lap_number": 33}, {"lap_number": 34}])),
        (
            "/v1/position",
            json!([
                {"driver_number": 1, "position": 2, "date": "2024-11-23T06:40:00"},
                {"driver_number": 63, "position": 1, "date": "2024-11-23T06:40:00"},
                {"driver_number": 1, "position": 1, "date": "2024-11-23T06:50:00"},
                {"driver_number": 63, "position": 2, "date": "2024-11-23T06:50:00"}
            ]),
        ),
        (
            "/v1/intervals",
            json!([{"driver_number": 63, "interval": 4.1, "date": "2024-11-23T06:50:00"}]),
        ),
        (
            "/v1/drivers",
            json!([
                {"driver_number": 1, "name_acronym": "VER", "team_name": "Red Bull Racing"},
                {"driver_number": 63, "name_acronym": "RUS", "team_name": "Mercedes"}
            ]),
        ),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("session_key", "9644"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let source = OpenF1Source::new(&format!("{}/v1", server.uri()), TIMEOUT, OpenF1Query::default()).unwrap();
    let record = source.fetch().await.unwrap();

    assert_eq!(record["source"], "openf1");
    assert_eq!(record["lap"], 34);
    assert_eq!(record["drivers"][0]["code"], "VER");
    assert_eq!(record["drivers"][0]["lapTime"], "LEAD");
    assert_eq!(record["drivers"][1]["code"], "RUS");
    assert_eq!(record["drivers"][1]["team"], "mercedes");
    assert_eq!(record["drivers"][1]["lapTime"], "+4.100");
}

#[tokio::test]
async fn openf1_without_a_session_is_no_session_found() {
    let server = MockServer::start().await;
    mount_json(&server, "/v1/sessions", json!([])).await;

    let source = OpenF1Source::new(&format!("{}/v1", server.uri()), TIMEOUT, OpenF1Query::default()).unwrap();
    assert!(matches!(
        source.fetch().await,
        Err(FeedError::NoSessionFound { .. })
    ));
}

#[tokio::test]
async fn openf1_failed_sub_request_fails_the_attempt() {
    let server = MockServer::start().await;
    mount_openf1_session(&server).await;
    mount_json(&server, "/v1/laps", json!([])).await;
    Mock::given(path("/v1/position"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = OpenF1Source::new(&format!("{}/v1", server.uri()), TIMEOUT, OpenF1Query::default()).unwrap();
    assert!(matches!(
        source.fetch().await,
        Err(FeedError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn jolpica_lookups_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ergast/f1/2024.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MRData": {"RaceTable": {"Races": [{"raceName": "Bahrain GP"}]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = JolpicaClient::new(
        &format!("{}/ergast/f1", server.uri()),
        TIMEOUT,
        Duration::from_secs(60),
    )
    .unwrap();

    let first = client.get_schedule("2024").await.unwrap();
    let second = client.get_schedule("2024").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first["MRData"]["RaceTable"]["Races"][0]["raceName"],
        "Bahrain GP"
    );
    // `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn jolpica_source_reads_latest_results() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/ergast/f1/current/last/results.json",
        json!({"MRData": {"RaceTable": {"Races": [{
            "raceName": "Qatar Grand Prix", "season": "2024", "round": "23", "date": "2024-12-01",
            "Results": [
                {"position": "1", "laps": "57", "Driver": {"driverId": "max_verstappen", "code": "VER"},
                 "Constructor": {"constructorId": "red_bull"}, "Time": {"time": "1:31:05.323"}},
                {"position": "2", "laps": "57", "Driver": {"driverId": "leclerc", "code": "LEC"},
                 "Constructor": {"constructorId": "ferrari"}, "Time": {"time": "+6.031"}}
            ]
        }]}}}),
    )
    .await;

    let client = Arc::new(
        JolpicaClient::new(&format!("{}/ergast/f1", server.uri()), TIMEOUT, Duration::from_secs(60)).unwrap(),
    );
    let record = JolpicaSource::new(client, "current").fetch().await.unwrap();

    assert_eq!(record["race"], "Qatar Grand Prix");
    assert_eq!(record["totalLaps"], 57);
    assert_eq!(record["drivers"][1]["lapTime"], "+6.031");
}

#[tokio::test]
async fn chain_falls_back_to_simulation_when_both_apis_are_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let openf1 = OpenF1Source::new(&format!("{}/v1", server.uri()), TIMEOUT, OpenF1Query::default()).unwrap();
    let jolpica = Arc::new(
        JolpicaClient::new(&format!("{}/ergast/f1", server.uri()), TIMEOUT, Duration::from_secs(60)).unwrap(),
    );
    let sources: Vec<Box<dyn LiveSource>> = vec![
        Box::new(openf1) as Box<dyn LiveSource>,
        Box::new(JolpicaSource::new(jolpica, "current")) as Box<dyn LiveSource>,
    ];
    let chain = FallbackChain::new(sources, SimulationSource::new());

    let record = chain.collect_live().await;
    let drivers = record["drivers"].as_array().unwrap();

    assert!(!drivers.is_empty());
    assert_eq!(drivers[0]["position"], 1);
    assert_eq!(drivers[0]["lapTime"], "LEAD");
    assert_eq!(chain.current_mode(), OperationMode::Simulated);
}
