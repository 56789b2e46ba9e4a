//! End-to-end tests for the Dashboard controller against a mocked analyzer

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skyfell::app::state::LOAD_FAILURE_MESSAGE;
use skyfell::app::{ApiClient, Dashboard, DashboardState, Phase, SubmitRejection};

fn record(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("https://site-{id}.test/"),
        "title": title,
        "meta": "",
        "htmlVersion": "HTML5",
        "headings": {"h1": 1},
        "internalLinks": 1,
        "externalLinks": 0,
        "brokenLinks": 0,
        "loginForm": false
    })
}

fn ids(dashboard: &Dashboard) -> Vec<i64> {
    dashboard.state().pages().iter().map(|page| page.id).collect()
}

async fn mount_pages(server: &MockServer, body: serde_json::Value, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

fn dashboard_for(server: &MockServer) -> Dashboard {
    Dashboard::new(ApiClient::new(&server.uri()).unwrap())
}

#[tokio::test]
async fn test_mount_loads_records_in_server_order() {
    let mock_server = MockServer::start().await;
    mount_pages(
        &mock_server,
        json!([record(7, "Seven"), record(2, "Two"), record(5, "Five")]),
        None,
    )
    .await;

    let mut dashboard = dashboard_for(&mock_server);
    assert_eq!(dashboard.state().phase(), Phase::Idle);

    dashboard.mount();
    dashboard.next_event().await;

    assert_eq!(ids(&dashboard), vec![7, 2, 5]);
    assert_eq!(dashboard.state().phase(), Phase::Loaded);
    assert!(dashboard.state().last_synced().is_some());
    assert!(!dashboard.state().is_loading());
}

#[tokio::test]
async fn test_mount_against_empty_analyzer_has_no_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.next_event().await;

    assert!(dashboard.state().pages().is_empty());
    assert!(dashboard.state().error_message().is_empty());
    assert_eq!(dashboard.state().phase(), Phase::Loaded);
}

#[tokio::test]
async fn test_mount_failure_shows_fixed_message() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.next_event().await;

    assert!(dashboard.state().pages().is_empty());
    assert_eq!(dashboard.state().error_message(), LOAD_FAILURE_MESSAGE);
    assert_eq!(dashboard.state().phase(), Phase::Error);
}

#[tokio::test]
async fn test_mount_runs_the_loader_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(1, "One")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.mount();
    dashboard.next_event().await;

    assert_eq!(ids(&dashboard), vec![1]);
    assert_eq!(dashboard.drain(), 0);
}

#[tokio::test]
async fn test_successful_submit_refreshes_and_clears_input() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, json!([record(1, "One")]), Some(1)).await;
    mount_pages(
        &mock_server,
        json!([record(1, "One"), record(2, "Two")]),
        None,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .and(body_json(json!({"url": "https://site-2.test/"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.next_event().await;
    assert_eq!(ids(&dashboard), vec![1]);

    dashboard.state_mut().set_url_input("https://site-2.test/");
    dashboard.submit().unwrap();
    assert!(dashboard.state().is_loading());
    assert_eq!(dashboard.submit(), Err(SubmitRejection::Busy));

    dashboard.next_event().await;
    assert!(!dashboard.state().is_loading());
    assert_eq!(ids(&dashboard), vec![1, 2]);
    assert!(dashboard.state().url_input().is_empty());
    assert!(dashboard.state().error_message().is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    let calls = requests
        .iter()
        .map(|req| format!("{} {}", req.method, req.url.path()))
        .collect::<Vec<_>>();
    assert_eq!(
        calls,
        vec!["GET /api/pages", "POST /api/crawl", "GET /api/pages"]
    );
}

#[tokio::test]
async fn test_failed_submit_keeps_table_and_input() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(1, "One")])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Failed to fetch URL"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.next_event().await;

    dashboard.state_mut().set_url_input("https://down.test/");
    dashboard.submit().unwrap();
    dashboard.next_event().await;

    assert!(!dashboard.state().is_loading());
    assert_eq!(ids(&dashboard), vec![1]);
    assert_eq!(dashboard.state().url_input(), "https://down.test/");
    assert_eq!(
        dashboard.state().error_message(),
        "Failed to crawl URL (HTTP 400: Failed to fetch URL)"
    );
}

#[tokio::test]
async fn test_refresh_failure_after_accepted_crawl() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, json!([record(1, "One")]), Some(1)).await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.next_event().await;

    dashboard.state_mut().set_url_input("https://site-9.test/");
    dashboard.submit().unwrap();
    dashboard.next_event().await;

    assert!(!dashboard.state().is_loading());
    assert_eq!(ids(&dashboard), vec![1]);
    assert_eq!(dashboard.state().url_input(), "https://site-9.test/");
    assert!(dashboard.state().error_message().contains("HTTP 502"));
}

#[tokio::test]
async fn test_submit_clears_previous_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_pages(&mock_server, json!([record(3, "Three")]), None).await;
    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    dashboard.mount();
    dashboard.next_event().await;
    assert_eq!(dashboard.state().error_message(), LOAD_FAILURE_MESSAGE);

    dashboard.state_mut().set_url_input("https://site-3.test/");
    dashboard.submit().unwrap();
    assert!(dashboard.state().error_message().is_empty());

    dashboard.next_event().await;
    assert_eq!(ids(&dashboard), vec![3]);
    assert_eq!(dashboard.state().phase(), Phase::Loaded);
}

#[tokio::test]
async fn test_rejected_input_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server);
    assert_eq!(dashboard.submit(), Err(SubmitRejection::Empty));

    dashboard.state_mut().set_url_input("example");
    assert!(matches!(
        dashboard.submit(),
        Err(SubmitRejection::InvalidUrl(_))
    ));
    assert!(!dashboard.state().is_loading());
}

#[tokio::test]
async fn test_repeated_loads_are_idempotent() {
    let mock_server = MockServer::start().await;
    mount_pages(
        &mock_server,
        json!([record(1, "One"), record(2, "Two")]),
        None,
    )
    .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let mut state = DashboardState::default();

    state.apply_load(client.fetch_pages().await);
    let first = state.pages().to_vec();
    state.apply_load(client.fetch_pages().await);

    assert_eq!(state.pages(), first.as_slice());
    assert_eq!(state.pages().len(), 2);
}

#[tokio::test]
async fn test_dashboards_do_not_share_state() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, json!([record(1, "One")]), None).await;

    let mut first = dashboard_for(&mock_server);
    let mut second = dashboard_for(&mock_server);

    first.mount();
    first.next_event().await;
    first.state_mut().set_url_input("https://only-first.test/");

    assert_eq!(ids(&first), vec![1]);
    assert!(second.state().pages().is_empty());
    assert!(second.state().url_input().is_empty());
    assert_eq!(second.drain(), 0);
}
