use std::time::Duration;

use cooking_core::{BundleType, StatusUpdate, TaskKey, TaskStatus};
use cooking_engine::{
    CookRequest, FailureKind, LinkState, ReqwestVaultClient, VaultClient, VaultSettings,
};
use reqwest::Url;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestVaultClient {
    let mut settings = VaultSettings::new(Url::parse(&server.uri()).unwrap());
    settings.csrf_token = Some("csrf-secret".to_string());
    ReqwestVaultClient::new(settings).unwrap()
}

fn flat_key() -> TaskKey {
    TaskKey::new(BundleType::Flat, "swh:1:dir:abc")
}

#[tokio::test]
async fn cook_posts_with_email_and_csrf_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/1/vault/flat/swh:1:dir:abc/"))
        .and(query_param("email", "dev@example.org"))
        .and(header("x-csrftoken", "csrf-secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = CookRequest::new(flat_key(), Some("dev@example.org".to_string()));
    client.request_cook(&request).await.expect("cook ok");
}

#[tokio::test]
async fn cook_reports_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/1/vault/git-bare/swh:1:rev:def/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = CookRequest::new(TaskKey::new(BundleType::GitBare, "swh:1:rev:def"), None);
    let err = client.request_cook(&request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn status_decodes_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1/vault/flat/swh:1:dir:abc/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 12,
            "status": "done",
            "swhid": "swh:1:dir:abc",
            "fetch_url": "https://vault.example.org/abc.tar.gz",
            "progress_message": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let update = client.cook_status(&flat_key()).await.expect("status ok");
    assert_eq!(
        update,
        StatusUpdate::new(TaskStatus::Done).with_fetch_url("https://vault.example.org/abc.tar.gz")
    );
}

#[tokio::test]
async fn status_rejects_unknown_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1/vault/flat/swh:1:dir:abc/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "exploded"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .cook_status(&flat_key())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn status_times_out_on_slow_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(serde_json::json!({"status": "pending"})),
        )
        .mount(&server)
        .await;

    let mut settings = VaultSettings::new(Url::parse(&server.uri()).unwrap());
    settings.request_timeout = Duration::from_millis(50);
    let client = ReqwestVaultClient::new(settings).unwrap();

    let err = client.cook_status(&flat_key()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn probe_distinguishes_live_and_dead_links() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/bundles/live.tar.gz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/bundles/dead.tar.gz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let live = format!("{}/bundles/live.tar.gz", server.uri());
    let dead = format!("{}/bundles/dead.tar.gz", server.uri());
    assert_eq!(client.probe(&live).await.unwrap(), LinkState::Alive);
    assert_eq!(
        client.probe(&dead).await.unwrap(),
        LinkState::Dead { status: 404 }
    );
}

#[tokio::test]
async fn probe_falls_back_to_get_when_head_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/bundles/abc.tar.gz"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bundles/abc.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tarball".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/bundles/abc.tar.gz", server.uri());
    assert_eq!(
        client_for(&server).probe(&url).await.unwrap(),
        LinkState::Alive
    );
}

#[tokio::test]
async fn probe_rejects_invalid_url() {
    let server = MockServer::start().await;
    let err = client_for(&server).probe("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn download_streams_bundle_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bundles/abc.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tarball bytes".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let out = temp.path().join("downloads");
    let url = format!("{}/bundles/abc.tar.gz", server.uri());

    let written = client_for(&server)
        .download_bundle(&url, &out)
        .await
        .expect("download ok");
    assert_eq!(written, out.join("abc.tar.gz"));
    assert_eq!(std::fs::read(&written).unwrap(), b"tarball bytes");
}
