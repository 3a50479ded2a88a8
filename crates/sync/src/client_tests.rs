use super::*;
use std::time::Duration;

#[test]
fn disabled_client_treats_mutations_as_no_ops() {
    let client = SyncClient::new("http://127.0.0.1:1", "", "world");
    assert!(!client.enabled());
    assert_eq!(client.pause_folder().unwrap(), true);
    assert_eq!(client.resume_folder().unwrap(), true);
    assert!(client.trigger_scan().is_ok());
}

#[test]
fn get_folder_status_parses_response_body() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/rest/db/status?folder=world")
        .match_header("X-API-Key", "secret")
        .with_status(200)
        .with_body(
            r#"{"state":"idle","globalBytes":100,"localBytes":100,"needBytes":0,"needFiles":0,"errors":0,"pullErrors":0}"#,
        )
        .create();

    let client = SyncClient::new(server.url(), "secret", "world");
    let status = client.get_folder_status().expect("status parses");
    assert!(status.is_synced());
    assert!(!status.has_errors());
}

#[test]
fn get_folder_status_maps_non_success_to_error() {
    let mut server = mockito::Server::new();
    let _m = server.mock("GET", "/rest/db/status?folder=world").with_status(500).create();

    let client = SyncClient::new(server.url(), "secret", "world");
    let err = client.get_folder_status().unwrap_err();
    assert!(matches!(err, SyncError::Error(_)));
}

#[test]
fn pause_folder_is_idempotent_when_already_paused() {
    let mut server = mockito::Server::new();
    let _list = server
        .mock("GET", "/rest/config/folders")
        .with_status(200)
        .with_body(r#"[{"id":"world","paused":true}]"#)
        .create();
    // No PUT mock registered: if pause_folder tried to PUT, the
    // unmatched request would surface as a connection-level error.
    let client = SyncClient::new(server.url(), "secret", "world");
    assert!(client.pause_folder().expect("pause is idempotent"));
}

#[test]
fn pause_folder_not_found_when_folder_missing() {
    let mut server = mockito::Server::new();
    let _list = server.mock("GET", "/rest/config/folders").with_status(200).with_body("[]").create();

    let client = SyncClient::new(server.url(), "secret", "missing");
    let err = client.pause_folder().unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[test]
fn wait_for_sync_returns_false_on_timeout() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/rest/db/status?folder=world")
        .with_status(200)
        .with_body(r#"{"state":"syncing","globalBytes":100,"localBytes":50,"needBytes":50,"needFiles":1,"errors":0,"pullErrors":0}"#)
        .expect_at_least(1)
        .create();

    let client = SyncClient::new(server.url(), "secret", "world");
    let ok = client.wait_for_sync(Duration::from_millis(50), Duration::from_millis(10));
    assert!(!ok);
}
