mod common;

use axum::{
    body::Body,
    http::{Response, StatusCode, header},
};
use common::{TestApp, body_bytes};

fn header_str(response: &Response<Body>, name: header::HeaderName) -> &str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn csv_export_lists_entries_oldest_first() {
    let app = TestApp::new().await;
    let session = app.login_as("alice", "pw").await;
    app.create_entry(&session, "Second, with comma", "2024-02-01", "8", "b, a")
        .await;
    app.create_entry(&session, "First", "2024-01-01", "2", "").await;

    let response = app.get("/export/csv", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/csv");
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"diary_entries.csv\""
    );

    let bytes = body_bytes(response).await;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        ["Date", "Title", "Content", "Mood Rating", "Tags"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "2024-01-01");
    assert_eq!(&rows[0][1], "First");
    assert_eq!(&rows[0][4], "");
    assert_eq!(&rows[1][1], "Second, with comma");
    assert_eq!(&rows[1][2], "Some thoughts.");
    assert_eq!(&rows[1][3], "8");
    assert_eq!(&rows[1][4], "a,b");
}

#[tokio::test]
async fn csv_export_excludes_other_users() {
    let app = TestApp::new().await;
    let alice = app.login_as("alice", "pw").await;
    let bob = app.login_as("bob", "pw").await;
    app.create_entry(&alice, "Mine", "2024-01-01", "5", "").await;

    let bytes = body_bytes(app.get("/export/csv", Some(&bob)).await).await;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    assert_eq!(reader.records().count(), 0);
}

#[tokio::test]
async fn pdf_export_is_a_pdf_document() {
    let app = TestApp::new().await;
    let session = app.login_as("alice", "pw").await;
    app.create_entry(&session, "Walk", "2024-01-05", "4", "calm").await;

    let response = app.get("/export/pdf", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "application/pdf");
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"diary_entries.pdf\""
    );

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn pdf_export_without_entries_still_renders() {
    let app = TestApp::new().await;
    let session = app.login_as("alice", "pw").await;

    let response = app.get("/export/pdf", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn unknown_export_format_is_not_found() {
    let app = TestApp::new().await;
    let session = app.login_as("alice", "pw").await;

    for uri in ["/export/xml", "/export/CSV", "/export/"] {
        let response = app.get(uri, Some(&session)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
