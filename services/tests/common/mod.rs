//! Shared test utilities for integration tests.
//!
//! Every test drives the full router over the in-memory storages, so no database is
//! needed. Sessions are carried by hand through the `Cookie` header.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use diary_services::{
    config::Config,
    database::MockSqlStorage,
    routes,
    users::{MockUserStorage, session::SESSION_COOKIE},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub sql_storage: MockSqlStorage,
    pub user_storage: MockUserStorage,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_storages(MockSqlStorage::new(), MockUserStorage::new()).await
    }

    pub async fn with_storages(sql_storage: MockSqlStorage, user_storage: MockUserStorage) -> Self {
        let router = routes(
            sql_storage.clone(),
            user_storage.clone(),
            Config::new_for_test(),
        )
        .await;

        Self {
            router,
            sql_storage,
            user_storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        self.send(get_request(uri, session)).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        session: Option<&str>,
    ) -> Response<Body> {
        self.send(form_request(uri, fields, session)).await
    }

    /// Register and log in, returning the `name=value` session cookie.
    pub async fn login_as(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form("/signup", &[("username", username), ("password", password)], None)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = self
            .post_form("/login", &[("username", username), ("password", password)], None)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        session_cookie(&response).expect("login should set a session cookie")
    }

    /// Submit the new-entry form and expect a redirect home.
    pub async fn create_entry(
        &self,
        session: &str,
        title: &str,
        date: &str,
        mood: &str,
        tags: &str,
    ) {
        let response = self
            .post_form(
                "/entry/new",
                &[
                    ("title", title),
                    ("content", "Some thoughts."),
                    ("date", date),
                    ("mood_rating", mood),
                    ("tags", tags),
                ],
                Some(session),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "creating {title}");
    }
}

pub fn get_request(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = session {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_request(uri: &str, fields: &[(&str, &str)], session: Option<&str>) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, NON_ALPHANUMERIC),
                utf8_percent_encode(value, NON_ALPHANUMERIC)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = session {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// The `diary_session=...` pair from a response's `Set-Cookie` headers.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(|value| value.split(';').next().unwrap_or_default().to_owned())
        .next()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json<T: DeserializeOwned>(response: Response<Body>) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
