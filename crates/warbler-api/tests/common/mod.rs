#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use warbler_api::auth::create_token;
use warbler_api::middleware::CURR_USER_KEY;
use warbler_api::{AppState, AppStateInner, router};
use warbler_db::{Database, NewUser, UserRow};
use warbler_types::models::ProfileStats;

pub const TEST_SECRET: &str = "test_secret";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub fn test_app() -> TestApp {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: TEST_SECRET.to_string(),
        session_days: 1,
    });
    TestApp {
        router: router(state.clone()),
        state,
    }
}

impl TestApp {
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Inserts a user straight into the database, password "password".
    pub fn signup(&self, username: &str, email: &str) -> UserRow {
        let user = NewUser::signup(username, email, "password", None).unwrap();
        self.db().insert_user(&user).unwrap()
    }

    /// Session cookie value for `user`, as if they had logged in.
    pub fn session_for(&self, user: &UserRow) -> String {
        create_token(TEST_SECRET, user.id, &user.username, 1).unwrap()
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = session {
            builder = builder.header(header::COOKIE, format!("{CURR_USER_KEY}={token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        self.request("GET", uri, session, None).await
    }

    pub async fn post(&self, uri: &str, session: Option<&str>, body: Option<Value>) -> Response<Body> {
        self.request("POST", uri, session, body).await
    }

    /// Follows redirects with GET, carrying the session and any cookies the
    /// responses set. Returns the final status and body.
    pub async fn follow_redirects(
        &self,
        mut resp: Response<Body>,
        session: Option<&str>,
    ) -> (StatusCode, String) {
        let mut hops = 0;
        while resp.status().is_redirection() {
            hops += 1;
            assert!(hops < 10, "redirect loop");

            let location = resp
                .headers()
                .get(header::LOCATION)
                .expect("redirect without location")
                .to_str()
                .unwrap()
                .to_string();

            let mut cookies: Vec<String> = set_cookies(&resp)
                .into_iter()
                .filter(|(name, value)| name != CURR_USER_KEY && !value.is_empty())
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            let session_cleared = set_cookies(&resp)
                .iter()
                .any(|(name, value)| name == CURR_USER_KEY && value.is_empty());
            if let (Some(token), false) = (session, session_cleared) {
                cookies.push(format!("{CURR_USER_KEY}={token}"));
            }

            let mut builder = Request::builder().method("GET").uri(location);
            if !cookies.is_empty() {
                builder = builder.header(header::COOKIE, cookies.join("; "));
            }
            resp = self
                .router
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
        }
        let status = resp.status();
        (status, body_string(resp).await)
    }
}

/// `(name, value)` of every Set-Cookie header.
pub fn set_cookies(resp: &Response<Body>) -> Vec<(String, String)> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| {
            let pair = v.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

pub fn usernames(users: &Value) -> Vec<String> {
    users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect()
}

/// Profile counters in display order: messages, following, followers, likes.
pub fn stat_counts(stats: &ProfileStats) -> [i64; 4] {
    [stats.messages, stats.following, stats.followers, stats.likes]
}
