//! The single operator account and its cookie sessions.

use super::AppState;
use super::notice::Notice;
use super::templates::Page;
use axum::Form;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use parcel_config::AuthConfig;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "parcel_session";

/// Logged-in browsers, by session token.
pub struct Sessions {
    username: String,
    password: String,
    ttl: Duration,
    active: Mutex<HashMap<String, Instant>>,
}

impl Sessions {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            ttl: config.session_ttl(),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session if the credentials match the configured account.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        if username != self.username || password != self.password {
            return None;
        }
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut active = self.active.lock().await;
        active.retain(|_, expires_at| *expires_at > now);
        active.insert(token.clone(), now + self.ttl);
        Some(token)
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        let mut active = self.active.lock().await;
        match active.get(token) {
            Some(expires_at) if *expires_at > Instant::now() => true,
            Some(_) => {
                active.remove(token);
                false
            },
            None => false,
        }
    }

    pub async fn logout(&self, token: &str) {
        self.active.lock().await.remove(token);
    }

    pub async fn is_authenticated(&self, jar: &CookieJar) -> bool {
        match jar.get(SESSION_COOKIE) {
            Some(cookie) => self.is_valid(cookie.value()).await,
            None => false,
        }
    }

    fn cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::seconds(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX));
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }
}

/// Gate for HTML routes: strangers are sent to the login page.
pub async fn require_session(State(state): State<AppState>, jar: CookieJar, request: Request, next: Next) -> Response {
    if state.sessions.is_authenticated(&jar).await {
        return next.run(request).await;
    }
    Redirect::to("/login").into_response()
}

/// Gate for JSON routes: strangers get a 401 they can parse.
pub async fn require_session_json(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if state.sessions.is_authenticated(&jar).await {
        return next.run(request).await;
    }
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Redirect {
    match state.sessions.is_authenticated(&jar).await {
        true => Redirect::to("/dashboard"),
        false => Redirect::to("/login"),
    }
}

pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, notices) = state.notices.take(jar).await;
    (jar, render_login(&state, notices)).into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    match state.sessions.login(&form.username, &form.password).await {
        Some(token) => {
            tracing::info!(username = %form.username, "Logged in");
            (jar.add(state.sessions.cookie(token)), Redirect::to("/dashboard")).into_response()
        },
        None => {
            tracing::warn!(username = %form.username, "Rejected login");
            render_login(&state, vec![Notice::error("Invalid credentials")])
        },
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.logout(cookie.value()).await;
    }
    (jar.remove(Cookie::build(SESSION_COOKIE).path("/")), Redirect::to("/login")).into_response()
}

fn render_login(state: &AppState, notices: Vec<Notice>) -> Response {
    state.templates.respond(
        Page::Login,
        json!({
            "has_notices": !notices.is_empty(),
            "notices": notices,
        }),
    )
}
