use log::*;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::Error;
use crate::session::Session;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const ACCESS_TOKEN_COOKIE: &str = "access-token";

/// Characters of the token shown in diagnostics.
const TOKEN_PREVIEW_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

impl UserCredentials {
    pub fn new(email: &str, password: &str) -> Result<Self, Error> {
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidCredentials(
                "email and password must both be non-empty".to_string(),
            ));
        }
        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Parses `email:password`. The password may itself contain colons.
    pub fn parse(input: &str) -> Result<Self, Error> {
        match input.split_once(':') {
            Some((email, password)) => Self::new(email, password),
            None => Err(Error::InvalidCredentials(
                "expected email:password".to_string(),
            )),
        }
    }
}

/// Bearer credential read from the `access-token` cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Leading characters only, safe to print.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(TOKEN_PREVIEW_LEN).collect();
        format!("{}...", head)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.preview()).finish()
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub session: Session,
    pub token: Option<AccessToken>,
    pub username: Option<String>,
}

impl LoginOutcome {
    pub fn require_token(&self) -> Result<&AccessToken, Error> {
        self.token.as_ref().ok_or(Error::MissingToken)
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Logs in with a fresh session. The returned session keeps every cookie the
/// login response set, so later calls also authenticate by cookie.
pub async fn login(base_url: &str, credentials: &UserCredentials) -> Result<LoginOutcome, Error> {
    let session = Session::new(base_url)?;

    debug!("POST {} as {}", session.url(LOGIN_PATH), credentials.email);

    let response = session
        .context(None)
        .request(Method::POST, LOGIN_PATH)
        .json(&LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        })
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        return Err(Error::Status {
            operation: "Login",
            status,
            body,
            details: None,
        });
    }

    let token = response
        .cookies()
        .find(|cookie| cookie.name() == ACCESS_TOKEN_COOKIE)
        .map(|cookie| AccessToken::new(cookie.value()));

    let body = response.text().await?;
    let username = username_from_body(&body);

    match &token {
        Some(token) => debug!("Login issued token {}", token.preview()),
        None => warn!("Login succeeded without an {} cookie", ACCESS_TOKEN_COOKIE),
    }

    Ok(LoginOutcome {
        session,
        token,
        username,
    })
}

fn username_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["user"]["username"].as_str().map(str::to_string)
}
