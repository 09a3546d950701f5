use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};

use crate::auth::AccessToken;
use crate::error::Error;

/// A cookie-carrying HTTP client bound to one frontend.
///
/// Each scenario run owns its own session; cookies set by one run are never
/// visible to another.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    base_url: String,
}

impl Session {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Pairs this session with an optional bearer token.
    pub fn context<'a>(&'a self, token: Option<&'a AccessToken>) -> RequestContext<'a> {
        RequestContext {
            session: self,
            token,
        }
    }
}

/// Everything a profile request needs, passed by value instead of mutated in place.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    session: &'a Session,
    token: Option<&'a AccessToken>,
}

impl<'a> RequestContext<'a> {
    pub fn token(&self) -> Option<&'a AccessToken> {
        self.token
    }

    /// Starts a JSON request. Without a token the session cookies are the only credential.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .session
            .client()
            .request(method, self.session.url(path))
            .header(CONTENT_TYPE, "application/json");

        match self.token {
            Some(token) => builder.header(AUTHORIZATION, token.bearer()),
            None => builder,
        }
    }
}
