//! HTTP adapter for the search provider.
//!
//! Talks to a JSON gateway in front of the X web API:
//!
//! - `POST {base}/auth/login` with `{auth_info_1, auth_info_2, password}`
//! - `GET {base}/account/me`
//! - `GET {base}/search?q=..&product=Top|Latest[&cursor=..]`
//!
//! Session cookies travel in a `Cookie` header. Raw wire objects are
//! validated here and converted into [`Post`]s; nothing untyped leaves this
//! module.

use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::model::{Cursor, Post, Ranking, ResultPage};
use crate::provider::{
    Credentials, Identity, ProviderError, ProviderResult, SearchProvider, Session,
};

/// Default gateway address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8710";

/// `SearchProvider` backed by `reqwest`.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    auth_info_1: &'a str,
    auth_info_2: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    cookies: BTreeMap<String, String>,
    #[serde(default)]
    screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tweets: Vec<WireTweet>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTweet {
    id: Option<String>,
    text: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    retweet_count: Option<u64>,
    #[serde(default)]
    favorite_count: Option<u64>,
    user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    name: Option<String>,
    screen_name: Option<String>,
}

impl WireTweet {
    /// Convert to a [`Post`], or `None` if text or author is missing.
    fn into_post(self) -> Option<Post> {
        let text = self.full_text.or(self.text)?;
        let user = self.user?;
        let author_name = user.name.or(user.screen_name)?;
        Some(Post {
            id: self.id.unwrap_or_default(),
            author_name,
            text,
            created_at: self.created_at.unwrap_or_default(),
            retweet_count: self.retweet_count.unwrap_or(0),
            favorite_count: self.favorite_count.unwrap_or(0),
        })
    }
}

impl SearchResponse {
    fn into_page(self, term: &str, ranking: Ranking) -> ResultPage {
        let total = self.tweets.len();
        let posts: Vec<Post> = self
            .tweets
            .into_iter()
            .filter_map(WireTweet::into_post)
            .collect();
        let skipped = total - posts.len();
        if skipped > 0 {
            debug!(skipped, "Dropped posts missing text or author");
        }
        let next = self
            .next_cursor
            .filter(|token| !token.is_empty())
            .map(|token| Cursor {
                term: term.to_string(),
                ranking,
                token,
            });
        ResultPage {
            posts,
            next,
            skipped,
        }
    }
}

/// Pull `name=value` pairs out of `Set-Cookie` headers.
fn cookies_from_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

impl HttpProvider {
    /// Create a provider for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (invalid
    /// language header or TLS backend failure).
    pub fn new(base_url: &str, language: &str, timeout: Duration) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        let lang = HeaderValue::from_str(language)
            .map_err(|e| ProviderError::Network(format!("invalid language '{language}': {e}")))?;
        headers.insert(ACCEPT_LANGUAGE, lang);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, &str)],
    ) -> ProviderResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let resp = self
            .client
            .get(self.url(path))
            .header(COOKIE, session.cookie_header())
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_page(
        &self,
        session: &Session,
        term: &str,
        ranking: Ranking,
        cursor: Option<&str>,
    ) -> ProviderResult<ResultPage> {
        let mut query = vec![("q", term), ("product", ranking.as_str())];
        if let Some(token) = cursor {
            query.push(("cursor", token));
        }
        let response: SearchResponse = self.get_json(session, "/search", &query).await?;
        Ok(response.into_page(term, ranking))
    }
}

#[async_trait]
impl SearchProvider for HttpProvider {
    async fn login(&self, credentials: &Credentials) -> ProviderResult<Session> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                auth_info_1: &credentials.username,
                auth_info_2: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let mut cookies = cookies_from_headers(resp.headers());
        let body = resp.text().await?;
        let login: LoginResponse = if body.trim().is_empty() {
            LoginResponse::default()
        } else {
            serde_json::from_str(&body)?
        };
        cookies.extend(login.cookies);

        if cookies.is_empty() {
            return Err(ProviderError::Unauthorized {
                status: status.as_u16(),
                message: "login response carried no session cookies".to_string(),
            });
        }

        Ok(Session {
            cookies,
            screen_name: login.screen_name,
        })
    }

    async fn probe(&self, session: &Session) -> ProviderResult<Identity> {
        self.get_json(session, "/account/me", &[]).await
    }

    async fn search(
        &self,
        session: &Session,
        term: &str,
        ranking: Ranking,
    ) -> ProviderResult<ResultPage> {
        self.fetch_page(session, term, ranking, None).await
    }

    async fn next_page(&self, session: &Session, cursor: &Cursor) -> ProviderResult<ResultPage> {
        self.fetch_page(session, &cursor.term, cursor.ranking, Some(&cursor.token))
            .await
    }
}
