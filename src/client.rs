//! The remote document/block API. [`BlockSource`] and [`PageSource`] are the
//! seams the rest of the crate depends on; [`NotionClient`] implements both
//! over HTTPS.

use crate::config::NotionSettings;
use crate::raw::{null_as_default, ChildrenPage, PageObject, QueryPage, RawBlock};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2025-09-03";

/// The number of children requested per "list children" call.
pub const CHILDREN_PAGE_SIZE: u32 = 50;

/// Lists the children of a block, one page at a time.
#[async_trait]
pub trait BlockSource {
    /// Fetches one page of `block_id`'s children. `cursor` is the
    /// `next_cursor` of the previous page, or `None` for the first page.
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage>;
}

/// Queries data-source rows and retrieves page metadata.
#[async_trait]
pub trait PageSource {
    async fn query_data_source(
        &self,
        data_source_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryPage>;

    async fn retrieve_page(&self, page_id: &str) -> Result<PageObject>;
}

/// The body of a data-source query.
#[derive(Clone, Debug, Default, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,

    pub page_size: u32,
}

/// A [`BlockSource`] and [`PageSource`] backed by the Notion HTTP API.
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    /// Builds a client authenticated with the API key from `settings`.
    pub fn new(settings: &NotionSettings) -> Result<NotionClient> {
        let mut headers = HeaderMap::new();
        let mut auth =
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
                .map_err(|_| Error::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            "notion-version",
            HeaderValue::from_static(NOTION_VERSION),
        );

        Ok(NotionClient {
            http: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
            base_url: API_BASE.to_owned(),
        })
    }
}

/// The raw "list children" response. Results are decoded one by one so that
/// partial block objects (no `type`) and blocks that don't decode are skipped
/// without losing their siblings.
#[derive(Deserialize)]
struct ListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    results: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl ListResponse {
    fn into_page(self) -> ChildrenPage {
        let mut results = Vec::with_capacity(self.results.len());
        for value in self.results {
            if value.get("type").is_none() {
                continue;
            }
            match serde_json::from_value::<RawBlock>(value) {
                Ok(block) => results.push(block),
                Err(err) => log::warn!("skipping undecodable block: {}", err),
            }
        }
        ChildrenPage {
            results,
            has_more: self.has_more,
            next_cursor: self.next_cursor,
        }
    }
}

#[async_trait]
impl BlockSource for NotionClient {
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage> {
        let mut request = self
            .http
            .get(format!("{}/blocks/{}/children", self.base_url, block_id))
            .query(&[("page_size", CHILDREN_PAGE_SIZE.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("start_cursor", cursor)]);
        }
        let response: ListResponse =
            request.send().await?.error_for_status()?.json().await?;
        Ok(response.into_page())
    }
}

#[async_trait]
impl PageSource for NotionClient {
    async fn query_data_source(
        &self,
        data_source_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryPage> {
        Ok(self
            .http
            .post(format!(
                "{}/data_sources/{}/query",
                self.base_url, data_source_id
            ))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<PageObject> {
        Ok(self
            .http
            .get(format!("{}/pages/{}", self.base_url, page_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

/// The result of a remote API call.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed remote API call.
#[derive(Debug)]
pub enum Error {
    /// Returned when the request could not be sent, the server answered with
    /// an error status, or the body could not be read.
    Http(reqwest::Error),

    /// Returned when a response body doesn't have the expected shape.
    Decode(serde_json::Error),

    /// Returned when the API key can't be used as a header value.
    InvalidApiKey,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http(err) => err.fmt(f),
            Error::Decode(err) => write!(f, "decoding response: {}", err),
            Error::InvalidApiKey => {
                write!(f, "API key contains invalid header characters")
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Decode(err) => Some(err),
            Error::InvalidApiKey => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    /// Converts a [`reqwest::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator on requests.
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Decode(err)
    }
}
