//! Defines the [`PostSummary`] and [`Post`] types and the functions that
//! fetch them: [`fetch_post_list`] reads the rows of the posts data source,
//! [`fetch_post_detail`] resolves one post by slug and fetches its content.

use crate::block::{transform_blocks, Block};
use crate::client::{self, BlockSource, PageSource, QueryRequest};
use crate::fetch::fetch_all_blocks;
use crate::raw::PageObject;
use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::cmp::Reverse;
use std::fmt;

/// Rows requested per data-source query.
const QUERY_PAGE_SIZE: u32 = 50;

/// A row of the posts data source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub categories: Vec<String>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub published: bool,
    pub slug: Option<String>,
}

/// A post with its content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub page_id: String,
    pub title: String,
    pub categories: Vec<String>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub blocks: Vec<Block>,
}

/// Fetches every row of the data source, keeps the published ones, and
/// orders them by created date, newest first. Rows without a usable date
/// sort last.
pub async fn fetch_post_list<S>(
    source: &S,
    data_source_id: &str,
) -> Result<Vec<PostSummary>>
where
    S: PageSource + ?Sized,
{
    let mut posts = Vec::new();
    let mut request = QueryRequest {
        page_size: QUERY_PAGE_SIZE,
        ..QueryRequest::default()
    };
    loop {
        let page = source.query_data_source(data_source_id, &request).await?;
        posts.extend(page.results.iter().map(summarize));
        match page.next_cursor {
            Some(cursor) if page.has_more => request.start_cursor = Some(cursor),
            _ => break,
        }
    }

    posts.retain(|post| post.published);
    posts.sort_by_key(|post| Reverse(parse_date(post.created_date.as_deref())));
    Ok(posts)
}

/// Resolves `slug` to a page and returns it with all of its blocks. The page
/// metadata and the blocks are fetched concurrently.
pub async fn fetch_post_detail<P, B>(
    pages: &P,
    blocks: &B,
    data_source_id: &str,
    slug: &str,
) -> Result<Post>
where
    P: PageSource + ?Sized,
    B: BlockSource + ?Sized,
{
    let page_id = page_id_by_slug(pages, data_source_id, slug)
        .await?
        .ok_or_else(|| Error::NotFound(slug.to_owned()))?;

    let (page, raw_blocks) =
        tokio::join!(pages.retrieve_page(&page_id), fetch_all_blocks(blocks, &page_id));
    let page = page?;

    let title = extract_title(&page.properties);
    Ok(Post {
        title: if title.is_empty() {
            "Untitled".to_owned()
        } else {
            title
        },
        categories: extract_categories(&page.properties),
        created_date: extract_date(&page.properties, "createdDate"),
        updated_date: extract_date(&page.properties, "updatedDate"),
        blocks: transform_blocks(raw_blocks),
        page_id,
    })
}

async fn page_id_by_slug<P>(
    pages: &P,
    data_source_id: &str,
    slug: &str,
) -> Result<Option<String>>
where
    P: PageSource + ?Sized,
{
    if slug.is_empty() {
        return Ok(None);
    }
    let request = QueryRequest {
        filter: Some(json!({
            "property": "slug",
            "rich_text": {"equals": slug}
        })),
        start_cursor: None,
        page_size: 1,
    };
    let page = pages.query_data_source(data_source_id, &request).await?;
    Ok(page.results.into_iter().next().map(|row| row.id))
}

fn summarize(row: &PageObject) -> PostSummary {
    let properties = &row.properties;
    PostSummary {
        id: row.id.clone(),
        title: extract_title(properties),
        categories: extract_categories(properties),
        created_date: extract_date(properties, "createdDate"),
        updated_date: extract_date(properties, "updatedDate"),
        published: extract_checkbox(properties, "published"),
        slug: extract_text(properties, "slug"),
    }
}

#[derive(Deserialize)]
struct PlainText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Deserialize)]
struct TitleProperty {
    #[serde(default)]
    title: Vec<PlainText>,
}

#[derive(Deserialize)]
struct MultiSelectProperty {
    #[serde(default)]
    multi_select: Vec<SelectOption>,
}

#[derive(Deserialize)]
struct SelectOption {
    name: String,
}

#[derive(Deserialize)]
struct DateProperty {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    date: Option<DateValue>,
}

#[derive(Deserialize)]
struct DateValue {
    #[serde(default)]
    start: Option<String>,
}

#[derive(Deserialize)]
struct CheckboxProperty {
    #[serde(default)]
    checkbox: Option<bool>,
}

#[derive(Deserialize)]
struct TextProperty {
    #[serde(default)]
    rich_text: Vec<PlainText>,
}

// Decodes the property `name`, treating absent or mis-shaped properties as
// missing.
fn property<T: DeserializeOwned>(properties: &Map<String, Value>, name: &str) -> Option<T> {
    serde_json::from_value(properties.get(name)?.clone()).ok()
}

/// The `title` property: all runs joined by spaces and trimmed.
pub fn extract_title(properties: &Map<String, Value>) -> String {
    property::<TitleProperty>(properties, "title")
        .map(|title| {
            title
                .title
                .iter()
                .map(|t| t.plain_text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_owned()
        })
        .unwrap_or_default()
}

/// The names of the `category` multi-select options.
pub fn extract_categories(properties: &Map<String, Value>) -> Vec<String> {
    property::<MultiSelectProperty>(properties, "category")
        .map(|categories| {
            categories
                .multi_select
                .into_iter()
                .map(|option| option.name)
                .collect()
        })
        .unwrap_or_default()
}

/// The start of the date property `name`, if it is a date property.
pub fn extract_date(properties: &Map<String, Value>, name: &str) -> Option<String> {
    let date = property::<DateProperty>(properties, name)?;
    if date.kind != "date" {
        return None;
    }
    date.date?.start
}

pub fn extract_checkbox(properties: &Map<String, Value>, name: &str) -> bool {
    property::<CheckboxProperty>(properties, name)
        .and_then(|checkbox| checkbox.checkbox)
        .unwrap_or(false)
}

/// The first rich-text run of the property `name`, trimmed.
pub fn extract_text(properties: &Map<String, Value>, name: &str) -> Option<String> {
    property::<TextProperty>(properties, name)?
        .rich_text
        .into_iter()
        .next()
        .map(|run| run.plain_text.trim().to_owned())
}

/// Parses a date property value, which is either a calendar date or an
/// RFC 3339 date-time.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(datetime) => Some(datetime.naive_local().date()),
        Err(_) => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
    }
}

/// Formats a date property value as `YYYY.MM.DD`, or `-` when it is
/// missing or unparseable.
pub fn format_date(value: Option<&str>) -> String {
    match parse_date(value) {
        Some(date) => date.format("%Y.%m.%d").to_string(),
        None => "-".to_owned(),
    }
}

/// The result of a fallible post fetch.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error fetching posts.
#[derive(Debug)]
pub enum Error {
    /// Returned when no post has the requested slug.
    NotFound(String),

    /// Returned when a remote API call fails.
    Api(client::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(slug) => write!(f, "no post with slug `{}`", slug),
            Error::Api(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound(_) => None,
            Error::Api(err) => Some(err),
        }
    }
}

impl From<client::Error> for Error {
    /// Converts a [`client::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator on API calls.
    fn from(err: client::Error) -> Error {
        Error::Api(err)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::block::BlockKind;
    use crate::fetch::test::{raw_block, FakeSource};
    use crate::raw::QueryPage;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// An in-memory [`PageSource`]. Queries with a slug filter return the row
    /// whose slug matches; unfiltered queries are served in pages of two.
    /// Retrieving a page listed in `broken` fails.
    #[derive(Default)]
    pub(crate) struct FakePages {
        pub rows: Vec<PageObject>,
        pub broken: Vec<String>,
        pub requests: Mutex<Vec<QueryRequest>>,
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn query_data_source(
            &self,
            _data_source_id: &str,
            request: &QueryRequest,
        ) -> client::Result<QueryPage> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(filter) = &request.filter {
                let slug = filter["rich_text"]["equals"].as_str();
                return Ok(QueryPage {
                    results: self
                        .rows
                        .iter()
                        .filter(|row| extract_text(&row.properties, "slug").as_deref() == slug)
                        .take(1)
                        .cloned()
                        .collect(),
                    ..QueryPage::default()
                });
            }

            let start: usize = request
                .start_cursor
                .as_deref()
                .map_or(0, |c| c.parse().unwrap());
            let end = (start + 2).min(self.rows.len());
            let has_more = end < self.rows.len();
            Ok(QueryPage {
                results: self.rows[start..end].to_vec(),
                has_more,
                next_cursor: if has_more { Some(end.to_string()) } else { None },
            })
        }

        async fn retrieve_page(&self, page_id: &str) -> client::Result<PageObject> {
            if self.broken.iter().any(|id| id == page_id) {
                return Err(client::Error::InvalidApiKey);
            }
            match self.rows.iter().find(|row| row.id == page_id) {
                Some(row) => Ok(row.clone()),
                None => Err(client::Error::InvalidApiKey),
            }
        }
    }

    pub(crate) fn row(
        id: &str,
        title: &str,
        slug: &str,
        created: Option<&str>,
        published: bool,
    ) -> PageObject {
        let created = match created {
            Some(date) => json!({"type": "date", "date": {"start": date}}),
            None => json!({"type": "date", "date": null}),
        };
        serde_json::from_value(json!({
            "object": "page",
            "id": id,
            "properties": {
                "title": {"type": "title", "title": [{"plain_text": title}]},
                "category": {"type": "multi_select", "multi_select": [{"name": "Rust"}]},
                "createdDate": created,
                "updatedDate": {"type": "date", "date": {"start": "2024-03-02"}},
                "published": {"type": "checkbox", "checkbox": published},
                "slug": {"type": "rich_text", "rich_text": [{"plain_text": slug}]}
            }
        }))
        .unwrap()
    }

    fn properties(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_extract_title() {
        let props = properties(json!({
            "title": {"type": "title", "title": [
                {"plain_text": "  First"}, {"plain_text": "Second  "}
            ]}
        }));
        assert_eq!("First Second", extract_title(&props));
        assert_eq!("", extract_title(&Map::new()));
    }

    #[test]
    fn test_extract_categories() {
        let props = properties(json!({
            "category": {"type": "multi_select", "multi_select": [
                {"name": "Web"}, {"name": "CS"}
            ]}
        }));
        assert_eq!(vec!["Web", "CS"], extract_categories(&props));
        assert!(extract_categories(&Map::new()).is_empty());
    }

    #[test]
    fn test_extract_date_requires_date_type() {
        let props = properties(json!({
            "createdDate": {"type": "date", "date": {"start": "2024-01-15"}},
            "updatedDate": {"type": "created_time", "created_time": "2024-01-15"},
            "emptyDate": {"type": "date", "date": null}
        }));
        assert_eq!(
            Some("2024-01-15".to_owned()),
            extract_date(&props, "createdDate")
        );
        assert_eq!(None, extract_date(&props, "updatedDate"));
        assert_eq!(None, extract_date(&props, "emptyDate"));
        assert_eq!(None, extract_date(&props, "missing"));
    }

    #[test]
    fn test_extract_checkbox_and_text() {
        let props = properties(json!({
            "published": {"type": "checkbox", "checkbox": true},
            "slug": {"type": "rich_text", "rich_text": [
                {"plain_text": "  hello-world "}, {"plain_text": "ignored"}
            ]},
            "empty": {"type": "rich_text", "rich_text": []}
        }));
        assert!(extract_checkbox(&props, "published"));
        assert!(!extract_checkbox(&props, "missing"));
        assert_eq!(Some("hello-world".to_owned()), extract_text(&props, "slug"));
        assert_eq!(None, extract_text(&props, "empty"));
    }

    #[test]
    fn test_format_date() {
        assert_eq!("2024.01.05", format_date(Some("2024-01-05")));
        assert_eq!("2024.11.20", format_date(Some("2024-11-20T09:30:00.000+09:00")));
        assert_eq!("-", format_date(Some("not a date")));
        assert_eq!("-", format_date(None));
    }

    #[tokio::test]
    async fn test_post_list_filters_and_sorts() -> Result<()> {
        let pages = FakePages {
            rows: vec![
                row("1", "Old", "old", Some("2023-05-01"), true),
                row("2", "Draft", "draft", Some("2024-06-01"), false),
                row("3", "Undated", "undated", None, true),
                row("4", "New", "new", Some("2024-02-01T10:00:00.000Z"), true),
                row("5", "Mid", "mid", Some("2023-12-24"), true),
            ],
            ..FakePages::default()
        };

        let posts = fetch_post_list(&pages, "ds").await?;
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["New", "Mid", "Old", "Undated"], titles);
        assert_eq!(vec!["Rust"], posts[0].categories);
        assert_eq!(Some("new".to_owned()), posts[0].slug);

        let cursors: Vec<Option<String>> = pages
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.start_cursor.clone())
            .collect();
        assert_eq!(
            vec![None, Some("2".to_owned()), Some("4".to_owned())],
            cursors
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_post_detail() -> Result<()> {
        let pages = FakePages {
            rows: vec![row("page-1", "", "hello", Some("2024-01-01"), true)],
            ..FakePages::default()
        };
        let blocks = FakeSource::default()
            .children("page-1", vec![vec![raw_block("a", "page-1", false)]]);

        let post = fetch_post_detail(&pages, &blocks, "ds", "hello").await?;
        assert_eq!("page-1", post.page_id);
        assert_eq!("Untitled", post.title);
        assert_eq!(Some("2024-03-02".to_owned()), post.updated_date);
        assert_eq!(1, post.blocks.len());
        assert!(matches!(post.blocks[0].kind, BlockKind::Paragraph { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_post_detail_not_found() {
        let pages = FakePages::default();
        let blocks = FakeSource::default();

        match fetch_post_detail(&pages, &blocks, "ds", "nope").await {
            Err(Error::NotFound(slug)) => assert_eq!("nope", slug),
            other => panic!("expected NotFound, got {:?}", other),
        }
        match fetch_post_detail(&pages, &blocks, "ds", "").await {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(1, pages.requests.lock().unwrap().len());
    }
}
