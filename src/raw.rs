//! Wire shapes for the Notion API. These mirror the JSON the API returns and
//! are only ever read; [`crate::block`] converts them into the normalized
//! model the renderer works with.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Decodes an explicit `null` the same way as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A block as returned by the "list children" endpoint. Only the envelope is
/// decoded eagerly; the type-specific payload stays as JSON in `payload`
/// until the transformer knows which shape to expect.
#[derive(Clone, Debug, Deserialize)]
pub struct RawBlock {
    pub id: String,

    /// Selects which member of `payload` is populated (e.g. `paragraph`).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub has_children: bool,

    #[serde(default)]
    pub parent: Option<RawParent>,

    /// Every other field of the block object, keyed by name.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RawBlock {
    /// Returns the payload member named by the block's `type`.
    pub fn typed_payload(&self) -> Option<&Value> {
        self.payload.get(&self.kind)
    }
}

/// The parent union. Exactly one of the members is expected; any other
/// parent kind leaves both empty.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawParent {
    #[serde(default)]
    pub page_id: Option<String>,

    #[serde(default)]
    pub block_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRichText {
    #[serde(default, deserialize_with = "null_as_default")]
    pub plain_text: String,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: RawAnnotations,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAnnotations {
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub underline: Option<bool>,
    #[serde(default)]
    pub strikethrough: Option<bool>,
    #[serde(default)]
    pub code: Option<bool>,
}

/// Payload shared by every block whose only content is rich text.
#[derive(Debug, Default, Deserialize)]
pub struct TextPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RawRichText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CodePayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RawRichText>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub caption: Option<Vec<RawRichText>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalloutPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RawRichText>,
    #[serde(default)]
    pub icon: Option<RawIcon>,
}

#[derive(Debug, Deserialize)]
pub struct RawIcon {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToDoPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: Vec<RawRichText>,
    #[serde(default)]
    pub checked: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TableRowPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cells: Vec<Vec<RawRichText>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EquationPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub expression: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookmarkPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default)]
    pub caption: Option<Vec<RawRichText>>,
}

/// Payload of `image` and `video` blocks. The asset is either hosted by
/// Notion (`file`) or linked (`external`), selected by the `type` field.
#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    #[serde(flatten)]
    pub source: MediaSource,
    #[serde(default)]
    pub caption: Option<Vec<RawRichText>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    File { file: MediaUrl },
    External { external: MediaUrl },
}

impl MediaSource {
    pub fn into_url(self) -> String {
        match self {
            MediaSource::File { file } => file.url,
            MediaSource::External { external } => external.url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaUrl {
    pub url: String,
}

/// One page of a block's children.
#[derive(Debug, Default)]
pub struct ChildrenPage {
    pub results: Vec<RawBlock>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// A data-source row (a page object) as returned by a query or by page
/// retrieval. Properties are kept untyped; [`crate::post`] reads the ones it
/// knows about.
#[derive(Clone, Debug, Deserialize)]
pub struct PageObject {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Map<String, Value>,
}

/// One page of data-source query results.
#[derive(Debug, Default, Deserialize)]
pub struct QueryPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<PageObject>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}
