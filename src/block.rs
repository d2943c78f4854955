//! Defines the normalized [`Block`] model and [`transform_blocks`], which
//! converts [`RawBlock`]s from the API into it. The transformation is total:
//! blocks of an unsupported type (or with a payload that doesn't decode) are
//! dropped rather than reported as errors, since the API's set of block types
//! is larger than the set this crate renders.

use crate::raw::*;
use serde::de::DeserializeOwned;

/// The language recorded for code blocks without one.
pub const PLAIN_TEXT: &str = "plain text";

/// A run of text sharing one set of annotations and one optional link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
}

/// Independent style flags for a [`TextRun`]. All default to `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
}

/// An ordered sequence of [`TextRun`]s.
pub type RichText = Vec<TextRun>;

/// Concatenates the text of every run, dropping annotations and links.
pub fn plain_text(text: &[TextRun]) -> String {
    text.iter().map(|run| run.text.as_str()).collect()
}

/// Where a block hangs in the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parent {
    /// The block is a direct child of the page with the given id.
    Document(String),

    /// The block is nested under the block with the given id.
    Block(String),

    /// The API didn't say.
    Missing,
}

impl Parent {
    /// The id of the parent block, if the parent is a block.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Parent::Block(id) => Some(id),
            _ => None,
        }
    }
}

/// A content block, reduced to what rendering needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub has_children: bool,
    pub parent: Parent,
    pub kind: BlockKind,
}

/// The type-specific part of a [`Block`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Heading { level: u8, text: RichText },
    Paragraph { text: RichText },
    BulletedListItem { text: RichText },
    NumberedListItem { text: RichText },
    Quote { text: RichText },
    Code {
        text: RichText,
        language: String,
        caption: RichText,
    },
    Image { url: String, caption: RichText },
    Divider,
    Callout { text: RichText, icon: Option<String> },
    ToDo { text: RichText, checked: bool },
    Toggle { text: RichText },
    Table,
    TableRow { cells: Vec<RichText> },
    Equation { expression: String },
    Bookmark { url: String, caption: RichText },
    Video { url: String, caption: RichText },
}

/// Converts raw blocks into [`Block`]s, preserving order and dropping the
/// ones [`transform_block`] can't represent.
pub fn transform_blocks(raw: Vec<RawBlock>) -> Vec<Block> {
    raw.into_iter().filter_map(transform_block).collect()
}

/// Converts a single raw block. Returns `None` for unsupported types.
pub fn transform_block(raw: RawBlock) -> Option<Block> {
    let kind = match transform_kind(&raw) {
        Some(kind) => kind,
        None => {
            log::debug!("dropping block {} of type `{}`", raw.id, raw.kind);
            return None;
        }
    };
    Some(Block {
        parent: transform_parent(raw.parent.as_ref()),
        id: raw.id,
        has_children: raw.has_children,
        kind,
    })
}

fn transform_kind(raw: &RawBlock) -> Option<BlockKind> {
    Some(match raw.kind.as_str() {
        "heading_1" => BlockKind::Heading {
            level: 1,
            text: text_payload(raw)?,
        },
        "heading_2" => BlockKind::Heading {
            level: 2,
            text: text_payload(raw)?,
        },
        "heading_3" => BlockKind::Heading {
            level: 3,
            text: text_payload(raw)?,
        },
        "paragraph" => BlockKind::Paragraph {
            text: text_payload(raw)?,
        },
        "bulleted_list_item" => BlockKind::BulletedListItem {
            text: text_payload(raw)?,
        },
        "numbered_list_item" => BlockKind::NumberedListItem {
            text: text_payload(raw)?,
        },
        "quote" => BlockKind::Quote {
            text: text_payload(raw)?,
        },
        "toggle" => BlockKind::Toggle {
            text: text_payload(raw)?,
        },
        "code" => {
            let code: CodePayload = payload(raw)?;
            BlockKind::Code {
                text: transform_rich_text(&code.rich_text),
                language: match code.language {
                    Some(language) if !language.is_empty() => language,
                    _ => PLAIN_TEXT.to_owned(),
                },
                caption: transform_caption(code.caption),
            }
        }
        "image" => {
            let media: MediaPayload = payload(raw)?;
            BlockKind::Image {
                url: media.source.into_url(),
                caption: transform_caption(media.caption),
            }
        }
        "video" => {
            let media: MediaPayload = payload(raw)?;
            BlockKind::Video {
                url: media.source.into_url(),
                caption: transform_caption(media.caption),
            }
        }
        "divider" => BlockKind::Divider,
        "callout" => {
            let callout: CalloutPayload = payload(raw)?;
            BlockKind::Callout {
                text: transform_rich_text(&callout.rich_text),
                icon: callout.icon.and_then(|icon| match icon.kind.as_str() {
                    "emoji" => icon.emoji,
                    _ => None,
                }),
            }
        }
        "to_do" => {
            let to_do: ToDoPayload = payload(raw)?;
            BlockKind::ToDo {
                text: transform_rich_text(&to_do.rich_text),
                checked: to_do.checked.unwrap_or(false),
            }
        }
        "table" => BlockKind::Table,
        "table_row" => {
            let row: TableRowPayload = payload(raw)?;
            BlockKind::TableRow {
                cells: row
                    .cells
                    .iter()
                    .map(|cell| transform_rich_text(cell))
                    .collect(),
            }
        }
        "equation" => {
            let equation: EquationPayload = payload(raw)?;
            BlockKind::Equation {
                expression: equation.expression,
            }
        }
        "bookmark" => {
            let bookmark: BookmarkPayload = payload(raw)?;
            BlockKind::Bookmark {
                url: bookmark.url,
                caption: transform_caption(bookmark.caption),
            }
        }
        _ => return None,
    })
}

// Decodes the block's typed payload. A missing or null payload decodes as an
// empty object so that every field falls back to its default.
fn payload<T: DeserializeOwned>(raw: &RawBlock) -> Option<T> {
    let value = match raw.typed_payload() {
        Some(value) if !value.is_null() => value.clone(),
        _ => serde_json::Value::Object(Default::default()),
    };
    match serde_json::from_value(value) {
        Ok(payload) => Some(payload),
        Err(err) => {
            log::debug!("malformed `{}` payload on {}: {}", raw.kind, raw.id, err);
            None
        }
    }
}

fn text_payload(raw: &RawBlock) -> Option<RichText> {
    let text: TextPayload = payload(raw)?;
    Some(transform_rich_text(&text.rich_text))
}

fn transform_caption(caption: Option<Vec<RawRichText>>) -> RichText {
    caption
        .map(|caption| transform_rich_text(&caption))
        .unwrap_or_default()
}

/// Converts API rich text into [`TextRun`]s, defaulting absent flags to
/// `false`.
pub fn transform_rich_text(items: &[RawRichText]) -> RichText {
    items
        .iter()
        .map(|item| TextRun {
            text: item.plain_text.clone(),
            href: item.href.clone(),
            annotations: Annotations {
                bold: item.annotations.bold.unwrap_or(false),
                italic: item.annotations.italic.unwrap_or(false),
                underline: item.annotations.underline.unwrap_or(false),
                strikethrough: item
                    .annotations
                    .strikethrough
                    .unwrap_or(false),
                code: item.annotations.code.unwrap_or(false),
            },
        })
        .collect()
}

fn transform_parent(parent: Option<&RawParent>) -> Parent {
    match parent {
        Some(RawParent {
            page_id: Some(id), ..
        }) => Parent::Document(id.clone()),
        Some(RawParent {
            block_id: Some(id), ..
        }) => Parent::Block(id.clone()),
        _ => Parent::Missing,
    }
}
