//! Turns a flat collection of [`Block`]s back into a tree of markup [`Node`]s.
//!
//! The API only tells us each block's parent, so the renderer starts from
//! the blocks hanging directly off the document and expands children
//! recursively. Consecutive list items are grouped into one list container:
//! a run of bulleted items becomes one `<ul>`, a run of numbered items one
//! `<ol>`, and any other block (or a switch between the two list kinds)
//! closes the open container. The same grouping applies to the children of
//! every container-capable block.

use crate::block::{plain_text, Block, BlockKind, Parent, TextRun, PLAIN_TEXT};
use std::collections::{HashMap, HashSet};

/// The icon shown for callouts without an emoji.
pub const DEFAULT_CALLOUT_ICON: &str = "💡";

/// A node in the rendered markup tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An HTML element. Attribute values are unescaped; escaping happens when
/// the tree is serialized (see [`crate::htmlrenderer`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Element {
        Element {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr<V: Into<String>>(mut self, name: &'static str, value: V) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn class<V: Into<String>>(self, class: V) -> Self {
        self.attr("class", class)
    }

    pub fn child<N: Into<Node>>(mut self, node: N) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I: IntoIterator<Item = Node>>(mut self, nodes: I) -> Self {
        self.children.extend(nodes);
        self
    }

    #[cfg(test)]
    fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Node {
        Node::Element(element)
    }
}

impl Node {
    pub fn text<S: Into<String>>(text: S) -> Node {
        Node::Text(text.into())
    }
}

/// Renders the blocks hanging directly off the document, in their given
/// order, expanding their descendants recursively. Blocks whose parent chain
/// doesn't lead back to the document are not rendered.
pub fn render(blocks: &[Block]) -> Vec<Node> {
    let renderer = Renderer::new(blocks);

    // Ids rendered as part of a parent's expansion are never top-level.
    let child_ids: HashSet<&str> = blocks
        .iter()
        .filter(|block| block.parent.block_id().is_some())
        .map(|block| block.id.as_str())
        .collect();

    let top_level: Vec<&Block> = blocks
        .iter()
        .filter(|block| matches!(block.parent, Parent::Document(_)))
        .filter(|block| !child_ids.contains(block.id.as_str()))
        .collect();

    renderer.render_sequence(&top_level)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    fn of(block: &Block) -> Option<ListKind> {
        match block.kind {
            BlockKind::BulletedListItem { .. } => Some(ListKind::Bulleted),
            BlockKind::NumberedListItem { .. } => Some(ListKind::Numbered),
            _ => None,
        }
    }

    fn container(self) -> Element {
        match self {
            ListKind::Bulleted => Element::new("ul").class("bulleted-list"),
            ListKind::Numbered => Element::new("ol").class("numbered-list"),
        }
    }
}

/// The list container being filled while walking a run of siblings.
struct ListGroup {
    kind: ListKind,
    items: Vec<Node>,
}

/// Holds the children of every block, indexed once per render.
struct Renderer<'a> {
    children: HashMap<&'a str, Vec<&'a Block>>,
}

impl<'a> Renderer<'a> {
    fn new(blocks: &'a [Block]) -> Renderer<'a> {
        let mut children: HashMap<&'a str, Vec<&'a Block>> = HashMap::new();
        for block in blocks {
            if let Some(parent) = block.parent.block_id() {
                children.entry(parent).or_default().push(block);
            }
        }
        Renderer { children }
    }

    fn children_of(&self, block: &Block) -> &[&'a Block] {
        self.children
            .get(block.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Renders a run of siblings, grouping consecutive list items of the
    /// same kind into a single container.
    fn render_sequence(&self, blocks: &[&'a Block]) -> Vec<Node> {
        fn flush(group: &mut Option<ListGroup>, out: &mut Vec<Node>) {
            if let Some(group) = group.take() {
                out.push(group.kind.container().children(group.items).into());
            }
        }

        let mut out = Vec::new();
        let mut group: Option<ListGroup> = None;
        for block in blocks {
            let node = self.render_block(block);
            match ListKind::of(block) {
                Some(kind) => {
                    let continues =
                        matches!(&group, Some(open) if open.kind == kind);
                    if !continues {
                        flush(&mut group, &mut out);
                        group = Some(ListGroup {
                            kind,
                            items: Vec::new(),
                        });
                    }
                    if let (Some(open), Some(node)) = (group.as_mut(), node) {
                        open.items.push(node);
                    }
                }
                None => {
                    flush(&mut group, &mut out);
                    out.extend(node);
                }
            }
        }
        flush(&mut group, &mut out);
        out
    }

    fn render_children(&self, block: &Block) -> Vec<Node> {
        self.render_sequence(self.children_of(block))
    }

    /// Wraps the rendered children of `block` in a `<div>` with `class`, or
    /// returns nothing when there are none.
    fn children_container(&self, block: &Block, class: &str) -> Option<Node> {
        let children = self.render_children(block);
        if children.is_empty() {
            None
        } else {
            Some(Element::new("div").class(class).children(children).into())
        }
    }

    fn render_block(&self, block: &Block) -> Option<Node> {
        let element = match &block.kind {
            BlockKind::Heading { level, text } => {
                let level = (*level).clamp(1, 3);
                let tag = match level {
                    1 => "h1",
                    2 => "h2",
                    _ => "h3",
                };
                Element::new(tag)
                    .class(format!("heading heading{}", level))
                    .children(render_rich_text(text))
            }
            BlockKind::Paragraph { text } => Element::new("p")
                .class("paragraph")
                .children(render_rich_text(text)),
            BlockKind::BulletedListItem { text } => Element::new("li")
                .class("bulleted-list-item")
                .children(render_rich_text(text))
                .children(self.render_children(block)),
            BlockKind::NumberedListItem { text } => Element::new("li")
                .class("numbered-list-item")
                .children(render_rich_text(text))
                .children(self.render_children(block)),
            BlockKind::Quote { text } => Element::new("blockquote")
                .class("quote")
                .children(render_rich_text(text))
                .children(self.children_container(block, "quote-children")),
            BlockKind::Code {
                text,
                language,
                caption,
            } => render_code(text, language, caption),
            BlockKind::Image { url, caption } => {
                let caption = plain_text(caption);
                let alt = if caption.is_empty() {
                    "Notion image"
                } else {
                    caption.as_str()
                };
                let image = Element::new("img")
                    .attr("src", url.as_str())
                    .attr("alt", alt)
                    .class("image");
                Element::new("figure")
                    .class("image-figure")
                    .child(image)
                    .children(figcaption(caption))
            }
            BlockKind::Divider => Element::new("hr").class("divider"),
            BlockKind::Callout { text, icon } => Element::new("div")
                .class("callout")
                .child(
                    Element::new("span").class("callout-icon").child(Node::text(
                        icon.as_deref().unwrap_or(DEFAULT_CALLOUT_ICON),
                    )),
                )
                .child(
                    Element::new("div")
                        .class("callout-content")
                        .children(render_rich_text(text))
                        .children(
                            self.children_container(block, "callout-children"),
                        ),
                ),
            BlockKind::ToDo { text, checked } => {
                let mut checkbox = Element::new("input")
                    .attr("type", "checkbox")
                    .class("todo-checkbox");
                if *checked {
                    checkbox = checkbox.attr("checked", "");
                }
                checkbox = checkbox.attr("readonly", "").attr("disabled", "");

                let label = Element::new("span")
                    .class(if *checked {
                        "todo-text-checked"
                    } else {
                        "todo-text"
                    })
                    .children(render_rich_text(text));

                Element::new("div").class("todo").child(checkbox).child(
                    Element::new("div")
                        .class("todo-content")
                        .child(label)
                        .children(
                            self.children_container(block, "todo-children"),
                        ),
                )
            }
            BlockKind::Toggle { text } => Element::new("details")
                .class("toggle")
                .child(
                    Element::new("summary")
                        .class("toggle-summary")
                        .children(render_rich_text(text)),
                )
                .children(self.children_container(block, "toggle-children")),
            BlockKind::Table => {
                let rows = self.children_of(block).iter().filter_map(|row| {
                    match &row.kind {
                        BlockKind::TableRow { cells } => Some(render_row(cells)),
                        _ => None,
                    }
                });
                Element::new("table")
                    .class("table")
                    .child(Element::new("tbody").children(rows))
            }
            // Rows are only ever rendered by their table.
            BlockKind::TableRow { .. } => return None,
            BlockKind::Equation { expression } => Element::new("div")
                .class("equation")
                .child(Node::text(expression.as_str())),
            BlockKind::Bookmark { url, caption } => {
                let link = Element::new("a")
                    .attr("href", url.as_str())
                    .attr("target", "_blank")
                    .attr("rel", "noopener noreferrer")
                    .class("bookmark-link")
                    .child(Node::text(url.as_str()));
                let caption: Option<Node> = if caption.is_empty() {
                    None
                } else {
                    Some(
                        Element::new("div")
                            .class("bookmark-caption")
                            .children(render_rich_text(caption))
                            .into(),
                    )
                };
                Element::new("div")
                    .class("bookmark")
                    .child(link)
                    .children(caption)
            }
            BlockKind::Video { url, caption } => Element::new("figure")
                .class("video-figure")
                .child(
                    Element::new("video")
                        .attr("src", url.as_str())
                        .attr("controls", "")
                        .class("video"),
                )
                .children(figcaption(plain_text(caption))),
        };
        Some(element.into())
    }
}

fn figcaption(caption: String) -> Option<Node> {
    if caption.is_empty() {
        None
    } else {
        Some(Element::new("figcaption").child(Node::Text(caption)).into())
    }
}

fn render_row(cells: &[Vec<TextRun>]) -> Node {
    Element::new("tr")
        .children(cells.iter().map(|cell| {
            Element::new("td")
                .class("table-cell")
                .children(render_rich_text(cell))
                .into()
        }))
        .into()
}

fn render_code(text: &[TextRun], language: &str, caption: &[TextRun]) -> Element {
    let code = Element::new("pre").child(
        Element::new("code")
            .class(format!("language-{}", highlight_language(language)))
            .child(Node::text(plain_text(text))),
    );
    let mut wrapper = Element::new("div").class("code-block-wrapper").child(code);
    if language != PLAIN_TEXT {
        wrapper = wrapper.child(
            Element::new("span")
                .class("code-language")
                .child(Node::text(language)),
        );
    }
    if !caption.is_empty() {
        wrapper = wrapper.child(
            Element::new("div")
                .class("code-caption")
                .children(render_rich_text(caption)),
        );
    }
    wrapper
}

/// Maps a Notion code language to the name syntax highlighters expect.
pub fn highlight_language(language: &str) -> String {
    let language = language.to_lowercase();
    match language.as_str() {
        "plain text" => "text".to_owned(),
        "shell" => "bash".to_owned(),
        "yml" => "yaml".to_owned(),
        _ => language,
    }
}

/// Renders rich text as one `<span>` per run. Styles only ever turn
/// something on, so unstyled runs inherit from the surrounding element.
pub fn render_rich_text(text: &[TextRun]) -> Vec<Node> {
    text.iter().map(render_run).collect()
}

fn render_run(run: &TextRun) -> Node {
    let annotations = &run.annotations;
    let mut style: Vec<&str> = Vec::new();
    if annotations.bold {
        style.push("font-weight:bold");
    }
    if annotations.italic {
        style.push("font-style:italic");
    }
    // Underline and strikethrough share `text-decoration`; underline wins.
    if annotations.underline {
        style.push("text-decoration:underline");
    } else if annotations.strikethrough {
        style.push("text-decoration:line-through");
    }

    let mut content = Node::text(run.text.as_str());
    if annotations.code {
        content = Element::new("code")
            .class("inline-code")
            .child(content)
            .into();
    }
    if let Some(href) = &run.href {
        content = Element::new("a")
            .attr("href", href.as_str())
            .attr("target", "_blank")
            .attr("rel", "noopener noreferrer")
            .class("link")
            .child(content)
            .into();
    }

    let mut span = Element::new("span");
    if !style.is_empty() {
        span = span.attr("style", style.join(";"));
    }
    span.child(content).into()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::block::Annotations;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Vec<TextRun> {
        vec![TextRun {
            text: s.to_owned(),
            ..TextRun::default()
        }]
    }

    fn block(id: &str, parent: Parent, kind: BlockKind) -> Block {
        Block {
            id: id.to_owned(),
            has_children: false,
            parent,
            kind,
        }
    }

    fn top(id: &str, kind: BlockKind) -> Block {
        block(id, Parent::Document("page".to_owned()), kind)
    }

    fn under(id: &str, parent: &str, kind: BlockKind) -> Block {
        block(id, Parent::Block(parent.to_owned()), kind)
    }

    fn bullet(s: &str) -> BlockKind {
        BlockKind::BulletedListItem { text: text(s) }
    }

    fn numbered(s: &str) -> BlockKind {
        BlockKind::NumberedListItem { text: text(s) }
    }

    fn paragraph(s: &str) -> BlockKind {
        BlockKind::Paragraph { text: text(s) }
    }

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(element) => element,
            Node::Text(text) => panic!("expected element, got text {:?}", text),
        }
    }

    /// Summarizes a node as `tag(children...)`, with text shown in quotes.
    fn shape(node: &Node) -> String {
        match node {
            Node::Text(text) => format!("{:?}", text),
            Node::Element(e) if e.tag == "span" && e.attributes.is_empty() => {
                e.children.iter().map(shape).collect::<Vec<_>>().join(" ")
            }
            Node::Element(e) => format!(
                "{}({})",
                e.tag,
                e.children.iter().map(shape).collect::<Vec<_>>().join(" ")
            ),
        }
    }

    fn shapes(nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(shape).collect()
    }

    #[test]
    fn test_list_items_grouped_around_paragraph() {
        let blocks = vec![
            top("a", bullet("a")),
            top("b", bullet("b")),
            top("c", paragraph("c")),
            top("d", bullet("d")),
        ];
        assert_eq!(
            vec![
                r#"ul(li("a") li("b"))"#,
                r#"p("c")"#,
                r#"ul(li("d"))"#,
            ],
            shapes(&render(&blocks))
        );
    }

    #[test]
    fn test_list_kind_switch_splits_containers() {
        let blocks = vec![top("a", bullet("a")), top("b", numbered("b"))];
        let nodes = render(&blocks);
        assert_eq!(vec![r#"ul(li("a"))"#, r#"ol(li("b"))"#], shapes(&nodes));
        assert_eq!(Some("bulleted-list"), element(&nodes[0]).get_attr("class"));
        assert_eq!(Some("numbered-list"), element(&nodes[1]).get_attr("class"));
    }

    #[test]
    fn test_nested_lists_render_inside_item() {
        let blocks = vec![
            top("a", bullet("a")),
            under("a1", "a", bullet("a1")),
            under("a2", "a", bullet("a2")),
            under("a3", "a", numbered("a3")),
            top("b", bullet("b")),
        ];
        assert_eq!(
            vec![r#"ul(li("a" ul(li("a1") li("a2")) ol(li("a3"))) li("b"))"#],
            shapes(&render(&blocks))
        );
    }

    #[test]
    fn test_unreachable_blocks_are_not_rendered() {
        let blocks = vec![
            top("a", paragraph("a")),
            under("x", "missing", paragraph("x")),
            block("y", Parent::Missing, paragraph("y")),
        ];
        assert_eq!(vec![r#"p("a")"#], shapes(&render(&blocks)));
    }

    #[test]
    fn test_quote_groups_its_children() {
        let blocks = vec![
            top("q", BlockKind::Quote { text: text("q") }),
            under("q1", "q", bullet("q1")),
            under("q2", "q", paragraph("q2")),
            under("q3", "q", numbered("q3")),
        ];
        assert_eq!(
            vec![r#"blockquote("q" div(ul(li("q1")) p("q2") ol(li("q3"))))"#],
            shapes(&render(&blocks))
        );
    }

    #[test]
    fn test_callout_default_icon() {
        let blocks = vec![top(
            "c",
            BlockKind::Callout {
                text: text("note"),
                icon: None,
            },
        )];
        assert_eq!(
            vec![r#"div(span("💡") div("note"))"#],
            shapes(&render(&blocks))
        );
    }

    #[test]
    fn test_to_do_checked_style() {
        let blocks = vec![
            top(
                "t",
                BlockKind::ToDo {
                    text: text("done"),
                    checked: true,
                },
            ),
            under("t1", "t", bullet("sub")),
        ];
        let nodes = render(&blocks);
        let todo = element(&nodes[0]);
        let checkbox = element(&todo.children[0]);
        assert_eq!(Some(""), checkbox.get_attr("checked"));
        let content = element(&todo.children[1]);
        let label = element(&content.children[0]);
        assert_eq!(Some("todo-text-checked"), label.get_attr("class"));
        assert_eq!(r#"div(ul(li("sub")))"#, shape(&content.children[1]));
    }

    #[test]
    fn test_table_renders_only_rows() {
        let blocks = vec![
            top("t", BlockKind::Table),
            under(
                "r1",
                "t",
                BlockKind::TableRow {
                    cells: vec![text("a"), text("b")],
                },
            ),
            under("p", "t", paragraph("ignored")),
            under(
                "r2",
                "t",
                BlockKind::TableRow {
                    cells: vec![text("c"), Vec::new()],
                },
            ),
        ];
        assert_eq!(
            vec![r#"table(tbody(tr(td("a") td("b")) tr(td("c") td())))"#],
            shapes(&render(&blocks))
        );
    }

    #[test]
    fn test_standalone_table_row_renders_nothing() {
        let blocks = vec![top(
            "r",
            BlockKind::TableRow {
                cells: vec![text("x")],
            },
        )];
        assert!(render(&blocks).is_empty());
    }

    #[test]
    fn test_toggle_and_image() {
        let blocks = vec![
            top("t", BlockKind::Toggle { text: text("more") }),
            under("t1", "t", paragraph("hidden")),
            top(
                "i",
                BlockKind::Image {
                    url: "https://x/a.png".to_owned(),
                    caption: Vec::new(),
                },
            ),
        ];
        let nodes = render(&blocks);
        assert_eq!(
            vec![r#"details(summary("more") div(p("hidden")))"#, "figure(img())"],
            shapes(&nodes)
        );
        let image = element(&element(&nodes[1]).children[0]);
        assert_eq!(Some("Notion image"), image.get_attr("alt"));
    }

    #[test]
    fn test_code_language_label() {
        let plain = render_code(&text("x"), PLAIN_TEXT, &[]);
        assert_eq!(1, plain.children.len());
        let pre = element(&plain.children[0]);
        let code = element(&pre.children[0]);
        assert_eq!(Some("language-text"), code.get_attr("class"));

        let shell = render_code(&text("ls"), "Shell", &[]);
        assert_eq!(2, shell.children.len());
        assert_eq!(r#"span("Shell")"#, shape(&shell.children[1]));
    }

    #[test]
    fn test_underline_wins_over_strikethrough() {
        let run = TextRun {
            text: "x".to_owned(),
            href: None,
            annotations: Annotations {
                bold: true,
                underline: true,
                strikethrough: true,
                ..Annotations::default()
            },
        };
        let span = render_run(&run);
        assert_eq!(
            Some("font-weight:bold;text-decoration:underline"),
            element(&span).get_attr("style")
        );
    }

    #[test]
    fn test_link_wraps_inline_code() {
        let run = TextRun {
            text: "fn".to_owned(),
            href: Some("https://docs.rs".to_owned()),
            annotations: Annotations {
                code: true,
                ..Annotations::default()
            },
        };
        let span = render_run(&run);
        let link = element(&element(&span).children[0]);
        assert_eq!("a", link.tag);
        assert_eq!(Some("_blank"), link.get_attr("target"));
        assert_eq!(Some("noopener noreferrer"), link.get_attr("rel"));
        assert_eq!(r#"code("fn")"#, shape(&link.children[0]));
    }
}
