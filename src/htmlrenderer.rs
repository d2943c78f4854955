//! Serializes rendered [`Node`] trees into HTML. Text and attribute values
//! are escaped with [`pulldown_cmark`]'s escaping routines; `href` and `src`
//! attributes go through [`escape_href`] so that URLs stay valid.

use crate::block::Block;
use crate::render::{render, Element, Node};
use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use std::io;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input"];

/// Attributes whose values are URLs.
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Writes `nodes` as HTML into `w`.
pub fn push_html<W: StrWrite>(w: &mut W, nodes: &[Node]) -> io::Result<()> {
    for node in nodes {
        write_node(w, node)?;
    }
    Ok(())
}

/// Renders `blocks` (see [`render`]) straight to an HTML string.
pub fn blocks_to_html(blocks: &[Block]) -> io::Result<String> {
    let mut out = String::new();
    push_html(&mut out, &render(blocks))?;
    Ok(out)
}

fn write_node<W: StrWrite>(w: &mut W, node: &Node) -> io::Result<()> {
    match node {
        Node::Text(text) => escape_html(&mut *w, text),
        Node::Element(element) => write_element(w, element),
    }
}

fn write_element<W: StrWrite>(w: &mut W, element: &Element) -> io::Result<()> {
    write!(w, "<{}", element.tag)?;
    for (name, value) in &element.attributes {
        write!(w, r#" {}=""#, name)?;
        if URL_ATTRIBUTES.contains(name) {
            escape_href(&mut *w, value)?;
        } else {
            escape_html(&mut *w, value)?;
        }
        w.write_str("\"")?;
    }

    if VOID_ELEMENTS.contains(&element.tag) {
        return w.write_str(" />");
    }
    w.write_str(">")?;
    push_html(w, &element.children)?;
    write!(w, "</{}>", element.tag)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::block::{Annotations, BlockKind, Parent, TextRun};

    fn to_html(nodes: &[Node]) -> io::Result<String> {
        let mut out = String::new();
        push_html(&mut out, nodes)?;
        Ok(out)
    }

    #[test]
    fn test_escapes_text_and_attributes() -> io::Result<()> {
        let node: Node = Element::new("p")
            .attr("title", r#"a "quoted" <title>"#)
            .child(Node::text("1 < 2 & 3"))
            .into();
        assert_eq!(
            r#"<p title="a &quot;quoted&quot; &lt;title&gt;">1 &lt; 2 &amp; 3</p>"#,
            to_html(&[node])?
        );
        Ok(())
    }

    #[test]
    fn test_void_elements() -> io::Result<()> {
        let nodes = vec![
            Element::new("hr").class("divider").into(),
            Element::new("img").attr("src", "https://x/a.png").into(),
        ];
        assert_eq!(
            r#"<hr class="divider" /><img src="https://x/a.png" />"#,
            to_html(&nodes)?
        );
        Ok(())
    }

    #[test]
    fn test_href_is_escaped_as_url() -> io::Result<()> {
        let node: Node = Element::new("a")
            .attr("href", "https://x/?a=1&b=\"2\"")
            .into();
        assert_eq!(
            r#"<a href="https://x/?a=1&amp;b=%222%22"></a>"#,
            to_html(&[node])?
        );
        Ok(())
    }

    #[test]
    fn test_blocks_to_html() -> io::Result<()> {
        let blocks = vec![
            Block {
                id: "a".to_owned(),
                has_children: false,
                parent: Parent::Document("page".to_owned()),
                kind: BlockKind::Heading {
                    level: 1,
                    text: vec![TextRun {
                        text: "Hello".to_owned(),
                        href: None,
                        annotations: Annotations {
                            italic: true,
                            ..Annotations::default()
                        },
                    }],
                },
            },
            Block {
                id: "b".to_owned(),
                has_children: false,
                parent: Parent::Document("page".to_owned()),
                kind: BlockKind::Divider,
            },
        ];
        assert_eq!(
            concat!(
                r#"<h1 class="heading heading1">"#,
                r#"<span style="font-style:italic">Hello</span></h1>"#,
                r#"<hr class="divider" />"#,
            ),
            blocks_to_html(&blocks)?
        );
        Ok(())
    }
}
