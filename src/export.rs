use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use tdoc::{Document, InlineStyle, Paragraph, Span, markdown};

use crate::block::Block;
use crate::markdown::{Segment, parse_inline_markdown};

/// The outline below `root` as nested bullet lists.
pub fn outline_document(root: &Block) -> Document {
    if !root.has_children() {
        return Document::new();
    }
    Document::new().with_paragraphs(vec![bullet_list(root)])
}

pub fn write_markdown<W: Write>(root: &Block, writer: &mut W) -> Result<()> {
    markdown::write(writer, &outline_document(root)).context("failed to render Markdown")?;
    Ok(())
}

pub fn export_markdown(root: &Block, path: &Path) -> Result<()> {
    let mut contents = Vec::new();
    write_markdown(root, &mut contents)?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn bullet_list(parent: &Block) -> Paragraph {
    let entries = parent
        .children()
        .iter()
        .map(|child| {
            let mut entry = vec![Paragraph::new_text().with_content(spans_for(child.content()))];
            if child.has_children() {
                entry.push(bullet_list(child));
            }
            entry
        })
        .collect();
    Paragraph::new_unordered_list().with_entries(entries)
}

fn spans_for(content: &str) -> Vec<Span> {
    let spans: Vec<Span> = parse_inline_markdown(content)
        .iter()
        .map(|segment| match segment {
            Segment::Text { value } => Span::new_text(value),
            Segment::Code { value } => Span::new_styled(InlineStyle::Code).with_text(value),
            Segment::Link { value, href } => {
                let mut span = Span::new_styled(InlineStyle::Link).with_text(value);
                span.link_target = Some(href.clone());
                span
            }
        })
        .collect();
    if spans.is_empty() {
        vec![Span::new_text("")]
    } else {
        spans
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::block::BlockId;

    fn node(id: &str, content: &str, children: Vec<Block>) -> Block {
        Block::from_parts(
            BlockId::from(id),
            content,
            children.into_iter().map(Rc::new).collect(),
        )
    }

    fn sample() -> Block {
        node(
            "root",
            "",
            vec![
                node(
                    "a",
                    "plain `code` and [docs](https://example.com)",
                    vec![node("a1", "nested", vec![])],
                ),
                node("b", "", vec![]),
            ],
        )
    }

    #[test]
    fn empty_outline_has_no_paragraphs() {
        let document = outline_document(&node("root", "", vec![]));
        assert!(document.paragraphs.is_empty());
    }

    #[test]
    fn children_become_nested_lists() {
        let document = outline_document(&sample());
        assert_eq!(document.paragraphs.len(), 1);
        let Paragraph::UnorderedList { entries } = &document.paragraphs[0] else {
            panic!("expected a bullet list");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].len(), 2);
        assert!(matches!(entries[0][1], Paragraph::UnorderedList { .. }));
        assert_eq!(entries[1].len(), 1);
    }

    #[test]
    fn segments_map_to_inline_styles() {
        let spans = spans_for("plain `code` and [docs](https://example.com)");
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0].text, "plain ");
        assert_eq!(spans[1].style, InlineStyle::Code);
        assert_eq!(spans[1].text, "code");
        assert_eq!(spans[3].style, InlineStyle::Link);
        assert_eq!(spans[3].text, "docs");
        assert_eq!(spans[3].link_target.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn writes_markdown_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outline.md");
        export_markdown(&sample(), &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("plain"));
        assert!(written.contains("nested"));
        assert!(written.contains("https://example.com"));
    }
}
