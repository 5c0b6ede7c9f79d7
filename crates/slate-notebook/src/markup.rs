//! Parser for markup-tagged cell documents.
//!
//! The format marks each cell with a `<VSCode.Cell>` tag carrying
//! optional `language` and `id` attributes; everything between the
//! open and close tag is the cell body. Text outside cell tags is
//! ignored.

use regex::Regex;

use crate::{generate_cell_id, Cell, CellKind, Notebook};

const CELL_OPEN: &str = "<VSCode.Cell";
const CELL_CLOSE: &str = "</VSCode.Cell>";

/// Extract cells from a markup document. Returns `None` when the text
/// contains no well-formed cell tags, which sends the caller down the
/// next branch of the format cascade.
pub(crate) fn parse_cells(text: &str) -> Option<Notebook> {
    let mut cells = Vec::new();
    let mut rest = text;

    while let Some(open_at) = rest.find(CELL_OPEN) {
        let after_open = &rest[open_at + CELL_OPEN.len()..];
        let Some(tag_end) = after_open.find('>') else {
            break;
        };
        let attributes = &after_open[..tag_end];
        let after_tag = &after_open[tag_end + 1..];
        let Some(close_at) = after_tag.find(CELL_CLOSE) else {
            break;
        };

        let kind = match attribute(attributes, "language").as_deref() {
            Some("markdown") => CellKind::Markdown,
            _ => CellKind::Code,
        };
        cells.push(Cell {
            id: attribute(attributes, "id").unwrap_or_else(generate_cell_id),
            kind,
            source: after_tag[..close_at].trim().to_string(),
            metadata: serde_json::Map::new(),
            outputs: Vec::new(),
        });

        rest = &after_tag[close_at + CELL_CLOSE.len()..];
    }

    if cells.is_empty() {
        return None;
    }
    Some(Notebook {
        cells,
        ..Notebook::new()
    })
}

fn attribute(attributes: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r#"{name}="([^"]*)""#)).ok()?;
    let captures = pattern.captures(attributes)?;
    Some(captures.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<VSCode.Cell language="markdown" id="intro">
# Title
</VSCode.Cell>
<VSCode.Cell language="python" id="calc">
x = 1
print(x)
</VSCode.Cell>"#;

    #[test]
    fn test_parses_cells_with_kind_and_id() {
        let notebook = parse_cells(SAMPLE).unwrap();
        assert_eq!(notebook.cells.len(), 2);

        assert_eq!(notebook.cells[0].id, "intro");
        assert_eq!(notebook.cells[0].kind, CellKind::Markdown);
        assert_eq!(notebook.cells[0].source, "# Title");

        assert_eq!(notebook.cells[1].id, "calc");
        assert_eq!(notebook.cells[1].kind, CellKind::Code);
        assert_eq!(notebook.cells[1].source, "x = 1\nprint(x)");
    }

    #[test]
    fn test_missing_id_generates_one() {
        let notebook =
            parse_cells("<VSCode.Cell language=\"python\">x = 1</VSCode.Cell>").unwrap();
        assert!(!notebook.cells[0].id.is_empty());
    }

    #[test]
    fn test_missing_language_defaults_to_code() {
        let notebook = parse_cells("<VSCode.Cell id=\"a\">x = 1</VSCode.Cell>").unwrap();
        assert_eq!(notebook.cells[0].kind, CellKind::Code);
    }

    #[test]
    fn test_body_markup_is_kept_verbatim() {
        let notebook = parse_cells(
            "<VSCode.Cell language=\"markdown\" id=\"a\">some <b>bold</b> text</VSCode.Cell>",
        )
        .unwrap();
        assert_eq!(notebook.cells[0].source, "some <b>bold</b> text");
    }

    #[test]
    fn test_text_without_cells_is_none() {
        assert!(parse_cells("just some text").is_none());
        assert!(parse_cells("<html>not a cell</html>").is_none());
        assert!(parse_cells("<VSCode.Cell id=\"a\">never closed").is_none());
    }

    #[test]
    fn test_parsed_notebook_uses_format_defaults() {
        let notebook = parse_cells(SAMPLE).unwrap();
        assert_eq!(notebook.nbformat, crate::NBFORMAT);
        assert_eq!(notebook.nbformat_minor, crate::NBFORMAT_MINOR);
    }

    #[test]
    fn test_attribute_order_does_not_matter() {
        let notebook =
            parse_cells("<VSCode.Cell id=\"z\" language=\"markdown\">note</VSCode.Cell>").unwrap();
        assert_eq!(notebook.cells[0].id, "z");
        assert_eq!(notebook.cells[0].kind, CellKind::Markdown);
    }
}
