use crate::normalize::clean_text;
use nbastat_model::RawTable;
use scraper::{ElementRef, Html, Node};
use std::ops::Deref;

/// Every `<table>` in the document, in document order.
///
/// Nested tables are counted after the table that contains them. With
/// `include_commented`, tables shipped inside HTML comments (the site hides
/// most secondary tables this way until its scripts run) are parsed and
/// counted at the comment's position.
pub fn extract_tables(html: &str, include_commented: bool) -> Vec<RawTable> {
    let document = Html::parse_document(html);
    let mut tables = Vec::new();
    walk_node(document.tree.root(), include_commented, &mut tables);
    tables
}

fn walk_node(node: ego_tree::NodeRef<'_, Node>, include_commented: bool, tables: &mut Vec<RawTable>) {
    match node.value() {
        Node::Element(elem) if elem.name() == "table" => {
            if let Some(table) = ElementRef::wrap(node) {
                tables.push(read_table(table));
            }
        }
        Node::Comment(comment) if include_commented => {
            let text: &str = comment.deref();
            if text.contains("<table") {
                let fragment = Html::parse_fragment(text);
                let before = tables.len();
                walk_node(fragment.tree.root(), false, tables);
                tracing::debug!(tables = tables.len() - before, "Unwrapped commented tables");
            }
            return;
        }
        _ => {}
    }

    for child in node.children() {
        walk_node(child, include_commented, tables);
    }
}

/// Read one table: header from the last `<thead>` row, body from every
/// `<tbody>`/`<tfoot>` row as served, repeated header rows included. Rows of
/// nested tables are not included.
fn read_table(table: ElementRef) -> RawTable {
    let mut head_rows = Vec::new();
    let mut body_rows = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" => head_rows.extend(child_rows(child)),
            "tbody" | "tfoot" => body_rows.extend(child_rows(child)),
            "tr" => body_rows.push(child),
            _ => {}
        }
    }

    // No <thead>: the first row is the header row.
    let header_row = match head_rows.last() {
        Some(row) => Some(*row),
        None if !body_rows.is_empty() => Some(body_rows.remove(0)),
        None => None,
    };

    let headers = header_row
        .map(row_cells)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, h)| if h.is_empty() { format!("Unnamed: {i}") } else { h })
        .collect();

    let rows = body_rows.into_iter().map(row_cells).collect();

    RawTable { headers, rows }
}

fn child_rows<'a>(section: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
}

/// Cell texts of a row, expanding `colspan` so columns stay aligned.
fn row_cells(row: ElementRef) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in row.children().filter_map(ElementRef::wrap) {
        if !matches!(cell.value().name(), "th" | "td") {
            continue;
        }
        let text = clean_text(&cell.text().collect::<String>());
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, 100);
        for _ in 0..span {
            cells.push(text.clone());
        }
    }
    cells
}
