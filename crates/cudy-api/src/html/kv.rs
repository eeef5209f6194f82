// Label/value extraction from LuCI status pages.
//
// Status pages are two-column tables (label, value) or definition lists.
// Everything above this layer resolves sensors against the map built here.

use std::sync::LazyLock;

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};

use super::text::{collapse_unit_echo, normalize_spaces};

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector is valid"));
static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector is valid"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector is valid"));
static DL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl").expect("dl selector is valid"));
static DT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dt").expect("dt selector is valid"));
static DD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dd").expect("dd selector is valid"));

/// Label → value map of every table row and `<dt>/<dd>` pair in `html`.
///
/// The first occurrence of a label wins. Empty input yields an empty map.
pub fn extract_kv(html: &str) -> IndexMap<String, String> {
    if html.trim().is_empty() {
        return IndexMap::new();
    }
    extract_kv_from(&Html::parse_document(html))
}

pub(crate) fn extract_kv_from(doc: &Html) -> IndexMap<String, String> {
    let mut kv = IndexMap::new();

    for table in doc.select(&TABLE) {
        for row in table.select(&ROW) {
            let cells = row_cells(row);
            let [key_cell, value_cell, ..] = cells.as_slice() else {
                continue;
            };
            insert_first(&mut kv, cell_text(*key_cell), cell_text(*value_cell));
        }
    }

    for dl in doc.select(&DL) {
        for (dt, dd) in dl.select(&DT).zip(dl.select(&DD)) {
            insert_first(&mut kv, cell_text(dt), cell_text(dd));
        }
    }

    kv
}

/// Direct `<td>`/`<th>` children of a row.
pub(crate) fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .collect()
}

/// Whitespace-normalized text of an element, joined with single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize_spaces(&el.text().collect::<Vec<_>>().join(" "))
}

/// Cell text, preferring the first nested `<p>` when it carries text.
///
/// The firmware wraps values in a `<p>` next to a duplicate sibling for
/// small screens; the paragraph holds the canonical copy.
fn cell_text(cell: ElementRef<'_>) -> String {
    let text = cell
        .select(&PARAGRAPH)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| element_text(cell));
    collapse_unit_echo(&text).to_owned()
}

fn insert_first(kv: &mut IndexMap<String, String>, key: String, value: String) {
    if key.is_empty() {
        return;
    }
    kv.entry(key).or_insert(value);
}
