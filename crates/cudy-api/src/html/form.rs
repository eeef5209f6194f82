// HTML form harvesting for LuCI configuration pages
//
// Mutations resubmit the whole `cbi` form with a couple of fields changed,
// so every field is collected the way a browser would submit it.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static CBI_FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form[name='cbi']").expect("form selector is valid"));
static ANY_FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("form selector is valid"));
static FIELD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input[name], select[name], textarea[name]").expect("field selector is valid")
});
static OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("option selector is valid"));
static INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name]").expect("input selector is valid"));
static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("meta selector is valid"));
static JS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"token\s*:\s*['"]([0-9a-fA-F]{16,64})['"]"#).expect("token regex is valid")
});

const NON_SUBMITTING: &[&str] = &["button", "submit", "image", "reset"];

/// Successful controls of the page's `cbi` form (or its first form), in
/// document order. `None` when the page has no form at all.
///
/// Unchecked checkboxes and radios are left out; a checked one without a
/// `value` submits `"1"`.
pub fn form_fields(html: &str) -> Option<IndexMap<String, String>> {
    let doc = Html::parse_document(html);
    let form = config_form(&doc)?;

    let mut fields = IndexMap::new();
    for field in form.select(&FIELD) {
        let Some(name) = field.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let value = match field.value().name() {
            "input" => input_submission(field),
            "select" => select_submission(field),
            "textarea" => Some(field.text().collect()),
            _ => None,
        };
        if let Some(value) = value {
            fields.insert(name.to_owned(), value);
        }
    }
    Some(fields)
}

fn config_form(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&CBI_FORM)
        .next()
        .or_else(|| doc.select(&ANY_FORM).next())
}

fn input_submission(input: ElementRef<'_>) -> Option<String> {
    let el = input.value();
    let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
    if NON_SUBMITTING.contains(&kind.as_str()) {
        return None;
    }
    let value = el.attr("value");
    match kind.as_str() {
        "checkbox" | "radio" => el
            .attr("checked")
            .map(|_| value.unwrap_or("1").to_owned()),
        _ => Some(value.unwrap_or_default().to_owned()),
    }
}

fn select_submission(select: ElementRef<'_>) -> Option<String> {
    let options: Vec<ElementRef<'_>> = select.select(&OPTION).collect();
    let chosen = options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.first())?;
    Some(
        chosen
            .value()
            .attr("value")
            .map_or_else(|| chosen.text().collect::<String>().trim().to_owned(), str::to_owned),
    )
}

/// An `<input>` anywhere on the page, by exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub name: String,
    pub kind: String,
    pub value: Option<String>,
    pub checked: bool,
}

impl InputField {
    fn from_element(input: ElementRef<'_>) -> Option<Self> {
        let el = input.value();
        Some(Self {
            name: el.attr("name")?.to_owned(),
            kind: el.attr("type").unwrap_or("text").to_ascii_lowercase(),
            value: el.attr("value").map(str::to_owned),
            checked: el.attr("checked").is_some(),
        })
    }
}

/// Every named `<input>` on the page.
pub fn inputs(html: &str) -> Vec<InputField> {
    let doc = Html::parse_document(html);
    doc.select(&INPUT)
        .filter_map(InputField::from_element)
        .collect()
}

/// Named `<input>`s of the configuration form, as [`form_fields`] locates
/// it. `None` without a form.
pub fn form_inputs(html: &str) -> Option<Vec<InputField>> {
    let doc = Html::parse_document(html);
    let form = config_form(&doc)?;
    Some(
        form.select(&INPUT)
            .filter_map(InputField::from_element)
            .collect(),
    )
}

/// `value` of the named input, falling back to `content` of the named
/// `<meta>` tag.
pub fn hidden_value(html: &str, name: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let from_input = doc
        .select(&INPUT)
        .find(|el| el.value().attr("name") == Some(name))
        .and_then(|el| el.value().attr("value"));
    let from_meta = || {
        doc.select(&META)
            .find(|el| el.value().attr("name") == Some(name))
            .and_then(|el| el.value().attr("content"))
    };
    from_input.or_else(from_meta).map(str::to_owned)
}

/// Anti-CSRF token of a configuration page: the `token` hidden input, or
/// the `token: '<hex>'` literal LuCI embeds in inline scripts.
pub fn page_token(html: &str) -> Option<String> {
    hidden_value(html, "token")
        .filter(|t| !t.is_empty())
        .or_else(|| JS_TOKEN.captures(html).map(|c| c[1].to_owned()))
}
