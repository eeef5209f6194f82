// Shell page detection
//
// Some status pages render an empty container and fill it client-side with
// `cbi_xhr_load(selector, mode, url, args)`. The real content lives at the
// loader's target URL.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use scraper::{Html, Selector};

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("script selector is valid"));
static LOADER_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cbi_xhr_load\s*\(([^)]*)\)").expect("loader regex is valid"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).expect("quoted regex is valid"));

/// Query arguments of one fragment endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XhrEndpoint {
    pub args: String,
}

impl XhrEndpoint {
    /// `url` with the loader arguments appended as a query string.
    pub fn fragment_path(&self, url: &str) -> String {
        if self.args.is_empty() {
            url.to_owned()
        } else if url.contains('?') {
            format!("{url}&{}", self.args)
        } else {
            format!("{url}?{}", self.args)
        }
    }
}

/// Fragment endpoints referenced by inline scripts, in definition order.
///
/// A non-empty result marks the page as a shell.
pub fn extract_xhr_endpoints(html: &str) -> IndexMap<String, XhrEndpoint> {
    let mut endpoints = IndexMap::new();
    if !html.contains("cbi_xhr_load") {
        return endpoints;
    }

    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    for script in doc.select(&SCRIPT) {
        let source: String = script.text().collect();
        for call in LOADER_CALL.captures_iter(&source) {
            let args: Vec<&str> = QUOTED
                .captures_iter(&call[1])
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str())
                .collect();
            let Some((url, query)) = loader_target(&args) else {
                continue;
            };
            let tuple: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
            if !seen.insert(tuple) {
                continue;
            }
            endpoints.insert(
                url.to_owned(),
                XhrEndpoint {
                    args: query.to_owned(),
                },
            );
        }
    }
    endpoints
}

/// `(url, args)` of a loader call given its quoted arguments.
fn loader_target<'a>(args: &[&'a str]) -> Option<(&'a str, &'a str)> {
    match args {
        [_, _, url, rest @ ..] if !url.is_empty() => {
            Some((*url, rest.first().copied().unwrap_or_default()))
        }
        // older pages pass the url alone
        [url] if url.starts_with('/') => Some((*url, "")),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn single_loader_call() {
        let html = r"<html><body><div id='status'></div>
            <script>cbi_xhr_load('#status', 'replace', '/cgi-bin/luci/admin/x', 'iface=4g');</script>
            </body></html>";
        let endpoints = extract_xhr_endpoints(html);
        assert_eq!(endpoints.len(), 1);
        let (url, endpoint) = endpoints.get_index(0).unwrap();
        assert_eq!(url, "/cgi-bin/luci/admin/x");
        assert_eq!(endpoint.args, "iface=4g");
        assert_eq!(endpoint.fragment_path(url), "/cgi-bin/luci/admin/x?iface=4g");
    }

    #[test]
    fn duplicates_collapse_and_order_is_kept() {
        let html = r##"<script>
            cbi_xhr_load("#a", "replace", "/cgi-bin/luci/admin/a?detail=1", "");
            cbi_xhr_load("#b", "append", "/cgi-bin/luci/admin/b", "x=1");
            cbi_xhr_load("#a", "replace", "/cgi-bin/luci/admin/a?detail=1", "");
        </script>"##;
        let endpoints = extract_xhr_endpoints(html);
        let urls: Vec<&str> = endpoints.keys().map(String::as_str).collect();
        assert_eq!(urls, vec!["/cgi-bin/luci/admin/a?detail=1", "/cgi-bin/luci/admin/b"]);
        assert_eq!(endpoints[0].fragment_path(urls[0]), "/cgi-bin/luci/admin/a?detail=1");
    }

    #[test]
    fn query_joiner_depends_on_existing_query() {
        let endpoint = XhrEndpoint {
            args: "iface=wlan00".into(),
        };
        assert_eq!(endpoint.fragment_path("/s?detail=1"), "/s?detail=1&iface=wlan00");
        assert_eq!(endpoint.fragment_path("/s"), "/s?iface=wlan00");
    }

    #[test]
    fn plain_pages_are_not_shells() {
        assert!(extract_xhr_endpoints("").is_empty());
        assert!(extract_xhr_endpoints("<table><tr><td>a</td><td>b</td></tr></table>").is_empty());
        assert!(extract_xhr_endpoints("<script>var x = 1;</script>").is_empty());
    }
}
