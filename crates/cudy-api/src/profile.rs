// Model profiles
//
// A model family decides which modules a probe visits and how device rows
// are selected. Families are resolved from the model string the router
// reports on its status pages.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::html::kv::extract_kv;
use crate::luci::luci_path;
use crate::model::Module;
use crate::probe::PageSource;

static MODEL_LINE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Model\s*[:<]\s*([^\n<]+)",
        r"(?i)Hardware\s*[:<]\s*([^\n<]+)",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("model regex is valid"))
    .collect()
});

/// Pages that render the model name, in the order they are tried.
const DETECT_PAGES: &[&str] = &[
    "/admin/system/status?detail=1",
    "/admin/status/overview",
    "/admin/system/overview",
];

/// Router family.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModelFamily {
    /// Probe everything.
    #[default]
    Generic,
    Wr6500,
    R700,
    P5,
}

impl ModelFamily {
    /// Modules probed for this family, in probe order.
    pub fn modules(self) -> &'static [Module] {
        match self {
            Self::Generic => &[
                Module::System,
                Module::Lan,
                Module::Wan,
                Module::WanSecondary,
                Module::MultiWan,
                Module::Mesh,
                Module::Dhcp,
                Module::Wifi24g,
                Module::Wifi5g,
                Module::Wifi6g,
                Module::Gsm,
                Module::Sms,
                Module::Vpn,
                Module::Usb,
                Module::Devices,
                Module::DeviceList,
            ],
            Self::Wr6500 => &[
                Module::System,
                Module::Mesh,
                Module::Lan,
                Module::Wan,
                Module::Devices,
                Module::DeviceList,
            ],
            Self::R700 => &[
                Module::System,
                Module::Lan,
                Module::Wan,
                Module::Dhcp,
                Module::Devices,
                Module::DeviceList,
            ],
            Self::P5 => &[
                Module::Info,
                Module::System,
                Module::Mesh,
                Module::Lan,
                Module::Wifi24g,
                Module::Wifi5g,
                Module::Dhcp,
                Module::Gsm,
                Module::Sms,
                Module::Devices,
                Module::DeviceList,
            ],
        }
    }

    /// Device row selector, `None` for the default selector chain.
    pub fn row_selector(self) -> Option<&'static str> {
        match self {
            Self::R700 => Some("table.table-striped tbody tr[id^='cbi-table-']"),
            _ => None,
        }
    }
}

/// Model-name patterns mapped to families. First match wins.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    patterns: Vec<(Regex, ModelFamily)>,
}

impl ProfileTable {
    /// Patterns for the models this crate knows about.
    pub fn builtin() -> Self {
        let patterns = [
            (r"(?i)WR6500", ModelFamily::Wr6500),
            (r"(?i)R700", ModelFamily::R700),
            (r"(?i)\bP5\b", ModelFamily::P5),
            (r"(?i)WR-", ModelFamily::Wr6500),
        ]
        .into_iter()
        .map(|(p, family)| (Regex::new(p).expect("profile regex is valid"), family))
        .collect();
        Self { patterns }
    }

    /// Build a table from `(pattern, family)` pairs.
    pub fn from_patterns<'a>(
        pairs: impl IntoIterator<Item = (&'a str, ModelFamily)>,
    ) -> Result<Self, regex::Error> {
        let patterns = pairs
            .into_iter()
            .map(|(p, family)| Regex::new(p).map(|re| (re, family)))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    /// Family of a model string, if any pattern matches.
    pub fn lookup(&self, model: &str) -> Option<ModelFamily> {
        self.patterns
            .iter()
            .find(|(re, _)| re.is_match(model))
            .map(|(_, family)| *family)
    }
}

/// Outcome of model detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedModel {
    /// Model string as the router rendered it.
    pub raw: Option<String>,
    pub family: ModelFamily,
}

/// Model string of a status page: the `Model`/`Hardware` rows, else a
/// regex over the raw markup.
pub fn model_string(html: &str) -> Option<String> {
    let kv = extract_kv(html);
    let from_table = ["Model", "Model Name", "Hardware"]
        .iter()
        .find_map(|label| kv.get(*label))
        .filter(|v| !v.is_empty())
        .cloned();
    from_table.or_else(|| {
        MODEL_LINE
            .iter()
            .find_map(|re| re.captures(html))
            .map(|c| c[1].trim().to_owned())
            .filter(|s| !s.is_empty())
    })
}

/// Detect the router model over `source`.
///
/// Authentication errors propagate; anything else degrades to
/// [`ModelFamily::Generic`].
pub async fn detect_model<S: PageSource>(
    source: &S,
    table: &ProfileTable,
) -> Result<DetectedModel, Error> {
    let mut body = None;
    for page in DETECT_PAGES {
        match source.fetch_page(&luci_path(page)).await {
            Ok(html) if !html.trim().is_empty() => {
                body = Some(html);
                break;
            }
            Ok(_) => debug!(page, "empty model detection page"),
            Err(e) if e.is_auth_failure() => return Err(e),
            Err(e) => debug!(page, error = %e, "model detection page failed"),
        }
    }

    let Some(body) = body else {
        warn!("no page to detect the model from, using generic profile");
        return Ok(DetectedModel {
            raw: None,
            family: ModelFamily::Generic,
        });
    };

    let raw = model_string(&body);
    let family = raw
        .as_deref()
        .and_then(|m| table.lookup(m))
        .or_else(|| table.lookup(&body))
        .unwrap_or_default();
    info!(model = raw.as_deref().unwrap_or("unknown"), %family, "detected router model");
    Ok(DetectedModel { raw, family })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtin_patterns() {
        let table = ProfileTable::builtin();
        assert_eq!(table.lookup("Cudy WR6500 V1.0"), Some(ModelFamily::Wr6500));
        assert_eq!(table.lookup("R700"), Some(ModelFamily::R700));
        assert_eq!(table.lookup("P5 (EU)"), Some(ModelFamily::P5));
        assert_eq!(table.lookup("WR-3000"), Some(ModelFamily::Wr6500));
        assert_eq!(table.lookup("AP5000"), None);
        assert_eq!(table.lookup("LT500"), None);
    }

    #[test]
    fn custom_table() {
        let table = ProfileTable::from_patterns([("^LT", ModelFamily::P5)]).unwrap();
        assert_eq!(table.lookup("LT500"), Some(ModelFamily::P5));
        assert!(ProfileTable::from_patterns([("(", ModelFamily::P5)]).is_err());
    }

    #[test]
    fn model_from_table_row_or_markup() {
        let table = "<table><tr><td>Model</td><td>WR6500</td></tr></table>";
        assert_eq!(model_string(table).as_deref(), Some("WR6500"));

        let markup = "<div>Hardware: R700 V2.0\n</div>";
        assert_eq!(model_string(markup).as_deref(), Some("R700 V2.0"));

        assert_eq!(model_string("<p>nothing</p>"), None);
    }

    #[test]
    fn family_names() {
        assert_eq!(ModelFamily::Wr6500.to_string(), "wr6500");
        assert_eq!(ModelFamily::from_str("R700").unwrap(), ModelFamily::R700);
        assert_eq!(ModelFamily::default(), ModelFamily::Generic);
        assert!(ModelFamily::P5.modules().contains(&Module::Gsm));
        assert!(!ModelFamily::Wr6500.modules().contains(&Module::Gsm));
        assert_eq!(ModelFamily::Generic.modules().len(), 16);
    }
}
