// Capability probe
//
// Visits every module of a profile, trying each known endpoint until one
// yields data, resolving XHR shell pages into their fragments on the way.
// Fetches run one at a time; embedded HTTP servers cope badly with
// concurrent requests.

use std::future::Future;

use tracing::debug;

use crate::error::Error;
use crate::html::{extract_xhr_endpoints, parse_device_table};
use crate::luci::{LuciClient, luci_path};
use crate::model::{Module, ModuleData, ModuleRecord, SensorValue, Snapshot};
use crate::profile::ModelFamily;
use crate::schema::{endpoints, match_builtin, sensors};

/// Anything that can fetch a LuCI page as text.
pub trait PageSource {
    /// Fetch `path` (already carrying the LuCI prefix).
    fn fetch_page(&self, path: &str) -> impl Future<Output = Result<String, Error>> + Send;
}

impl PageSource for LuciClient {
    async fn fetch_page(&self, path: &str) -> Result<String, Error> {
        self.get_text(path).await
    }
}

impl LuciClient {
    /// Snapshot of every module, probed with the generic profile.
    pub async fn get_snapshot(&self) -> Result<Snapshot, Error> {
        get_snapshot(self, ModelFamily::Generic).await
    }
}

/// Parse one page of `module`.
pub fn parse_module(module: Module, html: &str, row_selector: Option<&str>) -> ModuleData {
    if module.is_device_list() {
        ModuleData::Devices(parse_device_table(html, row_selector))
    } else {
        ModuleData::Record(match_builtin(module, html))
    }
}

fn empty_data(module: Module) -> ModuleData {
    if module.is_device_list() {
        ModuleData::Devices(Vec::new())
    } else {
        ModuleData::Record(ModuleRecord::new())
    }
}

fn absorb(into: &mut ModuleData, other: ModuleData) {
    match (into, other) {
        (ModuleData::Record(a), ModuleData::Record(b)) => a.merge(b),
        (ModuleData::Devices(a), ModuleData::Devices(b)) => a.extend(b),
        _ => {}
    }
}

fn is_usable(data: &ModuleData) -> bool {
    match data {
        ModuleData::Record(r) => r.has_data(),
        ModuleData::Devices(d) => !d.is_empty(),
    }
}

/// Fetch a page; `None` for empty bodies and non-auth failures.
async fn fetch<S: PageSource>(source: &S, path: &str) -> Result<Option<String>, Error> {
    match source.fetch_page(path).await {
        Ok(html) if html.trim().is_empty() => {
            debug!(path, "empty page");
            Ok(None)
        }
        Ok(html) => Ok(Some(html)),
        Err(e) if e.is_auth_failure() => Err(e),
        Err(e) => {
            debug!(path, error = %e, "fetch failed, trying next candidate");
            Ok(None)
        }
    }
}

/// Probe one module, returning the first usable candidate.
pub async fn probe_module<S: PageSource>(
    source: &S,
    module: Module,
    row_selector: Option<&str>,
) -> Result<Option<ModuleData>, Error> {
    for candidate in endpoints(module) {
        let path = luci_path(candidate);
        let Some(html) = fetch(source, &path).await? else {
            continue;
        };

        let fragments = extract_xhr_endpoints(&html);
        let data = if fragments.is_empty() {
            parse_module(module, &html, row_selector)
        } else {
            debug!(%module, count = fragments.len(), "shell page, loading fragments");
            let mut merged = empty_data(module);
            for (url, endpoint) in &fragments {
                if let Some(fragment) = fetch(source, &endpoint.fragment_path(url)).await? {
                    absorb(&mut merged, parse_module(module, &fragment, row_selector));
                }
            }
            merged
        };

        if is_usable(&data) {
            debug!(%module, path, "module resolved");
            return Ok(Some(data));
        }
    }
    debug!(%module, "no candidate yielded data");
    Ok(None)
}

/// Probe every module of `family` and enrich the result.
///
/// Fails only on authentication errors; modules without a usable page are
/// left out of the snapshot.
pub async fn get_snapshot<S: PageSource>(source: &S, family: ModelFamily) -> Result<Snapshot, Error> {
    let mut snapshot = Snapshot::new();
    for &module in family.modules() {
        if let Some(data) = probe_module(source, module, family.row_selector()).await? {
            snapshot.insert(module, data);
        }
    }
    enrich_wan_from_gsm(&mut snapshot);
    Ok(snapshot)
}

/// Fill unknown WAN fields from the GSM record, creating the WAN record on
/// cellular-only routers when GSM reports at least one of them. Known WAN
/// values are never overwritten.
pub fn enrich_wan_from_gsm(snapshot: &mut Snapshot) {
    let Some(gsm) = snapshot.record(Module::Gsm) else {
        return;
    };
    let pick = |keys: &[&str]| keys.iter().find_map(|k| gsm.text(k)).map(str::to_owned);
    let derived = [
        ("public_ip", pick(&["public_ip", "ip_address"])),
        ("ip", pick(&["ip_address", "public_ip"])),
        ("type", pick(&["network_type"])),
        ("uptime", pick(&["connected_time"])),
    ];

    if derived.iter().all(|(_, value)| value.is_none()) {
        return;
    }
    if snapshot.record(Module::Wan).is_none() {
        let mut blank = ModuleRecord::new();
        for spec in sensors(Module::Wan) {
            blank.insert(spec.key, spec.unknown());
        }
        snapshot.insert(Module::Wan, ModuleData::Record(blank));
    }
    let Some(wan) = snapshot.record_mut(Module::Wan) else {
        return;
    };
    for (key, value) in derived {
        let Some(value) = value else { continue };
        if wan.get(key).is_none_or(SensorValue::is_unknown) {
            wan.insert(key, SensorValue::Text(value));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    enum Canned {
        Page(String),
        Rejected(u16),
        Broken,
    }

    /// Serves canned pages; unknown paths are empty.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<String, Canned>,
        hits: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn page(mut self, path: &str, html: &str) -> Self {
            self.pages.insert(path.to_owned(), Canned::Page(html.to_owned()));
            self
        }

        fn rejected(mut self, path: &str, status: u16) -> Self {
            self.pages.insert(path.to_owned(), Canned::Rejected(status));
            self
        }

        fn broken(mut self, path: &str) -> Self {
            self.pages.insert(path.to_owned(), Canned::Broken);
            self
        }

        fn hits(&self) -> Vec<String> {
            self.hits.lock().unwrap().clone()
        }
    }

    impl PageSource for FakeSource {
        async fn fetch_page(&self, path: &str) -> Result<String, Error> {
            self.hits.lock().unwrap().push(path.to_owned());
            match self.pages.get(path) {
                Some(Canned::Page(html)) => Ok(html.clone()),
                Some(Canned::Rejected(status)) => Err(Error::SessionRejected { status: *status }),
                Some(Canned::Broken) => Err(Error::Tls("handshake failed".into())),
                None => Ok(String::new()),
            }
        }
    }

    fn kv_table(rows: &[(&str, &str)]) -> String {
        let body: String = rows
            .iter()
            .map(|(k, v)| format!("<tr><td>{k}</td><td>{v}</td></tr>"))
            .collect();
        format!("<table>{body}</table>")
    }

    #[tokio::test]
    async fn falls_through_to_the_alternate_endpoint() {
        let source = FakeSource::default().page(
            "/cgi-bin/luci/admin/services/dhcp/status",
            &kv_table(&[("Start", "192.168.10.100")]),
        );
        let data = probe_module(&source, Module::Dhcp, None).await.unwrap();
        assert!(data.is_some());
        assert_eq!(
            source.hits(),
            vec![
                "/cgi-bin/luci/admin/services/dhcp/status?detail=1",
                "/cgi-bin/luci/admin/services/dhcp/status",
            ]
        );
    }

    #[tokio::test]
    async fn transport_failures_move_on_to_the_next_candidate() {
        let source = FakeSource::default()
            .broken("/cgi-bin/luci/admin/services/dhcp/status?detail=1")
            .page(
                "/cgi-bin/luci/admin/services/dhcp/status",
                &kv_table(&[("Start", "192.168.10.100")]),
            );
        let data = probe_module(&source, Module::Dhcp, None).await.unwrap().unwrap();
        assert_eq!(data.as_record().unwrap().text("ip_start"), Some("192.168.10.100"));
        assert_eq!(source.hits().len(), 2);
    }

    #[tokio::test]
    async fn shell_pages_resolve_their_fragments() {
        let shell = r"<div id='s'></div>
            <script>cbi_xhr_load('#s', 'replace', '/cgi-bin/luci/admin/network/lan/addr', 'part=1');
            cbi_xhr_load('#t', 'replace', '/cgi-bin/luci/admin/network/lan/hw', 'part=2');</script>";
        let source = FakeSource::default()
            .page("/cgi-bin/luci/admin/network/lan/status?detail=1", shell)
            .page(
                "/cgi-bin/luci/admin/network/lan/addr?part=1",
                &kv_table(&[("IP Address", "192.168.10.1")]),
            )
            .page(
                "/cgi-bin/luci/admin/network/lan/hw?part=2",
                &kv_table(&[("MAC Address", "80:AF:CA:00:00:01")]),
            );
        let data = probe_module(&source, Module::Lan, None).await.unwrap().unwrap();
        let record = data.as_record().unwrap();
        assert_eq!(record.text("ip"), Some("192.168.10.1"));
        assert_eq!(record.text("mac"), Some("80:AF:CA:00:00:01"));
    }

    #[tokio::test]
    async fn pages_without_values_are_skipped() {
        let source = FakeSource::default().page(
            "/cgi-bin/luci/admin/network/lan/status?detail=1",
            "<p>Please wait</p>",
        );
        assert!(probe_module(&source, Module::Lan, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn auth_failures_abort_the_probe() {
        let source = FakeSource::default()
            .rejected("/cgi-bin/luci/admin/system/status?detail=1", 403);
        let err = get_snapshot(&source, ModelFamily::Wr6500).await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn gsm_only_router_gets_a_wan_record() {
        let source = FakeSource::default().page(
            "/cgi-bin/luci/admin/network/gcom/status?detail=1&iface=4g",
            &kv_table(&[("IP Address", "10.0.0.5"), ("Network Type", "LTE")]),
        );
        let snapshot = get_snapshot(&source, ModelFamily::P5).await.unwrap();
        let wan = snapshot.record(Module::Wan).unwrap();
        assert_eq!(wan.text("ip"), Some("10.0.0.5"));
        assert_eq!(wan.text("public_ip"), Some("10.0.0.5"));
        assert_eq!(wan.text("gateway"), None);
    }

    #[test]
    fn gsm_without_wan_fields_adds_no_wan_record() {
        let mut gsm = ModuleRecord::new();
        gsm.insert("signal", SensorValue::Integer(Some(-71)));
        gsm.insert("ip_address", SensorValue::unknown_text());
        let mut snapshot = Snapshot::new();
        snapshot.insert(Module::Gsm, ModuleData::Record(gsm));
        enrich_wan_from_gsm(&mut snapshot);
        assert!(snapshot.record(Module::Wan).is_none());
    }

    #[test]
    fn enrichment_keeps_known_wan_fields() {
        let mut gsm = ModuleRecord::new();
        gsm.insert("ip_address", SensorValue::Text("10.0.0.5".into()));
        gsm.insert("connected_time", SensorValue::Text("1h 2m".into()));
        let mut wan = ModuleRecord::new();
        wan.insert("ip", SensorValue::Text("203.0.113.9".into()));
        wan.insert("uptime", SensorValue::unknown_text());

        let mut snapshot = Snapshot::new();
        snapshot.insert(Module::Gsm, ModuleData::Record(gsm));
        snapshot.insert(Module::Wan, ModuleData::Record(wan));
        enrich_wan_from_gsm(&mut snapshot);

        let wan = snapshot.record(Module::Wan).unwrap();
        assert_eq!(wan.text("ip"), Some("203.0.113.9"));
        assert_eq!(wan.text("uptime"), Some("1h 2m"));
        assert_eq!(wan.text("public_ip"), Some("10.0.0.5"));
    }
}
