// HTML extraction engine
//
// Pure functions from page source to structured data. Nothing here does I/O,
// and nothing here fails: a page that does not look as expected yields fewer
// values, never an error.

pub mod devices;
pub mod form;
pub mod kv;
pub mod text;
pub mod xhr;

pub use devices::parse_device_table;
pub use kv::extract_kv;
pub use text::{
    collapse_self_repeat, collapse_unit_echo, dedupe_lines, normalize_spaces, to_int_or_none,
};
pub use xhr::{XhrEndpoint, extract_xhr_endpoints};
