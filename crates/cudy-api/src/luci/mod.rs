// LuCI session client
//
// `client` owns the transport and the `sysauth` session, `auth` performs the
// form login, `actions` holds the mutating operations.

mod actions;
mod auth;
mod client;

pub use client::{
    AuthSession, AuthState, Body, ClientConfig, LUCI_PREFIX, LuciClient, Payload, Scheme,
    luci_path,
};
