//! `GlobalOpts`-aware wrappers around `cudy_config`.
//!
//! Flags override the profile; with no profile at all, `--host` and a
//! password are enough to build a `RouterConfig`.

use std::time::Duration;

use cudy_config::{Config, Profile};
use cudy_core::RouterConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Apply flag overrides on top of a profile.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if global.https {
        profile.use_https = true;
    }
    if global.model.is_some() {
        profile.model = global.model;
    }
    if global.verify_tls {
        profile.verify_tls = true;
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
}

/// Build the `RouterConfig` for this invocation: config file, profile, then
/// CLI flags. Returns the profile name alongside.
pub fn build_router_config(global: &GlobalOpts) -> Result<(String, RouterConfig), CliError> {
    let cfg = cudy_config::load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.host.is_some() => Profile {
            username: "admin".into(),
            ..Profile::default()
        },
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: cudy_config::config_path().display().to_string(),
            });
        }
    };
    apply_overrides(&mut profile, global);

    let password = match global.password {
        Some(ref pw) => SecretString::from(pw.clone()),
        None => cudy_config::resolve_password(&profile, &profile_name)?,
    };
    let config = cudy_config::router_config(&profile, &cfg.defaults, password)?;
    Ok((profile_name, config))
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Same config with background polling at `interval`.
pub fn with_polling(mut config: RouterConfig, interval: Duration) -> RouterConfig {
    config.poll_interval = interval;
    config
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use cudy_core::ModelFamily;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["cudy"];
        argv.extend_from_slice(args);
        argv.push("detect");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let mut profile = Profile {
            host: "192.168.10.1".into(),
            username: "admin".into(),
            ..Profile::default()
        };
        apply_overrides(
            &mut profile,
            &global(&["-H", "10.0.0.1", "-u", "root", "--https", "-m", "p5"]),
        );
        assert_eq!(profile.host, "10.0.0.1");
        assert_eq!(profile.username, "root");
        assert!(profile.use_https);
        assert_eq!(profile.model, Some(ModelFamily::P5));
        assert_eq!(profile.timeout, None);
    }

    #[test]
    fn listing_profiles() {
        let mut cfg = Config::default();
        assert_eq!(available_profiles(&cfg), "(none)");
        cfg.profiles.insert("home".into(), Profile::default());
        cfg.profiles.insert("office".into(), Profile::default());
        assert_eq!(available_profiles(&cfg), "home, office");
    }
}
