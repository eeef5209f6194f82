//! Config subcommand handlers.

use cudy_config::{Config, Profile};
use cudy_core::ModelFamily;
use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{active_profile_name, available_profiles};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `key = value` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "host" => profile.host = value,
        "username" => profile.username = value,
        "password" => profile.password = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "use_https" | "use-https" => {
            profile.use_https = parse_value(key, &value, "'true' or 'false'")?;
        }
        "verify_tls" | "verify-tls" => {
            profile.verify_tls = parse_value(key, &value, "'true' or 'false'")?;
        }
        "model" => {
            profile.model = if value == "auto" {
                None
            } else {
                Some(parse_value(key, &value, "auto, generic, wr6500, r700 or p5")?)
            };
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "poll_interval" | "poll-interval" => {
            profile.poll_interval = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "service_restart_timeout" | "service-restart-timeout" => {
            profile.service_restart_timeout =
                Some(parse_value(key, &value, "a number (seconds)")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: host, username, password, \
                     password_env, use_https, verify_tls, model, ca_cert, timeout, \
                     poll_interval, service_restart_timeout"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = cudy_config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.default_profile.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = cudy_config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile {
                    username: "admin".into(),
                    ..Profile::default()
                });
            set_key(profile, &key, value)?;
            cudy_config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = cudy_config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: cudy config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.host);
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = cudy_config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            cudy_config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = cudy_config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: available_profiles(&cfg),
                });
            }

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            cudy_config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", cudy_config::config_path().display());
            Ok(())
        }
    }
}

/// Interactive wizard: one profile, merged into the existing config.
fn init() -> Result<(), CliError> {
    let config_path = cudy_config::config_path();
    eprintln!("cudy configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let host: String = Input::new()
        .with_prompt("Router address")
        .default("192.168.10.1".into())
        .interact_text()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("Username")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let password = if store_selection == 0 {
        cudy_config::store_password(&profile_name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password)
    };

    let families = [
        ModelFamily::Generic,
        ModelFamily::Wr6500,
        ModelFamily::R700,
        ModelFamily::P5,
    ];
    let mut model_choices = vec!["auto-detect".to_owned()];
    model_choices.extend(families.iter().map(ToString::to_string));
    let model_selection = Select::new()
        .with_prompt("Model profile")
        .items(&model_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let model = model_selection
        .checked_sub(1)
        .and_then(|i| families.get(i).copied());

    let profile = Profile {
        host,
        username,
        password,
        model,
        ..Profile::default()
    };

    let mut cfg: Config = cudy_config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    cudy_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: cudy detect");
    Ok(())
}
