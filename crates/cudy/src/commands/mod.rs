//! Command dispatch: bridges CLI args -> core Router -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod snapshot;
pub mod system;
pub mod util;
pub mod vpn;
pub mod watch;
pub mod wifi;

use std::time::Duration;

use cudy_core::{Router, RouterConfig};

use crate::cli::{Command, GlobalOpts};
use crate::config::with_polling;
use crate::error::CliError;

/// Dispatch a router-bound command to the appropriate handler.
///
/// Every command except `watch` runs against a one-shot connection.
pub async fn dispatch(
    cmd: Command,
    mut config: RouterConfig,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cmd = match cmd {
        Command::Watch(args) => {
            let config = with_polling(config, args.interval);
            return watch::handle(config, profile, &args, global).await;
        }
        other => other,
    };
    if matches!(cmd, Command::Detect) {
        config.model = None;
    }

    let router = Router::new(with_polling(config, Duration::ZERO))?;
    router
        .connect()
        .await
        .map_err(|e| CliError::from(e).for_profile(profile))?;

    let result = match cmd {
        Command::Snapshot(args) => snapshot::handle(&router, &args, global),
        Command::Detect => snapshot::detect(&router, global),
        Command::Devices(args) => devices::handle(&router, args, global),
        Command::Reboot => system::reboot(&router, global).await,
        Command::Wifi(args) => wifi::handle(&router, args, global).await,
        Command::Vpn(args) => vpn::handle(&router, args, global).await,
        // handled before connecting
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    };

    router.disconnect().await;
    result
}
