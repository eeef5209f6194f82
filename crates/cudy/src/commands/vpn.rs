//! VPN handlers.

use cudy_core::Router;

use crate::cli::{GlobalOpts, VpnArgs, VpnCommand};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(router: &Router, args: VpnArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let enabled = match args.command.unwrap_or(VpnCommand::Status) {
        VpnCommand::Status => {
            let state = router.vpn_state().await?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &state,
                |s| format!("WireGuard  {}", output::on_off(s.wireguard, color)),
                |s| s.wireguard.to_string(),
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        VpnCommand::On => true,
        VpnCommand::Off => false,
    };

    router.set_vpn(enabled).await?;
    util::note(
        if enabled { "VPN enabled" } else { "VPN disabled" },
        global.quiet,
    );
    Ok(())
}
