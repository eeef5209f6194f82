//! Wi-Fi radio handlers.

use cudy_core::{Router, WifiBand, WifiState};

use crate::cli::{GlobalOpts, WifiArgs, WifiCommand};
use crate::error::CliError;
use crate::output;

use super::util;

fn band_label(band: WifiBand) -> &'static str {
    match band {
        WifiBand::Band24 => "2.4 GHz",
        WifiBand::Band5 => "5 GHz",
    }
}

fn detail(state: &WifiState, color: bool) -> String {
    [WifiBand::Band24, WifiBand::Band5]
        .iter()
        .map(|&band| {
            format!(
                "{:<8} {}",
                band_label(band),
                output::on_off(state.get(band), color)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(router: &Router, args: WifiArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (band, enabled) = match args.command.unwrap_or(WifiCommand::Status) {
        WifiCommand::Status => {
            let state = router.wifi_state().await?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &state,
                |s| detail(s, color),
                |s| format!("2g={}\n5g={}", s.band_24, s.band_5),
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        WifiCommand::On { band } => (band, true),
        WifiCommand::Off { band } => (band, false),
    };

    if !enabled {
        let prompt = format!(
            "Disable the {} radio? Clients on it will drop.",
            band_label(band)
        );
        if !util::confirm(&prompt, "wifi off", global.yes)? {
            return Ok(());
        }
    }
    router.set_wifi(band, enabled).await?;
    util::note(
        &format!(
            "{} radio {}",
            band_label(band),
            if enabled { "enabled" } else { "disabled" }
        ),
        global.quiet,
    );
    Ok(())
}
