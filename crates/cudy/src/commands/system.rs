//! Reboot handler.

use cudy_core::Router;

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util;

pub async fn reboot(router: &Router, global: &GlobalOpts) -> Result<(), CliError> {
    let host = router.config().host.clone();
    if !util::confirm(&format!("Reboot router {host}?"), "reboot", global.yes)? {
        return Ok(());
    }
    router.reboot().await?;
    util::note("Router reboot initiated", global.quiet);
    Ok(())
}
