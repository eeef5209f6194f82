// ── Command API ──
//
// Every mutation flows through the `Command` enum and a single processor
// task, so two changes never reach the router at the same time.

use cudy_api::WifiBand;

use crate::error::CoreError;

/// Envelope sent through the command channel with its reply slot.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Every write operation against a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reboot,
    SetWifi { band: WifiBand, enabled: bool },
    SetVpn { enabled: bool },
}

impl Command {
    /// Short name used in logs and errors.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::SetWifi { .. } => "wifi change",
            Self::SetVpn { .. } => "vpn change",
        }
    }

    /// Whether the snapshot is stale after this command succeeds.
    pub(crate) fn needs_refresh(self) -> bool {
        !matches!(self, Self::Reboot)
    }
}

/// Outcome of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
}
