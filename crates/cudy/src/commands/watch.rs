//! Watch handler: keeps a polling connection open and prints every
//! published snapshot.

use chrono::Local;
use cudy_core::{Router, RouterConfig, Snapshot};
use tracing::debug;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::{devices, snapshot};

fn render(snap: &Snapshot, args: &WatchArgs, global: &GlobalOpts) -> String {
    if args.devices {
        output::render_single(
            &global.output,
            snap.devices(),
            devices::device_table,
            |list| {
                list.iter()
                    .map(|d| d.mac.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        )
    } else {
        snapshot::render(&global.output, snap)
    }
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub async fn handle(
    config: RouterConfig,
    profile: &str,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let router = Router::new(config)?;
    router
        .connect()
        .await
        .map_err(|e| CliError::from(e).for_profile(profile))?;

    let mut snapshots = router.snapshots();
    let mut state = router.connection_state();
    let first = snapshots.borrow_and_update().clone();
    output::print_output(&render(&first, args, global), global.quiet);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                if !global.quiet {
                    eprintln!("── {} ──", stamp());
                }
                output::print_output(&render(&snap, args, global), global.quiet);
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if !global.quiet {
                    eprintln!("[{}] router {current}", stamp());
                }
            }
        }
    }

    router.disconnect().await;
    Ok(())
}
