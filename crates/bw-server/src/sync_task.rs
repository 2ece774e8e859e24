//! Background content sync.
//!
//! Runs a sync cycle every interval on the blocking pool and rebuilds the
//! site when a cycle wrote files. The first tick fires immediately but only
//! syncs when a check is due.

use std::sync::Arc;

use bw_site::Site;
use bw_sync::Syncer;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the periodic sync loop.
pub(crate) fn spawn(site: Arc<Site>, syncer: Arc<Syncer>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(syncer.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = syncer.interval().as_secs(), "Content sync enabled");

        let mut first = true;
        loop {
            interval.tick().await;
            let force = !std::mem::take(&mut first);
            run_once(&site, &syncer, force).await;
        }
    })
}

/// Run one cycle (skipped unless `force` or due) and rebuild on change.
async fn run_once(site: &Arc<Site>, syncer: &Arc<Syncer>, force: bool) {
    let cycle_syncer = Arc::clone(syncer);
    let changed = tokio::task::spawn_blocking(move || {
        if !force && !cycle_syncer.is_due() {
            tracing::debug!("Content sync not due yet");
            return false;
        }
        cycle_syncer.run_cycle().changed()
    })
    .await;

    match changed {
        Ok(true) => {
            let rebuild_site = Arc::clone(site);
            if let Err(e) = tokio::task::spawn_blocking(move || rebuild_site.rebuild()).await {
                tracing::error!(error = %e, "Site rebuild task failed");
            }
        }
        Ok(false) => {}
        Err(e) => tracing::error!(error = %e, "Content sync task failed"),
    }
}
