//! Cron-driven run loop for `schedule` mode.

use std::future::Future;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::cron::CronSchedule;

/// Run `job` at every fire time of `schedule` until `shutdown` fires.
///
/// A failing job is logged and the loop carries on with the next fire time.
pub async fn run_forever<F, Fut>(
    schedule: &CronSchedule,
    run_on_start: bool,
    mut shutdown: broadcast::Receiver<()>,
    mut job: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if run_on_start {
        info!("Running import at startup");
        run_job(&mut job).await;
    }

    loop {
        let now = Utc::now();
        let next = schedule
            .next_after(now)
            .ok_or_else(|| anyhow!("cron schedule '{}' never fires", schedule))?;
        let wait = (next - now).to_std().unwrap_or_default();

        info!(next_run = %next, schedule = %schedule, "Waiting for next scheduled run");

        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!("Shutting down scheduler");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                info!(scheduled_for = %next, "Running scheduled import");
                run_job(&mut job).await;
            }
        }
    }

    Ok(())
}

async fn run_job<F, Fut>(job: &mut F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if let Err(e) = job().await {
        error!(error = %format!("{:#}", e), "Scheduled import failed");
    }
}
