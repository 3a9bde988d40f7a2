//! Run command handler
//!
//! Stands in for the device main loop: boot, tick on an interval, and
//! write everything pending on the way out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

use minilabo_core::{Config, Runtime};

use super::boot;
use crate::output::Output;

pub async fn run(
    config: Config,
    duration_ms: Option<u64>,
    tick_ms: u64,
    output: &Output,
) -> Result<()> {
    let mut runtime = boot(config);

    if !output.is_quiet() {
        let format = output.format;
        runtime.logger().set_sink(Arc::new(move |line: &str| {
            Output::new(format).log_line(line);
        }));
        // Boot lines were logged before the sink was attached
        for line in runtime.logger().tail(usize::MAX).lines() {
            output.log_line(line);
        }
    }

    let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
    info!("Main loop started, tick every {} ms", tick_ms);
    let ticks = drive(&mut runtime, tick_ms, deadline, tokio::signal::ctrl_c()).await;
    info!("Main loop stopped after {} ticks", ticks);

    runtime.logger().clear_sink();
    let written = runtime.shutdown();
    output.success(&format!("Stopped, wrote {} pending area(s)", written));
    Ok(())
}

/// Tick `runtime` until `deadline` passes or `stop` resolves
///
/// `stop` lives across iterations, so a stop raised while a tick is busy
/// is seen on the next iteration.
async fn drive<F>(runtime: &mut Runtime, tick_ms: u64, deadline: Option<Instant>, stop: F) -> u64
where
    F: Future,
{
    let mut interval = time::interval(Duration::from_millis(tick_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(stop);
    let mut ticks = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut stop => {
                info!("Interrupted");
                break;
            }
        }

        runtime.tick();
        ticks += 1;

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
    }

    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_stop_raised_before_poll_ends_loop() {
        let temp_dir = TempDir::new().unwrap();
        let mut runtime = boot(Config::with_data_dir(temp_dir.path()));
        let (tx, rx) = oneshot::channel::<()>();
        tx.send(()).unwrap();

        let ticks = drive(&mut runtime, 10, None, rx).await;

        // At most the immediate first interval tick may win the race
        assert!(ticks <= 1);
    }

    #[tokio::test]
    async fn test_deadline_ends_loop() {
        let temp_dir = TempDir::new().unwrap();
        let mut runtime = boot(Config::with_data_dir(temp_dir.path()));
        let deadline = Instant::now() + Duration::from_millis(30);

        let ticks = drive(&mut runtime, 5, Some(deadline), std::future::pending::<()>()).await;

        assert!(ticks >= 1);
        assert!(Instant::now() >= deadline);
    }
}
