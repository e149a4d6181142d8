use tokio_util::sync::CancellationToken;

use track_api::{RECORD_SIZE, SystemClock};
use track_sim::{RunSummary, StopReason};
use track_transport::Endpoint;

use super::config::Effective;
use super::error::TrackGenError;

pub async fn run(eff: &Effective) -> Result<(), TrackGenError> {
    print_banner(eff);

    let mut transport = track_transport::open(&eff.endpoint, &eff.transport)?;

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    if eff.run.grace_ms > 0 {
        println!("Waiting {:.1}s for subscribers to connect...", eff.run.grace_ms as f64 / 1000.0);
    }
    println!("Sending... (Ctrl+C to stop)");

    let result = track_sim::run(&eff.run, &mut transport, &SystemClock::new(), &cancel).await;

    cancel.cancel();
    let _ = watcher.await;

    let summary = result?;
    print_summary(&summary);
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => {
                tracing::info!("interrupt received, stopping");
                cancel.cancel();
            }
            Err(e) => tracing::warn!(error = ?e, "cannot listen for Ctrl+C"),
        },
        _ = cancel.cancelled() => {}
    }
}

fn print_banner(eff: &Effective) {
    let run = &eff.run;
    println!("Track Generator");
    println!("  endpoint : {}", eff.endpoint);
    match eff.endpoint {
        Endpoint::Zmq(_) => println!("  protocol : zeromq pub"),
        Endpoint::RawTcp(_) => println!("  framing  : {}", eff.transport.framing.kind),
        Endpoint::Udp(_) => {}
    }
    println!("  track id : {}", run.track_id);
    println!(
        "  interval : {}ms ({:.1} Hz)",
        run.interval_ms,
        1000.0 / run.interval_ms as f64
    );
    if run.count > 0 {
        println!("  count    : {}", run.count);
    } else {
        println!("  count    : until Ctrl+C");
    }
    println!("  message  : {RECORD_SIZE} bytes");
    println!();
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.stop == StopReason::Cancelled {
        println!("  interrupted after {} messages", summary.sent);
    }
    println!(
        "  done: {} sent in {:.2}s ({:.1} msg/s)",
        summary.sent,
        summary.elapsed.as_secs_f64(),
        summary.rate()
    );
    if summary.failed > 0 {
        println!("  failed: {}", summary.failed);
    }
}
