use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use log_record_pipeline::config::PipelineConfig;
use log_record_pipeline::init::init_tracing_with_config;
use log_record_pipeline::sink::NoopSink;

#[tokio::main]
async fn main() {
    let config = PipelineConfig {
        service_name: "load-test".to_string(),
        enable_stdout: false,
        ..PipelineConfig::default()
    };
    let sink = Arc::new(NoopSink);
    if let Err(e) = init_tracing_with_config(sink, config) {
        eprintln!("failed to install subscriber: {e}");
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(
            iteration = i,
            tags = "env:bench,Run:Default",
            "default load test error"
        );
    }

    let elapsed = start.elapsed();
    info!("not captured below the default minimum severity");
    println!(
        "built and sanitized {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give the forwarding task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
}
