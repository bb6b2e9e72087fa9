//! Stage a mock-connected GigE detector, take a few frames and print the
//! stream documents it emits.
//!
//! Run: cargo run -p areadaq-driver-gige --example acquire_demo

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use areadaq_core::{
    Connectable, DetectorController, DetectorTrigger, DetectorWriter, StaticPathProvider,
    TriggerInfo,
};
use areadaq_driver_gige::GigeDetector;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("areadaq_core=debug".parse()?))
        .init();

    let dir = tempfile::tempdir()?;
    let provider = StaticPathProvider::new(dir.path()).with_filename("demo");
    let detector = GigeDetector::new("gige1", "GIGE:", Arc::new(provider));
    detector.connect(true).await?;

    // A live IOC reports these; prime them the way it would.
    detector.hdf().file_path_exists.set_mock_value(true)?;
    detector
        .hdf()
        .full_file_name
        .set_mock_value(format!("{}/demo.h5", dir.path().display()))?;

    println!(
        "deadtime at 10 ms exposure: {} s (external triggers on GPIO line {})",
        detector.controller().get_deadtime(Some(0.01)),
        detector.get_external_trigger_gpio(),
    );

    detector.stage().await?;
    println!("describe: {}", serde_json::to_string_pretty(&detector.describe().await?)?);

    detector
        .prepare(TriggerInfo::new(3, DetectorTrigger::Internal).with_livetime(0.01))
        .await?;

    // Stand in for the plugin's frame counter.
    let num_captured = detector.hdf().num_captured.clone();
    tokio::spawn(async move {
        for count in 1..=3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = num_captured.set_mock_value(count);
        }
    });
    detector.writer().wait_for_index(3, Some(Duration::from_secs(1))).await?;

    for (kind, doc) in detector.collect_asset_docs(3).await? {
        println!("{kind}: {}", serde_json::to_string_pretty(&doc)?);
    }

    detector.unstage().await?;
    Ok(())
}
