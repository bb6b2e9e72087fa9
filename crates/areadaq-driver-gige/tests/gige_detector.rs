//! Lifecycle tests for the GigE detector against mock-connected signals.
//!
//! Every test connects in mock mode; the file plugin's readback signals are
//! primed the way a live IOC would report them.

use std::sync::Arc;
use std::time::Duration;

use areadaq_core::{
    Connectable, DetectorController, DetectorTrigger, DetectorWriter, StaticPathProvider,
    TriggerInfo,
};
use areadaq_driver_gige::{GigeDetector, GigeDetectorConfig, GigeTriggerMode, GigeTriggerSource};

/// A connected detector whose plugin sees `dir` and reports `scan.h5`.
async fn mocked_detector(dir: &std::path::Path) -> GigeDetector {
    let provider = StaticPathProvider::new(dir).with_filename("scan");
    let det = GigeDetector::new("gige1", "GIGE:", Arc::new(provider));
    det.connect(true).await.unwrap();
    det.hdf().file_path_exists.set_mock_value(true).unwrap();
    det.hdf()
        .full_file_name
        .set_mock_value(format!("{}/scan.h5", dir.display()))
        .unwrap();
    det
}

#[tokio::test]
async fn deadtime_is_constant_across_exposures() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    for exposure in [0.0, 0.1, 1.0, 10.0, 100.0] {
        assert_eq!(det.controller().get_deadtime(Some(exposure)), 1961e-6);
    }
    assert_eq!(det.controller().get_deadtime(None), 1961e-6);
}

#[tokio::test]
async fn gpio_defaults_to_line_one_and_rejects_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    assert_eq!(det.get_external_trigger_gpio(), 1);

    det.set_external_trigger_gpio(2).unwrap();
    assert_eq!(det.get_external_trigger_gpio(), 2);

    let err = det.set_external_trigger_gpio(55).unwrap_err();
    assert_eq!(
        err.to_string(),
        "GigeDetector only supports the following GPIO indices: (1, 2, 3, 4) \
         but was asked to use 55"
    );
    assert_eq!(det.get_external_trigger_gpio(), 2, "rejected selection changes nothing");
}

#[tokio::test]
async fn trigger_source_changes_only_on_arm() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    let source = &det.driver().trigger_source;
    assert_eq!(source.get_value().await.unwrap(), GigeTriggerSource::Freerun);

    det.set_external_trigger_gpio(3).unwrap();
    assert_eq!(
        source.get_value().await.unwrap(),
        GigeTriggerSource::Freerun,
        "selecting a line writes no camera register"
    );

    det.stage().await.unwrap();
    det.prepare(TriggerInfo::new(1, DetectorTrigger::EdgeTrigger).with_deadtime(0.002))
        .await
        .unwrap();
    assert_eq!(source.get_value().await.unwrap(), GigeTriggerSource::Line3);
    assert_eq!(det.driver().trigger_mode.get_value().await.unwrap(), GigeTriggerMode::On);
}

#[tokio::test]
async fn internal_preparation_returns_to_free_run() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    det.stage().await.unwrap();

    det.prepare(TriggerInfo::new(2, DetectorTrigger::EdgeTrigger).with_deadtime(0.002))
        .await
        .unwrap();
    assert_eq!(
        det.driver().trigger_source.get_value().await.unwrap(),
        GigeTriggerSource::Line1
    );

    det.prepare(TriggerInfo::new(2, DetectorTrigger::Internal)).await.unwrap();
    assert_eq!(
        det.driver().trigger_source.get_value().await.unwrap(),
        GigeTriggerSource::Freerun
    );
    assert_eq!(det.driver().trigger_mode.get_value().await.unwrap(), GigeTriggerMode::Off);
    assert_eq!(det.driver().num_images.get_value().await.unwrap(), 2);
}

#[tokio::test]
async fn prepare_validates_deadtime_and_trigger_kind() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    det.stage().await.unwrap();

    let err = det
        .prepare(TriggerInfo::new(1, DetectorTrigger::ConstantGate))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Deadtime must be supplied when in externally triggered mode");

    let err = det
        .prepare(TriggerInfo::new(1, DetectorTrigger::EdgeTrigger).with_deadtime(1e-6))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Detector gige1 needs at least 0.001961s deadtime, \
         but trigger logic provides only 0.000001s"
    );

    let err = det
        .prepare(TriggerInfo::new(1, DetectorTrigger::VariableGate).with_deadtime(0.01))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "GigeController only supports the following trigger types: \
         (internal, edge_trigger, constant_gate) but was asked to use variable_gate"
    );
}

#[tokio::test]
async fn read_is_always_empty_and_hints_name_the_device() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    assert!(det.read().await.unwrap().is_empty());

    det.stage().await.unwrap();
    assert!(det.read().await.unwrap().is_empty(), "frames never travel through read");
    assert_eq!(det.hints().fields, vec!["gige1".to_string()]);
}

#[tokio::test]
async fn describe_is_cached_while_staged() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    assert!(det.describe().await.unwrap().is_empty());
    assert!(det.describe_collect().await.unwrap().is_empty());

    det.stage().await.unwrap();
    assert!(det.is_staged());
    let describe = det.describe().await.unwrap();
    assert_eq!(describe.len(), 1);
    let key = &describe["gige1"];
    assert_eq!(key.source, "mock+ca://GIGE:HDF1:FullFileName_RBV");
    assert_eq!(key.shape, vec![0, 0]);
    assert_eq!(key.dtype, "array");
    assert_eq!(key.dtype_numpy.as_deref(), Some("|i1"));
    assert_eq!(key.external.as_deref(), Some("STREAM:"));
    assert_eq!(det.describe_collect().await.unwrap()["gige1"], *key);

    det.unstage().await.unwrap();
    assert!(!det.is_staged());
    assert!(det.describe().await.unwrap().is_empty());
}

#[tokio::test]
async fn stage_fails_when_the_plugin_cannot_see_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StaticPathProvider::new(dir.path()).with_filename("scan");
    let det = GigeDetector::new("gige1", "GIGE:", Arc::new(provider));
    det.connect(true).await.unwrap();

    let err = det.stage().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("File path {} for HDF plugin does not exist", dir.path().display())
    );
    assert!(!det.is_staged());
}

#[tokio::test]
async fn collect_emits_a_resource_then_datum_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    det.stage().await.unwrap();

    assert!(det.collect_asset_docs(0).await.unwrap().is_empty());

    let docs = det.collect_asset_docs(1).await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].0, "stream_resource");
    assert_eq!(docs[1].0, "stream_datum");

    let resource = serde_json::to_value(&docs[0].1).unwrap();
    assert_eq!(resource["type"], "stream_resource");
    assert_eq!(resource["data_key"], "gige1");
    assert_eq!(resource["mimetype"], "application/x-hdf5");
    assert_eq!(resource["uri"], format!("file://localhost{}/scan.h5", dir.path().display()));
    assert_eq!(resource["parameters"]["dataset"], "/entry/data/data");
    assert_eq!(resource["parameters"]["swmr"], false);
    assert_eq!(resource["parameters"]["multiplier"], 1);

    let datum = serde_json::to_value(&docs[1].1).unwrap();
    assert_eq!(datum["type"], "stream_datum");
    assert_eq!(datum["stream_resource"], resource["uid"]);
    assert_eq!(datum["seq_nums"]["start"], 0);
    assert_eq!(datum["seq_nums"]["stop"], 0);
    assert_eq!(datum["indices"]["start"], 0);
    assert_eq!(datum["indices"]["stop"], 1);

    let more = det.collect_asset_docs(3).await.unwrap();
    assert_eq!(more.len(), 1, "the resource is emitted once per staged acquisition");
    let datum = serde_json::to_value(&more[0].1).unwrap();
    assert_eq!(datum["indices"]["start"], 1);
    assert_eq!(datum["indices"]["stop"], 3);
}

#[tokio::test]
async fn trigger_acquires_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let det = mocked_detector(dir.path()).await;
    det.stage().await.unwrap();

    let num_captured = det.hdf().num_captured.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        num_captured.set_mock_value(1).unwrap();
    });
    det.trigger().await.unwrap();
    assert_eq!(det.writer().get_indices_written().await.unwrap(), 1);
}

#[test]
fn config_file_builds_a_detector() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gige.toml");
    std::fs::write(&path, "name = \"gige1\"\nprefix = \"GIGE:\"\ngpio_number = 2\n").unwrap();

    let cfg = GigeDetectorConfig::from_file(&path).unwrap();
    assert_eq!(cfg.name, "gige1");
    assert_eq!(cfg.prefix, "GIGE:");
    assert_eq!(cfg.gpio_number, 2);
    assert!(!cfg.mock, "mock defaults to false");

    let provider = StaticPathProvider::new(dir.path());
    let det = GigeDetector::from_config(&cfg, Arc::new(provider)).unwrap();
    assert_eq!(det.get_external_trigger_gpio(), 2);
}

#[test]
fn config_file_rejects_out_of_range_gpio() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gige.toml");
    std::fs::write(&path, "name = \"gige1\"\nprefix = \"GIGE:\"\ngpio_number = 7\n").unwrap();

    let err = GigeDetectorConfig::from_file(&path).unwrap_err();
    assert_eq!(
        err.to_string(),
        "GigeDetector only supports the following GPIO indices: (1, 2, 3, 4) \
         but was asked to use 7"
    );
}
