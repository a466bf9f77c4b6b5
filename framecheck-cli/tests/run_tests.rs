use std::fs;
use tempfile::tempdir;

use framecheck_cli::commands::directed::{run_scenarios, Scenario};
use framecheck_cli::commands::run::{run_matrix, RunOptions, RunSummary};
use framecheck_cli::{load_timing, HeaderArgs};
use framecheck_core::sim::{Fault, SimConfig};
use framecheck_core::Timing;

#[test]
fn run_standard_matrix_passes() {
    let opts = RunOptions {
        seed: Some(7),
        ..RunOptions::default()
    };

    let summary = run_matrix(&opts).unwrap();
    assert_eq!(summary.cases.len(), 6);
    assert_eq!(summary.failed, 0);
    for case in &summary.cases {
        let counters = case.counters.unwrap();
        assert_eq!(counters.sent, 64);
        assert_eq!(counters.received, 64);
        assert_eq!(case.dut_frames, Some(64));
    }
}

#[test]
fn run_writes_json_report() {
    let td = tempdir().unwrap();
    let report_path = td.path().join("report.json");

    let opts = RunOptions {
        pause: vec!["cycle".to_string()],
        payload: vec!["random:16".to_string()],
        items: 10,
        seed: Some(3),
        report: Some(report_path.to_str().unwrap().to_string()),
        ..RunOptions::default()
    };

    framecheck_cli::run::execute(&opts).unwrap();

    let json = fs::read_to_string(&report_path).unwrap();
    let summary: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.cases[0].name, "run_test_001");
    assert_eq!(summary.cases[0].pause, "cycle");
    assert_eq!(summary.cases[0].payload, "random:16");
}

#[test]
fn run_with_fault_fails_every_case() {
    let opts = RunOptions {
        pause: vec!["none".to_string(), "random:0.5".to_string()],
        payload: vec!["counter".to_string()],
        items: 4,
        sim: SimConfig::default().with_fault(Fault::Corrupt {
            index: 1,
            offset: 0,
        }),
        ..RunOptions::default()
    };

    let summary = run_matrix(&opts).unwrap();
    assert_eq!(summary.failed, 2);
    assert!(summary
        .cases
        .iter()
        .all(|c| c.error.as_deref() == Some("1 bad frames received, see error log")));

    assert!(framecheck_cli::run::execute(&opts).is_err());
}

#[test]
fn run_rejects_unknown_option() {
    let opts = RunOptions {
        pause: vec!["sometimes".to_string()],
        ..RunOptions::default()
    };

    assert!(run_matrix(&opts).is_err());
}

#[test]
fn directed_scenarios_pass() {
    let failed = run_scenarios(
        &[Scenario::Basic, Scenario::Idles],
        HeaderArgs::default().config(),
        Timing::default(),
        SimConfig::default(),
        false,
    )
    .unwrap();

    assert_eq!(failed, 0);
}

#[test]
fn directed_scenarios_catch_drop() {
    let failed = run_scenarios(
        &[Scenario::Basic],
        HeaderArgs::default().config(),
        Timing::default(),
        SimConfig::default().with_fault(Fault::Drop { index: 0 }),
        false,
    )
    .unwrap();

    assert_eq!(failed, 1);
}

#[test]
fn timing_file_overrides_defaults() {
    let td = tempdir().unwrap();
    let path = td.path().join("timing.json");
    fs::write(&path, r#"{"inter_frame_gap": 2, "drain_cycles": 12}"#).unwrap();

    let timing = load_timing(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(timing.inter_frame_gap, 2);
    assert_eq!(timing.drain_cycles, 12);
    assert_eq!(timing.reset_cycles, Timing::default().reset_cycles);

    assert_eq!(load_timing(None).unwrap(), Timing::default());
    assert!(load_timing(Some("/nonexistent/timing.json")).is_err());
}

#[test]
fn run_bad_pause_probability_fails_only_that_case() {
    let opts = RunOptions {
        pause: vec!["random:2".to_string(), "none".to_string()],
        payload: vec!["counter".to_string()],
        items: 4,
        ..RunOptions::default()
    };

    let summary = run_matrix(&opts).unwrap();
    assert_eq!(summary.failed, 1);
    assert!(summary.cases[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("pause probability")));
    assert!(summary.cases[1].passed);
    assert_eq!(summary.cases[1].dut_frames, Some(4));
}

#[test]
fn run_on_narrow_bus_passes() {
    for width in [1, 2] {
        let opts = RunOptions {
            payload: vec!["random:4".to_string()],
            items: 12,
            seed: Some(11),
            sim: SimConfig {
                width,
                ..SimConfig::default()
            },
            ..RunOptions::default()
        };

        let summary = run_matrix(&opts).unwrap();
        assert_eq!(summary.failed, 0, "width {width}: {:?}", summary.cases);
    }
}
