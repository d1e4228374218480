//! Behavioural tests for zero-run purge planning (no database required)

use tessutils::purge::{plan_device, DevicePlan, PurgePlanner, WindowSize};
use tessutils::source::{MemorySource, ReadingSource};
use tessutils::{PurgeError, Reading};

fn readings(device_id: i64, freqs: &[f64]) -> Vec<Reading> {
    freqs
        .iter()
        .enumerate()
        .map(|(i, f)| Reading {
            date_id: 20200101 + (i as i64 / 1440),
            time_id: ((i as i64 % 1440) / 60) * 10000 + (i as i64 % 60) * 100,
            device_id,
            sequence_number: i as i64,
            frequency: *f,
            magnitude: Some(if *f == 0.0 { 0.0 } else { 20.0 }),
        })
        .collect()
}

fn plan(freqs: &[f64], window: usize) -> DevicePlan {
    let stream = readings(1, freqs).into_iter().map(Ok);
    plan_device("stars1", stream, WindowSize::new(window).unwrap()).unwrap()
}

fn deleted(plan: &DevicePlan) -> Vec<i64> {
    plan.deletions.iter().map(|d| d.sequence_number).collect()
}

fn padded(left: usize, zeros: usize, right: usize) -> Vec<f64> {
    let mut freqs = vec![10.0; left];
    freqs.extend(std::iter::repeat(0.0).take(zeros));
    freqs.extend(vec![10.0; right]);
    freqs
}

#[test]
fn test_nonzero_stream_has_no_deletions() {
    let freqs: Vec<f64> = (1..200).map(|i| i as f64 * 0.5).collect();
    assert!(plan(&freqs, 7).deletions.is_empty());
}

#[test]
fn test_short_streams_have_no_deletions() {
    for len in 0..7 {
        let p = plan(&vec![0.0; len], 7);
        assert!(p.deletions.is_empty(), "len {len}");
        assert_eq!(p.evaluated, 0);
    }
}

#[test]
fn test_exact_window_run_deletes_only_its_center() {
    for window in [3, 5, 7, 9] {
        let half = window / 2;
        let p = plan(&padded(half, window, half), window);
        assert_eq!(deleted(&p), vec![(half + half) as i64], "window {window}");
    }
}

#[test]
fn test_isolated_zero_survives() {
    let p = plan(&padded(10, 1, 10), 7);
    assert!(p.deletions.is_empty());
}

#[test]
fn test_run_shorter_than_window_survives() {
    let p = plan(&padded(10, 6, 10), 7);
    assert!(p.deletions.is_empty());
}

#[test]
fn test_long_run_deletes_one_per_center_position() {
    for run in 7..20 {
        let p = plan(&padded(5, run, 5), 7);
        assert_eq!(p.deletions.len(), run - 7 + 1, "run {run}");
        // Deleted readings are the run minus three on each side.
        let expected: Vec<i64> = (5 + 3..5 + run - 3).map(|i| i as i64).collect();
        assert_eq!(deleted(&p), expected);
    }
}

#[test]
fn test_d1_scenario() {
    let freqs = [5., 5., 5., 0., 0., 0., 0., 0., 0., 0., 5., 5., 5.];
    let p = plan(&freqs, 7);
    // Seven zeros at positions 3..=9: one all-zero window, centered on 6.
    assert_eq!(p.evaluated, 7);
    assert_eq!(deleted(&p), vec![6]);
}

#[test]
fn test_d2_scenario() {
    let p = plan(&[5., 0., 5., 5., 5., 5., 5.], 7);
    assert_eq!(p.evaluated, 1);
    assert!(p.deletions.is_empty());
}

#[test]
fn test_deletions_carry_diagnostics() {
    let p = plan(&padded(3, 7, 3), 7);
    let deletion = &p.deletions[0];
    assert_eq!(deletion.key.device_id, 1);
    assert_eq!(deletion.key.date_id, 20200101);
    assert_eq!(deletion.key.time_id, 600);
    assert_eq!(deletion.frequency, 0.0);
    assert_eq!(deletion.magnitude, Some(0.0));
}

#[test]
fn test_devices_never_share_a_window() {
    // A trails off with zeros and B starts with zeros: together they would
    // form a run of seven, but each stream alone is too short a run.
    let source = MemorySource::new()
        .with_device("a", readings(1, &padded(10, 3, 0)))
        .with_device("b", readings(2, &padded(0, 4, 10)));
    let devices = source.devices().unwrap();

    let run = PurgePlanner::new(WindowSize::DEFAULT)
        .run(&source, &devices)
        .unwrap();
    assert!(run.failures.is_empty());
    assert!(run.plan.is_empty());
}

#[test]
fn test_device_order_is_sorted_and_deduplicated() {
    let source = MemorySource::new()
        .with_device("b", readings(2, &[0.0; 8]))
        .with_device("a", readings(1, &[0.0; 7]));
    let requested = vec!["b".to_string(), "a".to_string(), "b".to_string()];

    let run = PurgePlanner::new(WindowSize::DEFAULT)
        .run(&source, &requested)
        .unwrap();
    let order: Vec<&str> = run.plan.devices.iter().map(|d| d.device.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
    assert_eq!(run.plan.len(), 3);
}

#[test]
fn test_unknown_device_is_empty_plan() {
    let source = MemorySource::new();
    let run = PurgePlanner::new(WindowSize::DEFAULT)
        .run(&source, &["ghost".to_string()])
        .unwrap();
    assert_eq!(run.plan.devices.len(), 1);
    assert_eq!(run.plan.devices[0].readings_seen, 0);
}

#[test]
fn test_bad_device_does_not_abort_others() {
    let mut unsorted = readings(2, &[0.0; 10]);
    unsorted.swap(2, 5);
    let source = MemorySource::new()
        .with_device("good", readings(1, &[0.0; 9]))
        .with_device("bad", unsorted);
    let devices = source.devices().unwrap();

    let run = PurgePlanner::new(WindowSize::DEFAULT)
        .run(&source, &devices)
        .unwrap();
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].device, "bad");
    assert!(matches!(run.failures[0].error, PurgeError::OutOfOrder { .. }));
    assert_eq!(run.plan.devices.len(), 1);
    assert_eq!(run.plan.len(), 3);
}

#[test]
fn test_parallel_matches_sequential() {
    let mut source = MemorySource::new();
    for d in 0..12 {
        let freqs: Vec<f64> = (0..300)
            .map(|i| if (i / (d + 5)) % 3 == 0 { 0.0 } else { 1.0 + i as f64 })
            .collect();
        source.insert(format!("stars{d}"), readings(d as i64, &freqs));
    }
    let devices = source.devices().unwrap();
    let planner = PurgePlanner::new(WindowSize::DEFAULT);

    let sequential = planner.run(&source, &devices).unwrap();
    let parallel = planner
        .with_jobs(4)
        .run_parallel(|| Ok(source.clone()), &devices)
        .unwrap();

    assert!(!sequential.plan.is_empty());
    assert_eq!(sequential.plan, parallel.plan);
}

#[test]
fn test_parallel_reuses_sources_across_devices() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let mut source = MemorySource::new();
    for d in 0..16 {
        source.insert(format!("stars{d:02}"), readings(d as i64, &[0.0; 9]));
    }
    let devices = source.devices().unwrap();
    let opens = AtomicUsize::new(0);
    let run = PurgePlanner::new(WindowSize::DEFAULT)
        .with_jobs(2)
        .run_parallel(
            || {
                opens.fetch_add(1, Ordering::SeqCst);
                Ok(source.clone())
            },
            &devices,
        )
        .unwrap();

    assert_eq!(run.plan.len(), 16 * 3);
    let opens = opens.load(Ordering::SeqCst);
    assert!(opens >= 1 && opens <= devices.len(), "{opens} opens");
}

#[test]
fn test_parallel_open_failure_aborts_run() {
    let devices = vec!["stars1".to_string(), "stars2".to_string()];
    let result = PurgePlanner::new(WindowSize::DEFAULT)
        .with_jobs(2)
        .run_parallel(
            || Err::<MemorySource, _>(PurgeError::InvalidConfig("unreachable".to_string())),
            &devices,
        );
    let err = result.unwrap_err();
    assert!(!err.is_per_device());
    assert!(err.to_string().contains("cannot open reading source"));
}

#[test]
fn test_rerun_is_identical() {
    let freqs = padded(4, 12, 4);
    assert_eq!(plan(&freqs, 7), plan(&freqs, 7));
}
