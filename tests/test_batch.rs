mod common;
use common::{ab_epochs, comments, MemoryStore};
use evoked::{
    BatchRunner, ConditionSpec, Contrast, EvokedError, JobState, PipelineConfig, Unit,
};

fn config(n_subjects: usize, n_jobs: usize) -> PipelineConfig {
    PipelineConfig {
        subjects: (1..=n_subjects).map(|s| format!("{s:02}")).collect(),
        conditions: ConditionSpec::Labels(vec!["A".into(), "B".into()]),
        contrasts: vec![Contrast::new("A", "B")],
        n_jobs,
        ..PipelineConfig::default()
    }
}

#[test]
fn one_failing_unit_does_not_stop_the_others() {
    let cfg = config(6, 3);
    let units = cfg.units();
    let mut store = MemoryStore::with_units(&units, &ab_epochs());
    let broken = units[3].clone();
    store.fail_load.insert(broken.clone());

    let report = BatchRunner::new(&cfg, &store, &store).run().unwrap();

    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(report.n_ok(), 5);
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].unit, broken);
    assert_eq!(failed[0].failed_in, Some(JobState::Loading));
    assert!(matches!(failed[0].result, Err(EvokedError::Load { .. })));

    for u in units.iter().filter(|u| **u != broken) {
        let out = store.written(u).expect("unit should have been written");
        assert_eq!(comments(&out), vec!["A", "B", "A - B"]);
    }
    assert!(store.written(&broken).is_none());
}

#[test]
fn panicking_unit_is_isolated() {
    let cfg = config(3, 2);
    let units = cfg.units();
    let mut store = MemoryStore::with_units(&units, &ab_epochs());
    store.panic_load.insert(units[0].clone());

    let report = BatchRunner::new(&cfg, &store, &store).run().unwrap();

    assert_eq!(report.n_ok(), 2);
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed[0].unit, units[0]);
    assert!(matches!(&failed[0].result, Err(EvokedError::Panicked(msg)) if msg.contains("corrupt buffer")));
    assert_eq!(store.n_written(), 2);
}

#[test]
fn every_unit_failing_still_completes_the_batch() {
    let cfg = config(4, 2);
    let store = MemoryStore::default();

    let report = BatchRunner::new(&cfg, &store, &store).run().unwrap();
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.n_ok(), 0);
    assert!(!report.all_ok());
}

#[test]
fn sessions_are_processed_per_subject() {
    let cfg = PipelineConfig { sessions: vec!["a".into(), "b".into()], ..config(2, 0) };
    let units = cfg.units();
    let store = MemoryStore::with_units(&units, &ab_epochs());

    let report = BatchRunner::new(&cfg, &store, &store).run().unwrap();
    assert!(report.all_ok());
    assert_eq!(store.n_written(), 4);
    assert!(store.written(&Unit::new("02", Some("b"))).is_some());
}

#[test]
fn invalid_contrast_fails_before_any_unit_runs() {
    let cfg = PipelineConfig {
        contrasts: vec![Contrast::new("A", "missing")],
        ..config(2, 1)
    };
    let store = MemoryStore::with_units(&cfg.units(), &ab_epochs());

    let err = BatchRunner::new(&cfg, &store, &store).run().unwrap_err();
    assert!(matches!(err, EvokedError::Config(_)));
    assert_eq!(store.n_written(), 0);
}
