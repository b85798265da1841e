//! Execution on a real thread pool: ordering holds across threads and
//! independent systems overlap.

use std::collections::HashMap;
use std::sync::{Arc, Barrier, Mutex};
use std::time::{Duration, Instant};

use ordo_scheduler::{JobOutcome, RayonPool, Scheduler, SchedulerConfig, SystemError};

const NONE: [&str; 0] = [];

#[derive(Default)]
struct Timeline {
    spans: Mutex<HashMap<String, (Instant, Instant)>>,
}

/// A body that sleeps for `work` and records when it ran.
fn timed(
    timeline: &Arc<Timeline>,
    name: &str,
    work: Duration,
) -> impl Fn() -> Result<(), SystemError> + Send + Sync + 'static {
    let timeline = Arc::clone(timeline);
    let name = name.to_string();
    move || {
        let start = Instant::now();
        std::thread::sleep(work);
        let end = Instant::now();
        timeline.spans.lock().unwrap().insert(name.clone(), (start, end));
        Ok(())
    }
}

impl Timeline {
    fn span(&self, name: &str) -> (Instant, Instant) {
        self.spans.lock().unwrap()[name]
    }
}

fn config(threads: usize) -> SchedulerConfig {
    SchedulerConfig {
        worker_threads: threads,
        thread_name_prefix: "ordo-test".into(),
        wait_timeout_secs: Some(30),
    }
}

#[test]
fn writer_finishes_before_readers_start() {
    let timeline = Arc::new(Timeline::default());
    let mut scheduler = Scheduler::new(config(4));
    let work = Duration::from_millis(20);
    scheduler
        .add_system("Poison", ["PoisonCounter"], ["Health"], timed(&timeline, "Poison", work))
        .unwrap();
    scheduler
        .add_system("GameOver", ["Health"], ["GameState"], timed(&timeline, "GameOver", work))
        .unwrap();
    scheduler
        .add_system("HealthBar", ["Health"], ["GUI"], timed(&timeline, "HealthBar", work))
        .unwrap();
    scheduler
        .add_system("Movement", ["Input"], ["Position"], timed(&timeline, "Movement", work))
        .unwrap();

    let pool = scheduler.build_pool().unwrap();
    let report = scheduler.run(&pool).unwrap();
    assert!(report.is_success());

    let (_, poison_end) = timeline.span("Poison");
    for reader in ["GameOver", "HealthBar"] {
        let (start, _) = timeline.span(reader);
        assert!(start >= poison_end, "{reader} started before Poison finished");
    }
}

#[test]
fn independent_systems_run_concurrently() {
    // Each body waits for the other; this only completes if both run at once.
    let barrier = Arc::new(Barrier::new(2));
    let mut scheduler = Scheduler::new(config(2));
    for (name, resource) in [("Left", "A"), ("Right", "B")] {
        let barrier = Arc::clone(&barrier);
        scheduler
            .add_system(name, NONE, [resource], move || {
                barrier.wait();
                Ok(())
            })
            .unwrap();
    }

    let pool = scheduler.build_pool().unwrap();
    let report = scheduler.run(&pool).unwrap();
    assert!(report.is_success());
    assert_eq!(scheduler.metrics().peak_concurrency, 2);
    assert_eq!(scheduler.metrics().active_systems, 0);
}

#[test]
fn chain_runs_strictly_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new(config(4));
    const LINKS: &[(&str, &[&str], &[&str])] = &[
        ("First", &[], &["S1"]),
        ("Second", &["S1"], &["S2"]),
        ("Third", &["S2"], &["S3"]),
        ("Fourth", &["S3"], &[]),
    ];
    for &(name, reads, writes) in LINKS {
        let order = Arc::clone(&order);
        scheduler
            .add_system(name, reads, writes, move || {
                std::thread::sleep(Duration::from_millis(2));
                order.lock().unwrap().push(name);
                Ok(())
            })
            .unwrap();
    }

    let pool = scheduler.build_pool().unwrap();
    scheduler.run(&pool).unwrap();
    assert_eq!(
        *order.lock().unwrap(),
        vec!["First", "Second", "Third", "Fourth"]
    );
    assert_eq!(scheduler.metrics().peak_concurrency, 1);
}

#[test]
fn failure_propagates_across_threads() {
    let mut scheduler = Scheduler::new(config(3));
    scheduler
        .add_system("Source", NONE, ["Data"], || {
            Err(SystemError::Failed("disk gone".into()))
        })
        .unwrap();
    scheduler.add_system("Sink", ["Data"], ["Out"], || Ok(())).unwrap();
    scheduler.add_system("Final", ["Out"], NONE, || Ok(())).unwrap();
    scheduler.add_system("Bystander", NONE, ["Other"], || Ok(())).unwrap();

    let pool = scheduler.build_pool().unwrap();
    let report = scheduler.run(&pool).unwrap();
    assert!(matches!(report.outcome_of("Source"), Some(JobOutcome::Failed(_))));
    assert!(matches!(report.outcome_of("Sink"), Some(JobOutcome::Skipped(_))));
    assert!(matches!(report.outcome_of("Final"), Some(JobOutcome::Skipped(_))));
    assert_eq!(report.outcome_of("Bystander"), Some(&JobOutcome::Succeeded));
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.skipped().count(), 2);
}

#[test]
fn repeated_runs_on_one_pool() {
    let mut scheduler = Scheduler::new(config(2));
    scheduler.add_system("Tick", NONE, ["Clock"], || Ok(())).unwrap();
    scheduler.add_system("Render", ["Clock"], NONE, || Ok(())).unwrap();

    let pool = scheduler.build_pool().unwrap();
    let plan = scheduler.plan().unwrap();
    for _ in 0..25 {
        assert!(scheduler.execute(&plan, &pool).unwrap().is_success());
    }
    let metrics = scheduler.metrics();
    assert_eq!(metrics.runs_completed, 25);
    assert_eq!(metrics.executions["Render"], 25);
}

#[test]
fn active_count_returns_to_zero_between_runs() {
    let mut scheduler = Scheduler::new(config(4));
    let barrier = Arc::new(Barrier::new(4));
    for (name, resource) in [("A", "Ra"), ("B", "Rb"), ("C", "Rc"), ("D", "Rd")] {
        let barrier = Arc::clone(&barrier);
        scheduler
            .add_system(name, NONE, [resource], move || {
                barrier.wait();
                Ok(())
            })
            .unwrap();
    }

    let pool = scheduler.build_pool().unwrap();
    let plan = scheduler.plan().unwrap();
    for _ in 0..50 {
        assert!(scheduler.execute(&plan, &pool).unwrap().is_success());
        assert_eq!(scheduler.metrics().active_systems, 0);
    }
    assert_eq!(scheduler.metrics().peak_concurrency, 4);
}
