//! The scheduler never runs more than `parallelism` jobs at once and always
//! reports every job exactly once.
//!
//! Case counts follow `PROPTEST_CASES` (default 12, capped at 24).

mod support;

use std::sync::Arc;
use std::time::Duration;

use boidfactory_engine::{Console, JobScheduler};
use proptest::prelude::*;
use support::{FakeGenerator, pipeline, utf8_dir};

fn config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(12)
        .min(24);
    ProptestConfig::with_cases(cases)
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn in_flight_jobs_never_exceed_parallelism(times in 1u32..=8, parallelism in 1u32..=4) {
        let temp = tempfile::tempdir().unwrap();
        let out = utf8_dir(&temp);
        let generator = Arc::new(FakeGenerator::new(Duration::from_millis(5)));
        let scheduler = JobScheduler::new(generator.clone()).with_console(Console::Silent);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let summary = runtime
            .block_on(scheduler.run(pipeline(&out, &["m"], times, parallelism)))
            .unwrap();

        prop_assert!(generator.peak() <= parallelism.min(times) as usize);
        let indices: Vec<u32> = summary.jobs.iter().map(|j| j.index).collect();
        prop_assert_eq!(indices, (1..=times).collect::<Vec<_>>());
        prop_assert_eq!(summary.completed(), times as usize);
    }
}
