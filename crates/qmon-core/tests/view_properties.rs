//! Property-based tests for the view projections.

use proptest::prelude::*;
use qmon_core::view::{
    distinct_backends, distinct_programs, filter, pending_counts_by_backend,
    top_backends_by_queue_depth,
};
use qmon_core::{BackendStatus, FilterCriteria, Job, JobStatus};

const BACKENDS: [&str; 4] = ["ibm_brisbane", "ibm_kyoto", "ibm_fez", "ibm_torino"];
const PROGRAMS: [&str; 3] = ["sampler", "estimator", "circuit-runner"];

fn arb_status() -> impl Strategy<Value = JobStatus> {
    prop_oneof![
        Just(JobStatus::Queued),
        Just(JobStatus::Running),
        Just(JobStatus::Completed),
        Just(JobStatus::Cancelled),
        Just(JobStatus::Failed),
        Just(JobStatus::Unknown),
    ]
}

fn arb_job() -> impl Strategy<Value = Job> {
    (
        "[a-z0-9]{4,10}",
        prop::sample::select(BACKENDS.to_vec()),
        arb_status(),
        prop::option::of(prop::sample::select(PROGRAMS.to_vec())),
    )
        .prop_map(|(id, backend, status, program)| {
            let job = Job::new(id, backend, status);
            match program {
                Some(p) => job.with_program(p),
                None => job,
            }
        })
}

fn arb_jobs() -> impl Strategy<Value = Vec<Job>> {
    prop::collection::vec(arb_job(), 0..30)
}

fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
    let backend = prop_oneof![
        Just("all".to_string()),
        prop::sample::select(BACKENDS.to_vec()).prop_map(str::to_string),
    ];
    let program = prop_oneof![
        Just("all".to_string()),
        prop::sample::select(PROGRAMS.to_vec()).prop_map(str::to_string),
    ];
    ("[a-zA-Z_ ]{0,4}", backend, program).prop_map(|(text, backend, program)| FilterCriteria {
        text,
        backend,
        program,
    })
}

fn arb_backends() -> impl Strategy<Value = Vec<BackendStatus>> {
    prop::collection::vec(
        (
            "[a-z_]{3,8}",
            prop::option::of(0_u64..500),
            prop::option::of(any::<bool>()),
        )
            .prop_map(|(name, pending_jobs, operational)| BackendStatus {
                name,
                pending_jobs,
                operational,
            }),
        0..40,
    )
}

fn assert_all_first_and_unique(values: &[String]) {
    assert_eq!(values.first().map(String::as_str), Some("all"));
    let mut seen = std::collections::HashSet::new();
    for v in values {
        assert!(seen.insert(v), "duplicate entry {v}");
    }
}

proptest! {
    #[test]
    fn filter_is_idempotent(jobs in arb_jobs(), criteria in arb_criteria()) {
        let once = filter(&jobs, &criteria);
        let twice = filter(&once, &criteria);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn empty_criteria_is_identity(jobs in arb_jobs()) {
        prop_assert_eq!(filter(&jobs, &FilterCriteria::default()), jobs);
    }

    #[test]
    fn filter_only_removes(jobs in arb_jobs(), criteria in arb_criteria()) {
        let filtered = filter(&jobs, &criteria);
        prop_assert!(filtered.len() <= jobs.len());
        prop_assert!(filtered.iter().all(|j| jobs.contains(j)));
    }

    #[test]
    fn option_lists_start_with_all_and_have_no_duplicates(
        pending in arb_jobs(),
        other in arb_jobs(),
        backends in arb_backends(),
    ) {
        assert_all_first_and_unique(&distinct_backends(&pending, &other, &backends));
        assert_all_first_and_unique(&distinct_programs(&pending, &other));
    }

    #[test]
    fn pending_counts_sum_to_len(pending in arb_jobs()) {
        let total: usize = pending_counts_by_backend(&pending).values().sum();
        prop_assert_eq!(total, pending.len());
    }

    #[test]
    fn chart_is_bounded_and_non_increasing(backends in arb_backends(), limit in 0_usize..20) {
        let chart = top_backends_by_queue_depth(&backends, limit);
        prop_assert!(chart.len() <= limit);
        prop_assert!(chart.windows(2).all(|w| w[0].count >= w[1].count));
    }
}

#[test]
fn scenario_text_filter_selects_kyoto_job() {
    let jobs = vec![
        Job::new("j1", "ibm_brisbane", JobStatus::Running),
        Job::new("j2", "ibm_kyoto", JobStatus::Queued),
    ];
    let criteria = FilterCriteria::default().with_text("kyoto");
    let filtered = filter(&jobs, &criteria);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id.as_str(), "j2");
}
