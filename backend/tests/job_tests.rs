//! Job numbering and workflow tests for the Print Shop Estimation Platform

use proptest::prelude::*;

use shared::models::job::{
    format_job_number, next_job_number, parse_job_number, JobStatus,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Formatting and parsing are inverses over the whole sequence range
    #[test]
    fn job_number_round_trips(
        year in 2000i32..2100,
        seq in 1u32..100_000,
    ) {
        let number = format_job_number(year, seq);
        prop_assert_eq!(parse_job_number(&number), Some((year, seq)));
    }

    /// The next number is always one past the year's maximum, whatever the
    /// order and mix of years in the existing set
    #[test]
    fn next_number_is_monotonic(
        year in 2000i32..2100,
        mut seqs in prop::collection::vec(1u32..9999, 1..20),
    ) {
        let existing: Vec<String> = seqs
            .iter()
            .map(|seq| format_job_number(year, *seq))
            .collect();

        let next = next_job_number(year, existing.iter().map(String::as_str));
        let (parsed_year, parsed_seq) = parse_job_number(&next).unwrap();

        seqs.sort_unstable();
        prop_assert_eq!(parsed_year, year);
        prop_assert_eq!(parsed_seq, seqs[seqs.len() - 1] + 1);
    }

    /// Numbers from other years never influence the sequence
    #[test]
    fn numbering_is_scoped_per_year(
        year in 2000i32..2050,
        other_seq in 1u32..9999,
    ) {
        let existing = [format_job_number(year + 1, other_seq)];
        let next = next_job_number(year, existing.iter().map(String::as_str));

        prop_assert_eq!(next, format_job_number(year, 1));
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn first_job_of_the_year() {
    let existing: [&str; 0] = [];
    assert_eq!(next_job_number(2026, existing), "JOB-2026-0001");
}

#[test]
fn malformed_numbers_are_ignored() {
    let existing = ["JOB-2026-0005", "garbage", "JOB-2026", "JOB-2026-00x1"];
    assert_eq!(
        next_job_number(2026, existing),
        "JOB-2026-0006"
    );
}

#[test]
fn workflow_moves_forward_only() {
    use JobStatus::*;

    // Happy path through the approval chain
    assert!(Calculated.can_transition_to(WaitingManager));
    assert!(WaitingManager.can_transition_to(WaitingClient));
    assert!(WaitingClient.can_transition_to(Approved));
    assert!(Approved.can_transition_to(Finished));

    // No going back, and drafts become calculated only through the engine
    assert!(!WaitingClient.can_transition_to(WaitingManager));
    assert!(!Draft.can_transition_to(Calculated));
    assert!(!Finished.can_transition_to(Draft));
}

#[test]
fn rejection_is_reachable_from_every_review_stage() {
    use JobStatus::*;

    assert!(Calculated.can_transition_to(Rejected));
    assert!(WaitingManager.can_transition_to(Rejected));
    assert!(WaitingClient.can_transition_to(Rejected));
    assert!(!Finished.can_transition_to(Rejected));
}
