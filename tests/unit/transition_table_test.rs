// Exhaustive checks of the job lifecycle transition table.
//
// The table is small enough to verify edge by edge: every legal edge is
// listed here independently of the implementation, and every pair outside
// the list (plus the universal cancel rule) must be rejected.

use proptest::prelude::*;

use homefix::modules::jobs::models::JobStatus;

/// The lifecycle edges, spelled out independently of `allowed_next`
fn expected_edges() -> Vec<(JobStatus, JobStatus)> {
    use JobStatus::*;
    vec![
        (Submitted, AiDiagnosis),
        (AiDiagnosis, ResolvedDiy),
        (AiDiagnosis, PendingMatch),
        (PendingMatch, Matched),
        (Matched, Accepted),
        (Accepted, InProgress),
        (InProgress, Completed),
    ]
}

#[test]
fn test_every_expected_edge_is_legal() {
    for (from, to) in expected_edges() {
        assert!(
            from.can_transition(to),
            "{} -> {} should be legal",
            from,
            to
        );
        assert!(from.ensure_transition(to).is_ok());
    }
}

#[test]
fn test_cancel_is_legal_from_every_non_terminal_status() {
    for from in JobStatus::ALL {
        if from.is_terminal() {
            assert!(!from.can_transition(JobStatus::Cancelled));
        } else {
            assert!(from.can_transition(JobStatus::Cancelled));
        }
    }
}

#[test]
fn test_everything_else_is_rejected() {
    let edges = expected_edges();

    for from in JobStatus::ALL {
        for to in JobStatus::ALL {
            let in_table = edges.contains(&(from, to));
            let is_cancel = to == JobStatus::Cancelled && !from.is_terminal();

            assert_eq!(
                from.can_transition(to),
                in_table || is_cancel,
                "table disagrees on {} -> {}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_rejected_transition_reports_both_statuses() {
    let err = JobStatus::Submitted
        .ensure_transition(JobStatus::Completed)
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("submitted"));
    assert!(message.contains("completed"));
    assert_eq!(err.kind(), "invalid_transition");
}

#[test]
fn test_terminal_statuses() {
    assert!(JobStatus::ResolvedDiy.is_terminal());
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());

    for status in [
        JobStatus::Submitted,
        JobStatus::AiDiagnosis,
        JobStatus::PendingMatch,
        JobStatus::Matched,
        JobStatus::Accepted,
        JobStatus::InProgress,
    ] {
        assert!(!status.is_terminal(), "{} is not terminal", status);
    }
}

fn arbitrary_status() -> impl Strategy<Value = JobStatus> {
    prop::sample::select(JobStatus::ALL.to_vec())
}

proptest! {
    /// Any status history built from accepted transitions replays cleanly:
    /// each step is an edge of the table, and once a terminal status is
    /// reached nothing follows it
    #[test]
    fn test_random_walks_stay_inside_the_table(
        targets in prop::collection::vec(arbitrary_status(), 1..20)
    ) {
        let mut current = JobStatus::Submitted;
        let mut history = vec![current];

        for target in targets {
            if current.ensure_transition(target).is_ok() {
                current = target;
                history.push(current);
            }
        }

        // Replay: every consecutive pair must be a legal edge
        for pair in history.windows(2) {
            prop_assert!(pair[0].can_transition(pair[1]));
            prop_assert!(!pair[0].is_terminal());
        }
    }

    /// The gate is pure: probing a transition never changes the answer
    #[test]
    fn test_gate_has_no_side_effects(
        from in arbitrary_status(),
        to in arbitrary_status()
    ) {
        let first = from.can_transition(to);
        let _ = from.ensure_transition(to);
        let second = from.can_transition(to);

        prop_assert_eq!(first, second);
    }
}
