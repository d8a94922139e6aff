// tests/classifier_property.rs

use proptest::prelude::*;

use encarun::outcome::{ExitReport, TaskOutcome, classify, decide_outcome};

fn exit_code_strategy() -> impl Strategy<Value = Option<i32>> {
    prop_oneof![
        4 => (-2..8i32).prop_map(Some),
        2 => any::<i32>().prop_map(Some),
        1 => Just(None),
    ]
}

proptest! {
    #[test]
    fn classification_is_total_and_deterministic(
        code in exit_code_strategy(),
        warnings in proptest::collection::vec("[a-z ]{0,12}", 0..3),
        errors in proptest::collection::vec("[a-z ]{0,12}", 0..3),
        cancelled in any::<bool>(),
    ) {
        let report = ExitReport { exit_code: code, warnings, errors, log_file: None };

        let first = classify(None, report.clone(), cancelled);
        let second = classify(None, report, cancelled);

        prop_assert!(TaskOutcome::ALL.contains(&first.outcome()));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn cancellation_always_classifies_as_cancelled(
        code in exit_code_strategy(),
        has_warnings in any::<bool>(),
        has_errors in any::<bool>(),
    ) {
        prop_assert_eq!(
            decide_outcome(code, has_warnings, has_errors, true),
            TaskOutcome::Cancelled
        );
    }

    #[test]
    fn codes_outside_the_contract_are_unsupported(
        code in any::<i32>().prop_filter("outside contract", |c| !(0..=5).contains(c)),
        has_warnings in any::<bool>(),
        has_errors in any::<bool>(),
    ) {
        prop_assert_eq!(
            decide_outcome(Some(code), has_warnings, has_errors, false),
            TaskOutcome::UnsupportedExitCode
        );
    }

    #[test]
    fn success_never_comes_with_error_lines(
        code in exit_code_strategy(),
        has_warnings in any::<bool>(),
    ) {
        prop_assert_ne!(
            decide_outcome(code, has_warnings, true, false),
            TaskOutcome::Success
        );
    }
}
