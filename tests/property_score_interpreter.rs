//! Property tests for the score interpreter: whatever the oracle emits,
//! the result is either a score inside `[0, N]` or a parse error - never
//! a value outside that range.

use assay::domain::models::ScoreInterpreter;
use proptest::prelude::*;

proptest! {
    #[test]
    fn interpret_never_exceeds_range(raw in "\\PC*", max in 0u32..=100) {
        let interpreter = ScoreInterpreter::new(max);
        if let Ok(score) = interpreter.interpret(&raw) {
            prop_assert!(score <= max);
        }
    }

    #[test]
    fn slash_format_parses_numerator(score in 0u32..=30, total in 1u32..=99) {
        let interpreter = ScoreInterpreter::new(30);
        let raw = format!("{score}/{total}");
        prop_assert_eq!(interpreter.interpret(&raw), Ok(score));
    }

    #[test]
    fn noisy_prefix_and_suffix_do_not_break_slash_parse(
        score in 0u32..=30,
        prefix in "[a-zA-Z :]{0,12}",
        suffix in "[a-zA-Z :]{0,12}",
    ) {
        let interpreter = ScoreInterpreter::new(30);
        let raw = format!("{prefix}{score}/30{suffix}");
        prop_assert_eq!(interpreter.interpret(&raw), Ok(score));
    }

    #[test]
    fn digit_free_input_is_always_rejected(raw in "[^0-9]*") {
        let interpreter = ScoreInterpreter::new(30);
        prop_assert!(interpreter.interpret(&raw).is_err());
    }

    #[test]
    fn interpretation_is_deterministic(raw in "\\PC*") {
        let interpreter = ScoreInterpreter::new(30);
        prop_assert_eq!(interpreter.interpret(&raw), interpreter.interpret(&raw));
    }
}
