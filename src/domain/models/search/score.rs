//! Score interpretation for raw oracle output.
//!
//! The oracle reports results as free text scraped from an external system,
//! typically `"23/30"`, sometimes with surrounding noise, sometimes garbage.
//! The interpreter extracts a validated integer score or refuses: anything
//! without digits, negative, or above the slot count is rejected so bogus
//! readings never reach the confidence model.

use thiserror::Error;

/// Errors produced while interpreting raw oracle output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No digits found in oracle output {0:?}")]
    NoDigits(String),

    #[error("Oracle reported a negative score: {0}")]
    Negative(i64),

    #[error("Oracle score {score} exceeds the maximum of {max}")]
    OutOfRange { score: u32, max: u32 },
}

/// Parses and validates raw oracle output into an integer score.
///
/// Side-effect-free and deterministic: the same input always yields the
/// same result.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInterpreter {
    max_score: u32,
}

impl ScoreInterpreter {
    /// Create an interpreter that accepts scores in `[0, max_score]`.
    pub fn new(max_score: u32) -> Self {
        Self { max_score }
    }

    /// The highest score this interpreter accepts.
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    /// Interpret raw oracle output.
    ///
    /// The primary format is `"<score>/<total>"` (whitespace around the
    /// slash tolerated). When no slash-delimited pair is present, the first
    /// integer substring is used instead.
    pub fn interpret(&self, raw: &str) -> Result<u32, ParseError> {
        let candidate = slash_numerator(raw).or_else(|| first_integer(raw));

        match candidate {
            Some(value) if value < 0 => Err(ParseError::Negative(value)),
            Some(value) => {
                let score = u32::try_from(value).map_err(|_| ParseError::Negative(value))?;
                if score > self.max_score {
                    Err(ParseError::OutOfRange {
                        score,
                        max: self.max_score,
                    })
                } else {
                    Ok(score)
                }
            }
            None => Err(ParseError::NoDigits(truncate_for_error(raw))),
        }
    }
}

/// Extract the numerator of the first `"<int>/<int>"` pattern, if any.
fn slash_numerator(raw: &str) -> Option<i64> {
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'/' {
            continue;
        }
        // Walk left over whitespace, then digits.
        let mut end = i;
        while end > 0 && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        let mut start = end;
        while start > 0 && bytes[start - 1].is_ascii_digit() {
            start -= 1;
        }
        if start == end {
            continue;
        }
        // Walk right over whitespace and require a denominator digit.
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || !bytes[j].is_ascii_digit() {
            continue;
        }
        let negative = start > 0 && bytes[start - 1] == b'-';
        let digits: i64 = raw[start..end].parse().ok()?;
        return Some(if negative { -digits } else { digits });
    }
    None
}

/// Extract the first contiguous integer substring, honoring a leading minus.
fn first_integer(raw: &str) -> Option<i64> {
    let bytes = raw.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let negative = start > 0 && bytes[start - 1] == b'-';
    let digits: i64 = raw[start..end].parse().ok()?;
    Some(if negative { -digits } else { digits })
}

fn truncate_for_error(raw: &str) -> String {
    const LIMIT: usize = 64;
    if raw.len() <= LIMIT {
        raw.to_string()
    } else {
        let cut = raw
            .char_indices()
            .take_while(|(i, _)| *i < LIMIT)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", &raw[..cut])
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_format() {
        let interp = ScoreInterpreter::new(30);
        assert_eq!(interp.interpret("23/30"), Ok(23));
        assert_eq!(interp.interpret("0/30"), Ok(0));
        assert_eq!(interp.interpret("30/30"), Ok(30));
    }

    #[test]
    fn test_slash_format_with_noise() {
        let interp = ScoreInterpreter::new(30);
        assert_eq!(interp.interpret("Score 23/30 points"), Ok(23));
        assert_eq!(interp.interpret("result: 7 / 30"), Ok(7));
    }

    #[test]
    fn test_fallback_first_integer() {
        let interp = ScoreInterpreter::new(30);
        assert_eq!(interp.interpret("you scored 18 this time"), Ok(18));
        assert_eq!(interp.interpret("5"), Ok(5));
    }

    #[test]
    fn test_rejects_no_digits() {
        let interp = ScoreInterpreter::new(30);
        assert!(matches!(
            interp.interpret("oops"),
            Err(ParseError::NoDigits(_))
        ));
        assert!(matches!(interp.interpret(""), Err(ParseError::NoDigits(_))));
    }

    #[test]
    fn test_rejects_negative() {
        let interp = ScoreInterpreter::new(30);
        assert_eq!(interp.interpret("-4"), Err(ParseError::Negative(-4)));
        assert_eq!(interp.interpret("-2/30"), Err(ParseError::Negative(-2)));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let interp = ScoreInterpreter::new(30);
        assert_eq!(
            interp.interpret("99/30"),
            Err(ParseError::OutOfRange { score: 99, max: 30 })
        );
        assert_eq!(
            interp.interpret("31"),
            Err(ParseError::OutOfRange { score: 31, max: 30 })
        );
    }

    #[test]
    fn test_slash_preferred_over_first_integer() {
        // "Run 3" appears before the score pattern; the slash pair wins.
        let interp = ScoreInterpreter::new(30);
        assert_eq!(interp.interpret("Run 3 finished: 12/30"), Ok(12));
    }

    #[test]
    fn test_bare_slash_falls_back() {
        let interp = ScoreInterpreter::new(30);
        // No digits adjacent to the slash; fallback picks the first integer.
        assert_eq!(interp.interpret("n/a score 9"), Ok(9));
    }

    #[test]
    fn test_deterministic() {
        let interp = ScoreInterpreter::new(10);
        for _ in 0..3 {
            assert_eq!(interp.interpret("4/10"), Ok(4));
        }
    }
}
