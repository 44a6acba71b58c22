//! This module implements the built-in answer checker, used when a problem does not provide its
//! own checker.
//!

use std::path::Path;

use crate::Result;

/// Represent the result of a checker.
pub struct CheckerResult {
    /// Can the output of the solution be accepted?
    pub accepted: bool,

    /// Comment by the checker.
    pub comment: String,
}

impl CheckerResult {
    /// Create a new `CheckerResult` instance representing an accepted result.
    fn accepted(comment: String) -> CheckerResult {
        CheckerResult {
            accepted: true,
            comment
        }
    }

    /// Create a new `CheckerResult` instance representing a rejected result.
    fn rejected(comment: String) -> CheckerResult {
        CheckerResult {
            accepted: false,
            comment
        }
    }
}

/// Compare the output of a solution with the answer token by token. Tokens are separated by any
/// amount of whitespace.
pub fn check_tokens(output: &Path, answer: &Path) -> Result<CheckerResult> {
    let output = std::fs::read(output)?;
    let answer = std::fs::read(answer)?;
    let output = String::from_utf8_lossy(&output);
    let answer = String::from_utf8_lossy(&answer);

    let mut output_tokens = output.split_whitespace();
    let mut token_counter = 0;

    for expected_token in answer.split_whitespace() {
        let user_token = match output_tokens.next() {
            Some(t) => t,
            None => return Ok(CheckerResult::rejected(
                format!("expect \"{}\", but found EOF", expected_token)))
        };
        if expected_token != user_token {
            return Ok(CheckerResult::rejected(
                format!("expect \"{}\", but found \"{}\"", expected_token, user_token)));
        }

        token_counter += 1;
    }

    // Check if we can hit EOF on the output of the solution.
    if let Some(user_token) = output_tokens.next() {
        return Ok(CheckerResult::rejected(format!("expect EOF, but found \"{}\"", user_token)));
    }

    Ok(CheckerResult::accepted(format!("OK: {} tokens.", token_counter)))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn check(output: &str, answer: &str) -> CheckerResult {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("output"), output).unwrap();
        std::fs::write(dir.path().join("answer"), answer).unwrap();
        check_tokens(&dir.path().join("output"), &dir.path().join("answer")).unwrap()
    }

    #[test]
    fn test_accepts_whitespace_differences() {
        let result = check("1  2\n3", "1 2 3\n");
        assert!(result.accepted);
        assert_eq!("OK: 3 tokens.", result.comment);
    }

    #[test]
    fn test_rejects_mismatch() {
        let result = check("1 3", "1 2");
        assert!(!result.accepted);
        assert_eq!("expect \"2\", but found \"3\"", result.comment);
    }

    #[test]
    fn test_rejects_length_mismatch() {
        assert!(!check("1", "1 2").accepted);
        assert_eq!("expect EOF, but found \"2\"", check("1 2", "1").comment);
    }
}
