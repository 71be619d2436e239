//! Late-penalty formulas
//!
//! Instructors write a small formula over `score` and `overtime`, e.g.
//!
//! ```text
//! if overtime > 0: score = score - overtime * 5
//! ```
//!
//! or, with a block per branch,
//!
//! ```text
//! if overtime > 3:
//!     score = 0
//! else:
//!     score -= overtime * 5
//!     score *= 0.9
//! ```
//!
//! [`validate`] runs when a formula is stored and [`evaluate`] when a
//! submission is graded. Formulas are parsed into a closed AST and run
//! by a tree-walking interpreter whose only state is the two bound
//! variables.

pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;

use std::str::FromStr;

pub use error::{EvaluationError, FormulaError};
pub use interpreter::Env;
pub use parser::Program;

use interpreter::run;
use lexer::check_vocabulary;
use parser::Parser;

/// Check a formula before it is persisted.
///
/// An empty formula is valid and applies no penalty.
pub fn validate(formula: &str) -> Result<(), FormulaError> {
    PenaltyFormula::parse(formula).map(|_| ())
}

/// Apply a stored formula to a raw score.
///
/// Pure and deterministic. Fails only when `formula` would not have
/// passed [`validate`] or the inputs are not finite; every validated
/// formula maps finite inputs to a finite score.
pub fn evaluate(formula: &str, score: f64, overtime: f64) -> Result<f64, EvaluationError> {
    let result = PenaltyFormula::parse(formula)
        .map_err(EvaluationError::from)
        .and_then(|f| f.apply(score, overtime));

    if let Err(e) = &result {
        tracing::error!(formula = %formula, score, overtime, error = %e, "Penalty evaluation failed");
    }

    result
}

/// A validated formula, parsed once and applied many times
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyFormula {
    source: String,
    program: Program,
}

impl PenaltyFormula {
    /// Vocabulary check, parse, then a trial run with both variables at zero
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        check_vocabulary(source)?;
        let program = Parser::parse(source)?;

        run(&program, Env::new(0.0, 0.0))
            .map_err(|e| FormulaError::semantic(1, 1, format!("trial evaluation failed: {}", e)))?;

        Ok(Self {
            source: source.to_string(),
            program,
        })
    }

    /// Formula that leaves every score unchanged
    pub fn none() -> Self {
        Self {
            source: String::new(),
            program: Program::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.program.statements.is_empty()
    }

    pub fn apply(&self, score: f64, overtime: f64) -> Result<f64, EvaluationError> {
        run(&self.program, Env::new(score, overtime))
    }
}

impl FromStr for PenaltyFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_deduction_per_unit() {
        assert_eq!(evaluate("if overtime>0:score=score-overtime*5", 80.0, 3.0), Ok(65.0));
        assert_eq!(evaluate("if overtime>0:score=score-overtime*5", 80.0, 0.0), Ok(80.0));
    }

    #[test]
    fn test_empty_formula_is_identity() {
        assert!(validate("").is_ok());
        for overtime in [0.0, 1.0, 12.5, -3.0] {
            assert_eq!(evaluate("", 73.0, overtime), Ok(73.0));
            assert_eq!(evaluate("   \n", 73.0, overtime), Ok(73.0));
        }
        assert!(PenaltyFormula::none().is_empty());
    }

    #[test]
    fn test_foreign_word_is_illegal() {
        assert_eq!(
            validate("score = os"),
            Err(FormulaError::IllegalToken("os".to_string()))
        );
        assert!(matches!(
            validate("import os"),
            Err(FormulaError::IllegalToken(_))
        ));
    }

    #[test]
    fn test_characters_outside_charset_are_illegal() {
        for formula in ["score = 1; score = 2", "score = 'a'", "score = [1]", "# note", "score = 1e3"] {
            assert!(
                matches!(validate(formula), Err(FormulaError::IllegalToken(_))),
                "{formula:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_well_formed_vocabulary_but_bad_structure() {
        for formula in ["score", "if", "score = score /", "else: score = 0", "score = score / overtime", "score = score / 0"] {
            assert!(
                matches!(validate(formula), Err(FormulaError::SemanticError { .. })),
                "{formula:?} should be a semantic error"
            );
        }
    }

    #[test]
    fn test_accepted_formulas_evaluate_everywhere() {
        let formulas = [
            "score = score * 0.9",
            "if overtime > 7: score = 0\nelse: score = score - overtime * (100 / 7)",
            "if score >= 60:\n    score = 60",
            "overtime = overtime * 24\nscore = score - overtime",
        ];
        for formula in formulas {
            let parsed: PenaltyFormula = formula.parse().unwrap();
            for score in [0.0, 55.5, 100.0, -10.0] {
                for overtime in [0.0, 0.5, 3.0, 1000.0, -2.0] {
                    assert!(
                        parsed.apply(score, overtime).is_ok_and(|v| v.is_finite()),
                        "{formula:?} at ({score}, {overtime})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_indented_lines_stay_in_their_branch() {
        let formula = "if overtime > 0:\n    score = score - 10\n    score = score * 0.5";
        assert!(validate(formula).is_ok());
        assert_eq!(evaluate(formula, 80.0, 0.0), Ok(80.0));
        assert_eq!(evaluate(formula, 80.0, 1.0), Ok(35.0));

        // an inline branch cannot be continued on an indented line
        assert!(matches!(
            validate("if overtime > 0: score = score - 10\n    score = score * 0.5"),
            Err(FormulaError::SemanticError { line: 2, .. })
        ));
    }

    #[test]
    fn test_augmented_and_parenthesised_forms() {
        assert_eq!(evaluate("if overtime>0:score-=overtime*5", 80.0, 3.0), Ok(65.0));
        assert_eq!(evaluate("score*=0.9", 80.0, 0.0), Ok(72.0));
        assert_eq!(evaluate("if (overtime > 0): score = score - 5", 80.0, 1.0), Ok(75.0));
        assert_eq!(evaluate("if (overtime > 0): score = score - 5", 80.0, 0.0), Ok(80.0));
        assert!(matches!(
            validate("score /= overtime"),
            Err(FormulaError::SemanticError { .. })
        ));
        assert!(matches!(
            validate("score = score ** 2"),
            Err(FormulaError::SemanticError { .. })
        ));
    }

    #[test]
    fn test_validated_formulas_are_total() {
        let formulas = [
            "score = score * 10",
            "score = score * score * score",
            "score -= overtime * 1000000\nscore = score * score",
            "if overtime > 0:\n    score = score / 0.001\nelse:\n    score = -score * 1000",
            "overtime = overtime * overtime\nscore = score + overtime - overtime",
        ];
        let extremes = [0.0, 1.0, -1.0, 1e308, -1e308, f64::MAX, -f64::MAX, f64::MIN_POSITIVE];
        for formula in formulas {
            assert!(validate(formula).is_ok(), "{formula:?}");
            for score in extremes {
                for overtime in extremes {
                    let result = evaluate(formula, score, overtime);
                    assert!(
                        result.as_ref().is_ok_and(|v| v.is_finite()),
                        "{formula:?} at ({score}, {overtime}) gave {result:?}"
                    );
                }
            }
        }
        assert_eq!(evaluate("score = score * 10", 1e308, 0.0), Ok(f64::MAX));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let formula = "if overtime > 1: score = score * 0.5 - overtime / 4\nelse: score = score - 1";
        for (score, overtime) in [(100.0, 3.0), (37.25, 0.75), (0.0, 0.0)] {
            assert_eq!(
                evaluate(formula, score, overtime),
                evaluate(formula, score, overtime)
            );
        }
    }

    #[test]
    fn test_evaluating_rejected_formula_fails_loudly() {
        assert!(matches!(
            evaluate("score = os", 10.0, 0.0),
            Err(EvaluationError::Rejected(FormulaError::IllegalToken(_)))
        ));
    }

    #[test]
    fn test_source_is_kept_verbatim() {
        let formula = PenaltyFormula::parse("score = score - 1 ").unwrap();
        assert_eq!(formula.source(), "score = score - 1 ");
        assert!(!formula.is_empty());
    }
}
