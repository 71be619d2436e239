//! Tree-walking interpreter for parsed penalty formulas
//!
//! The only state a program can touch is an [`Env`] holding `score` and
//! `overtime`. Arithmetic saturates at `±f64::MAX`, so finite inputs
//! always produce a finite score.

use super::error::EvaluationError;
use super::parser::{BinOp, Expr, Program, Statement, Var};

/// Variable bindings for one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Env {
    pub score: f64,
    pub overtime: f64,
}

impl Env {
    pub fn new(score: f64, overtime: f64) -> Self {
        Self { score, overtime }
    }

    fn get(&self, var: Var) -> f64 {
        match var {
            Var::Score => self.score,
            Var::Overtime => self.overtime,
        }
    }

    fn set(&mut self, var: Var, value: f64) {
        match var {
            Var::Score => self.score = value,
            Var::Overtime => self.overtime = value,
        }
    }
}

/// Run a program and return the final `score`
pub fn run(program: &Program, mut env: Env) -> Result<f64, EvaluationError> {
    if !env.score.is_finite() {
        return Err(EvaluationError::NonFiniteInput {
            name: "score",
            value: env.score,
        });
    }
    if !env.overtime.is_finite() {
        return Err(EvaluationError::NonFiniteInput {
            name: "overtime",
            value: env.overtime,
        });
    }

    execute(&program.statements, &mut env)?;
    Ok(env.score)
}

fn execute(statements: &[Statement], env: &mut Env) -> Result<(), EvaluationError> {
    for statement in statements {
        match statement {
            Statement::Assign(assignment) => {
                let value = eval(&assignment.value, env)?;
                env.set(assignment.target, value);
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if eval(condition, env)? != 0.0 {
                    then_branch
                } else {
                    else_branch
                };
                execute(branch, env)?;
            }
        }
    }
    Ok(())
}

fn eval(expr: &Expr, env: &Env) -> Result<f64, EvaluationError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Var(var) => Ok(env.get(*var)),
        Expr::Neg(inner) => Ok(-eval(inner, env)?),
        Expr::Binary(op, lhs, rhs) => {
            let (a, b) = (eval(lhs, env)?, eval(rhs, env)?);
            if b == 0.0 && matches!(op, BinOp::Div | BinOp::FloorDiv) {
                return Err(EvaluationError::DivisionByZero);
            }
            Ok(op.apply(a, b))
        }
        Expr::Compare(first, rest) => {
            let mut lhs = eval(first, env)?;
            for (op, operand) in rest {
                let rhs = eval(operand, env)?;
                if !op.holds(lhs, rhs) {
                    return Ok(0.0);
                }
                lhs = rhs;
            }
            Ok(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::penalty::parser::{Assignment, Parser};

    fn run_src(src: &str, score: f64, overtime: f64) -> Result<f64, EvaluationError> {
        run(&Parser::parse(src).unwrap(), Env::new(score, overtime))
    }

    #[test]
    fn test_empty_program_keeps_score() {
        assert_eq!(run(&Program::default(), Env::new(42.0, 7.0)), Ok(42.0));
    }

    #[test]
    fn test_conditional_branches() {
        let src = "if overtime > 2:\n  score = 0\nelse:\n  score = score - overtime * 10";
        assert_eq!(run_src(src, 90.0, 3.0), Ok(0.0));
        assert_eq!(run_src(src, 90.0, 1.0), Ok(80.0));
        assert_eq!(run_src(src, 90.0, 0.0), Ok(90.0));
    }

    #[test]
    fn test_block_runs_only_when_condition_holds() {
        let src = "if overtime > 0:\n    score = score - 10\n    score = score * 0.5";
        assert_eq!(run_src(src, 80.0, 0.0), Ok(80.0));
        assert_eq!(run_src(src, 80.0, 1.0), Ok(35.0));
    }

    #[test]
    fn test_nested_blocks() {
        let src = "if overtime > 0:\n  if overtime > 3:\n    score = 0\n  else:\n    score -= overtime * 5\n  score = score - 1";
        assert_eq!(run_src(src, 80.0, 0.0), Ok(80.0));
        assert_eq!(run_src(src, 80.0, 2.0), Ok(69.0));
        assert_eq!(run_src(src, 80.0, 4.0), Ok(-1.0));
    }

    #[test]
    fn test_overtime_can_be_reassigned() {
        let src = "overtime = overtime - 1\nif overtime > 0: score = score / 2";
        assert_eq!(run_src(src, 80.0, 1.0), Ok(80.0));
        assert_eq!(run_src(src, 80.0, 2.0), Ok(40.0));
    }

    #[test]
    fn test_truthy_condition() {
        let src = "if overtime: score = 0";
        assert_eq!(run_src(src, 50.0, 0.0), Ok(50.0));
        assert_eq!(run_src(src, 50.0, -1.0), Ok(0.0));
    }

    #[test]
    fn test_chained_comparison() {
        let src = "if 0 < overtime <= 2: score = score - 5";
        assert_eq!(run_src(src, 50.0, 0.0), Ok(50.0));
        assert_eq!(run_src(src, 50.0, 2.0), Ok(45.0));
        assert_eq!(run_src(src, 50.0, 3.0), Ok(50.0));
        assert_eq!(run_src("score = score * (overtime == 0)", 50.0, 1.0), Ok(0.0));
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(run_src("score //= 2", 7.0, 0.0), Ok(3.0));
        assert_eq!(run_src("score = score // 2", -7.0, 0.0), Ok(-4.0));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(run_src("score = -score + -(-3)", 10.0, 0.0), Ok(-7.0));
    }

    #[test]
    fn test_non_finite_inputs_fail_explicitly() {
        assert!(matches!(
            run_src("score = score", f64::NAN, 0.0),
            Err(EvaluationError::NonFiniteInput { name: "score", .. })
        ));
        assert!(matches!(
            run_src("score = score", 1.0, f64::INFINITY),
            Err(EvaluationError::NonFiniteInput { name: "overtime", .. })
        ));
    }

    #[test]
    fn test_overflow_saturates() {
        assert_eq!(run_src("score = score * 10", 1e308, 0.0), Ok(f64::MAX));
        assert_eq!(run_src("score = score * score * score", -1e200, 0.0), Ok(-f64::MAX));
        assert_eq!(run_src("score = score / 0.5 - score", f64::MAX, 0.0), Ok(0.0));
    }

    #[test]
    fn test_division_by_zero_is_caught() {
        let program = Program {
            statements: vec![Statement::Assign(Assignment {
                target: Var::Score,
                value: Expr::Binary(
                    BinOp::Div,
                    Box::new(Expr::Var(Var::Score)),
                    Box::new(Expr::Var(Var::Overtime)),
                ),
            })],
        };
        assert_eq!(run(&program, Env::new(1.0, 0.0)), Err(EvaluationError::DivisionByZero));
    }
}
