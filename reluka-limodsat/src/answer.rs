//! Exact values from a solver's answer to `(get-value (phi))`.
//!
//! Solvers print the value of a real variable as an integer or decimal literal, possibly wrapped
//! in a negation `(- v)` or written as a fraction `(/ a b)`:
//!
//! ```text
//! sat
//! ((phi (/ 3.0 4.0)))
//! ```
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use thiserror::Error;

/// The solver's output does not contain a value for `phi`.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Solver reported '{}' instead of a model", status)]
    NoModel { status: String },
    #[error("Solver reported an error: {}", excerpt)]
    SolverError { excerpt: String },
    #[error("No value for phi in solver output: {}", excerpt)]
    MissingValue { excerpt: String },
    #[error("Unparsable value for phi in solver output: {}", excerpt)]
    MalformedValue { excerpt: String },
    #[error("Division by zero in value for phi")]
    DivisionByZero,
}

const EXCERPT_LEN: usize = 200;

fn excerpt(output: &str) -> String {
    let output = output.trim();
    match output.char_indices().nth(EXCERPT_LEN) {
        Some((end, _)) => format!("{}...", &output[..end]),
        None => output.to_owned(),
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = vec![];
    let mut atom_start = None;

    for (position, c) in input.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(start) = atom_start.take() {
                tokens.push(Token::Atom(&input[start..position]));
            }
            match c {
                '(' => tokens.push(Token::Open),
                ')' => tokens.push(Token::Close),
                _ => (),
            }
        } else if atom_start.is_none() {
            atom_start = Some(position);
        }
    }
    if let Some(start) = atom_start {
        tokens.push(Token::Atom(&input[start..]));
    }

    tokens
}

/// Parses the value assigned to `phi` in a solver's output.
///
/// The value is returned as an exact rational, no floating point rounding takes place.
pub fn parse_answer(output: &str) -> Result<BigRational, AnswerError> {
    let status = output.trim_start().lines().next().unwrap_or("").trim();
    if status == "unsat" || status == "unknown" {
        return Err(AnswerError::NoModel {
            status: status.to_owned(),
        });
    }
    if output.contains("(error") {
        return Err(AnswerError::SolverError {
            excerpt: excerpt(output),
        });
    }

    let tokens = tokenize(output);
    let start = tokens
        .iter()
        .position(|&token| token == Token::Atom("phi"))
        .ok_or_else(|| AnswerError::MissingValue {
            excerpt: excerpt(output),
        })?;

    let mut rest = &tokens[start + 1..];
    let value = parse_value(&mut rest)?.ok_or_else(|| AnswerError::MalformedValue {
        excerpt: excerpt(output),
    })?;

    Ok(value)
}

/// Parses a value term from the front of `tokens`, `None` when it has an unexpected shape.
fn parse_value(tokens: &mut &[Token]) -> Result<Option<BigRational>, AnswerError> {
    let current: &[Token] = *tokens;
    let (first, rest) = match current.split_first() {
        Some(split) => split,
        None => return Ok(None),
    };
    *tokens = rest;

    match *first {
        Token::Atom(literal) => Ok(parse_literal(literal)),
        Token::Close => Ok(None),
        Token::Open => {
            let current: &[Token] = *tokens;
            let operator = match current.split_first() {
                Some((Token::Atom(operator), rest)) => {
                    *tokens = rest;
                    *operator
                }
                _ => return Ok(None),
            };

            let value = match operator {
                "-" => match parse_value(tokens)? {
                    Some(value) => -value,
                    None => return Ok(None),
                },
                "/" => {
                    let numer = match parse_value(tokens)? {
                        Some(value) => value,
                        None => return Ok(None),
                    };
                    let denom = match parse_value(tokens)? {
                        Some(value) => value,
                        None => return Ok(None),
                    };
                    if denom.is_zero() {
                        return Err(AnswerError::DivisionByZero);
                    }
                    numer / denom
                }
                _ => return Ok(None),
            };

            let current: &[Token] = *tokens;
            match current.split_first() {
                Some((Token::Close, rest)) => {
                    *tokens = rest;
                    Ok(Some(value))
                }
                _ => Ok(None),
            }
        }
    }
}

/// Integer or decimal literal, optionally signed.
fn parse_literal(literal: &str) -> Option<BigRational> {
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, literal),
    };

    let (whole, fraction) = match digits.find('.') {
        Some(dot) => (&digits[..dot], &digits[dot + 1..]),
        None => (digits, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    let numer: BigInt = format!("{}{}", whole, fraction).parse().ok()?;
    let denom = num_traits::pow(BigInt::from(10u32), fraction.len());

    let value = BigRational::new(numer, denom);
    Some(if negative { -value } else { value })
}
