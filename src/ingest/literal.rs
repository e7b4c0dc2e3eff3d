//! Parser for text-encoded lists and dicts
//!
//! Label files written by the prediction tooling store collections as
//! Python literal text (`"['Guardian', 'Martyr']"`,
//! `"{'Guardian': 0.8123}"`). This module parses that text once, at the
//! ingest boundary, using Nom combinators. JSON literals are accepted too.
//!
//! ## Grammar
//!
//! ```text
//! value  := none | bool | number | string | list | tuple | dict
//! none   := "None" | "null"
//! bool   := "True" | "False" | "true" | "false"
//! string := '...' | "..."        (backslash escapes)
//! list   := "[" (value ",")* value? "]"
//! tuple  := "(" (value ",")* value? ")"
//! dict   := "{" (value ":" value ",")* ... "}"
//! ```

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{anychar, char, multispace0},
    combinator::{all_consuming, map, opt, value},
    multi::{fold_many0, separated_list0},
    number::complete::double,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult,
};
use thiserror::Error;

use crate::domain::FineScores;

/// A parsed literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Lists and tuples
    List(Vec<Literal>),
    /// Key/value pairs in source order
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::None => "None",
            Literal::Bool(_) => "bool",
            Literal::Number(_) => "number",
            Literal::Str(_) => "string",
            Literal::List(_) => "list",
            Literal::Dict(_) => "dict",
        }
    }
}

/// Malformed literal text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("Invalid literal at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    #[error("Expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },
}

/// Parse a complete literal, surrounding whitespace allowed
pub fn parse_literal(input: &str) -> Result<Literal, LiteralError> {
    match all_consuming(ws(literal))(input) {
        Ok((_, lit)) => Ok(lit),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(LiteralError::Syntax {
            offset: input.len() - e.input.len(),
            reason: format!("{:?}", e.code),
        }),
        Err(nom::Err::Incomplete(_)) => Err(LiteralError::Syntax {
            offset: input.len(),
            reason: "unexpected end of input".to_string(),
        }),
    }
}

/// Parse a list of strings, e.g. `"['Guardian', 'Martyr']"`
///
/// Blank input is an empty list.
pub fn parse_label_list(input: &str) -> Result<Vec<String>, LiteralError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    match parse_literal(input)? {
        Literal::List(items) => items
            .into_iter()
            .map(|item| match item {
                Literal::Str(s) => Ok(s),
                other => Err(LiteralError::Shape {
                    expected: "string",
                    found: other.kind(),
                }),
            })
            .collect(),
        Literal::None => Ok(Vec::new()),
        other => Err(LiteralError::Shape {
            expected: "list",
            found: other.kind(),
        }),
    }
}

/// Parse a label to score map, e.g. `"{'Guardian': 0.8123}"`
///
/// Blank input is an empty map.
pub fn parse_score_map(input: &str) -> Result<FineScores, LiteralError> {
    if input.trim().is_empty() {
        return Ok(FineScores::new());
    }
    match parse_literal(input)? {
        Literal::Dict(pairs) => pairs
            .into_iter()
            .map(|pair| match pair {
                (Literal::Str(label), Literal::Number(score)) => Ok((label, score)),
                (Literal::Str(_), other) => Err(LiteralError::Shape {
                    expected: "number",
                    found: other.kind(),
                }),
                (other, _) => Err(LiteralError::Shape {
                    expected: "string",
                    found: other.kind(),
                }),
            })
            .collect(),
        Literal::None => Ok(FineScores::new()),
        other => Err(LiteralError::Shape {
            expected: "dict",
            found: other.kind(),
        }),
    }
}

// =============================================================================
// COMBINATORS
// =============================================================================

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        value(Literal::None, alt((tag("None"), tag("null")))),
        value(Literal::Bool(true), alt((tag("True"), tag("true")))),
        value(Literal::Bool(false), alt((tag("False"), tag("false")))),
        map(quoted_string, Literal::Str),
        map(sequence('[', ']'), Literal::List),
        map(sequence('(', ')'), Literal::List),
        map(dict, Literal::Dict),
        map(double, Literal::Number),
    ))(input)
}

/// Comma-separated values between `open` and `close`, trailing comma allowed
fn sequence<'a>(open: char, close: char) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<Literal>> {
    move |input| {
        delimited(
            terminated(char(open), multispace0),
            terminated(
                separated_list0(char(','), ws(literal)),
                opt(terminated(char(','), multispace0)),
            ),
            char(close),
        )(input)
    }
}

fn dict(input: &str) -> IResult<&str, Vec<(Literal, Literal)>> {
    delimited(
        terminated(char('{'), multispace0),
        terminated(
            separated_list0(
                char(','),
                separated_pair(ws(literal), char(':'), ws(literal)),
            ),
            opt(terminated(char(','), multispace0)),
        ),
        char('}'),
    )(input)
}

#[derive(Debug, Clone)]
enum Fragment<'a> {
    Run(&'a str),
    Escaped(char),
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    alt((quoted('\'', "'\\"), quoted('"', "\"\\")))(input)
}

fn quoted<'a>(
    quote: char,
    stop: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    move |input| {
        let fragment = alt((
            map(is_not(stop), Fragment::Run),
            map(preceded(char('\\'), escape), Fragment::Escaped),
        ));
        let body = fold_many0(fragment, String::new, |mut acc, frag| {
            match frag {
                Fragment::Run(s) => acc.push_str(s),
                Fragment::Escaped(c) => acc.push(c),
            }
            acc
        });
        delimited(char(quote), body, char(quote))(input)
    }
}

fn escape(input: &str) -> IResult<&str, char> {
    alt((
        value('\n', char('n')),
        value('\t', char('t')),
        value('\r', char('r')),
        anychar,
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_list() {
        let labels = parse_label_list("['Guardian', 'Martyr']").unwrap();
        assert_eq!(labels, vec!["Guardian", "Martyr"]);
    }

    #[test]
    fn test_parse_json_list_and_trailing_comma() {
        assert_eq!(parse_label_list(r#"["Spy", "Tyrant",]"#).unwrap(), vec!["Spy", "Tyrant"]);
        assert_eq!(parse_label_list("[]").unwrap(), Vec::<String>::new());
        assert_eq!(parse_label_list("  ").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_parse_score_map() {
        let scores = parse_score_map("{'Guardian': 0.8123, 'Virtuous': 0.79}").unwrap();
        assert_eq!(scores.get("Guardian"), Some(0.8123));
        assert_eq!(scores.get("Virtuous"), Some(0.79));
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_parse_escapes_and_mixed_quotes() {
        let labels = parse_label_list(r#"['O\'Brien', "say \"hi\"", 'a\nb']"#).unwrap();
        assert_eq!(labels, vec!["O'Brien", "say \"hi\"", "a\nb"]);
    }

    #[test]
    fn test_parse_nested_literal() {
        let lit = parse_literal("{'a': [1, (2, 3)], 'b': None, 'c': True}").unwrap();
        assert_eq!(
            lit,
            Literal::Dict(vec![
                (
                    Literal::Str("a".into()),
                    Literal::List(vec![
                        Literal::Number(1.0),
                        Literal::List(vec![Literal::Number(2.0), Literal::Number(3.0)]),
                    ])
                ),
                (Literal::Str("b".into()), Literal::None),
                (Literal::Str("c".into()), Literal::Bool(true)),
            ])
        );
    }

    #[test]
    fn test_malformed_literal() {
        assert!(matches!(
            parse_literal("['Guardian'"),
            Err(LiteralError::Syntax { .. })
        ));
        assert!(matches!(
            parse_label_list("[1, 2]"),
            Err(LiteralError::Shape { expected: "string", found: "number" })
        ));
        assert!(matches!(
            parse_score_map("['Guardian']"),
            Err(LiteralError::Shape { expected: "dict", .. })
        ));
    }
}
