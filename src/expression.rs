//! Statistic expression parser
//!
//! Parses statistic expressions and reported stat names, and performs the
//! exact / wildcard matching the catalog uses to route incoming reports.
//!
//! # Grammar
//!
//! ```text
//! expression  := path "." aggSpec ("," aggSpec)*
//! path        := segment ("." segment)*
//! segment     := identifier | "*"
//! aggSpec     := identifier "(" [arg ("," arg)*] ")"
//! ```
//!
//! Aggregator arguments are opaque tokens (`5`, `window=60`) handed to the
//! aggregator verbatim. An expression with several `aggSpec`s is compound and
//! decomposes into one elemental expression per aggregator.
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::expression::{base_stats, wildcard_substitute};
//!
//! let stats = base_stats("db.*.latency.window(5),decay(0.5)").unwrap();
//! assert_eq!(stats, vec!["db.*.latency.window(5)", "db.*.latency.decay(0.5)"]);
//!
//! let concrete = wildcard_substitute("db.*.latency.window(5)", "db.p1.latency").unwrap();
//! assert_eq!(concrete, "db.p1.latency.window(5)");
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{map, value},
    multi::{many1, separated_list0, separated_list1},
    sequence::{delimited, terminated},
    IResult, Parser,
};
use std::fmt;

use crate::error::{Error, Result};

/// Wildcard path segment token
pub const WILDCARD: &str = "*";

/// One segment of a stat path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal identifier
    Literal(String),
    /// `*`, matches any single segment
    Wildcard,
}

impl Segment {
    /// True for the `*` segment
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(s) => f.write_str(s),
            Segment::Wildcard => f.write_str(WILDCARD),
        }
    }
}

/// Aggregator type plus its verbatim arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregatorSpec {
    /// Aggregator type name, resolved through the registry
    pub name: String,
    /// Arguments in declaration order
    pub args: Vec<String>,
}

impl fmt::Display for AggregatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.join(","))
    }
}

/// Parsed statistic expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatExpression {
    /// Path pattern segments
    pub path: Vec<Segment>,
    /// One entry per aggregator specification
    pub aggregators: Vec<AggregatorSpec>,
}

impl StatExpression {
    /// Parse an expression string
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        match expression(trimmed) {
            Ok((remaining, expr)) if remaining.is_empty() => Ok(expr),
            Ok((remaining, _)) => Err(Error::Parse(format!(
                "unexpected trailing input '{}' in expression '{}'",
                remaining, trimmed
            ))),
            Err(e) => Err(Error::Parse(format!(
                "invalid stat expression '{}': {:?}",
                trimmed, e
            ))),
        }
    }

    /// True when any path segment is `*`
    pub fn has_wildcard(&self) -> bool {
        self.path.iter().any(Segment::is_wildcard)
    }

    /// True when the expression carries exactly one aggregator
    pub fn is_elemental(&self) -> bool {
        self.aggregators.len() == 1
    }

    /// The single aggregator of an elemental expression
    pub fn aggregator(&self) -> Result<&AggregatorSpec> {
        match self.aggregators.as_slice() {
            [spec] => Ok(spec),
            [] => Err(Error::Parse(format!("'{}' has no aggregator", self))),
            _ => Err(Error::Parse(format!(
                "'{}' is compound; expected one aggregator",
                self
            ))),
        }
    }

    /// Split into one elemental expression per aggregator
    pub fn elemental(&self) -> Vec<StatExpression> {
        self.aggregators
            .iter()
            .map(|spec| StatExpression {
                path: self.path.clone(),
                aggregators: vec![spec.clone()],
            })
            .collect()
    }

    /// Path rendered without the aggregator part
    pub fn path_string(&self) -> String {
        join_segments(&self.path)
    }

    /// Literal path equal to the report name, segment for segment
    pub fn matches_exactly(&self, report: &[String]) -> bool {
        !self.has_wildcard()
            && self.path.len() == report.len()
            && self
                .path
                .iter()
                .zip(report)
                .all(|(seg, name)| matches!(seg, Segment::Literal(lit) if lit == name))
    }

    /// Wildcard path whose literal segments all agree with the report name
    pub fn matches_wildcard(&self, report: &[String]) -> bool {
        self.has_wildcard()
            && self.path.len() == report.len()
            && self.path.iter().zip(report).all(|(seg, name)| match seg {
                Segment::Literal(lit) => lit == name,
                Segment::Wildcard => true,
            })
    }

    /// Replace every `*` segment with the report's segment at that position
    pub fn substitute(&self, report: &[String]) -> Result<StatExpression> {
        if self.path.len() != report.len() {
            return Err(Error::Validation(format!(
                "cannot substitute '{}' with '{}': segment counts differ",
                self,
                report.join(".")
            )));
        }

        let path = self
            .path
            .iter()
            .zip(report)
            .map(|(seg, name)| match seg {
                Segment::Wildcard => Segment::Literal(name.clone()),
                literal => literal.clone(),
            })
            .collect();

        Ok(StatExpression {
            path,
            aggregators: self.aggregators.clone(),
        })
    }
}

impl fmt::Display for StatExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", join_segments(&self.path))?;
        for (i, spec) in self.aggregators.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", spec)?;
        }
        Ok(())
    }
}

/// Parse a reported stat name into its literal segments
///
/// Report names never carry aggregators or wildcards.
pub fn parse_report_name(name: &str) -> Result<Vec<String>> {
    let trimmed = name.trim();
    match report_name(trimmed) {
        Ok((remaining, segments)) if remaining.is_empty() => Ok(segments),
        _ => Err(Error::Parse(format!(
            "invalid report name '{}': expected literal dot-separated segments",
            trimmed
        ))),
    }
}

/// Aggregator type of an elemental expression
pub fn aggregator_type(expr: &str) -> Result<String> {
    Ok(StatExpression::parse(expr)?.aggregator()?.name.clone())
}

/// Aggregator arguments of an elemental expression
pub fn aggregator_args(expr: &str) -> Result<Vec<String>> {
    Ok(StatExpression::parse(expr)?.aggregator()?.args.clone())
}

/// Decompose a possibly compound expression into elemental expressions
pub fn base_stats(expr: &str) -> Result<Vec<String>> {
    Ok(StatExpression::parse(expr)?
        .elemental()
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// True iff the key has no wildcard and its path equals the report name
pub fn is_exact_match(catalog_key: &str, report_name: &str) -> Result<bool> {
    let key = StatExpression::parse(catalog_key)?;
    let report = parse_report_name(report_name)?;
    Ok(key.matches_exactly(&report))
}

/// True iff the key has a wildcard and all its literal segments agree
pub fn is_wildcard_match(catalog_key: &str, report_name: &str) -> Result<bool> {
    let key = StatExpression::parse(catalog_key)?;
    let report = parse_report_name(report_name)?;
    Ok(key.matches_wildcard(&report))
}

/// Concrete expression derived from a wildcard key and a report name
pub fn wildcard_substitute(catalog_key: &str, report_name: &str) -> Result<String> {
    let key = StatExpression::parse(catalog_key)?;
    let report = parse_report_name(report_name)?;
    Ok(key.substitute(&report)?.to_string())
}

fn join_segments(path: &[Segment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

// ============================================================================
// nom grammar
// ============================================================================

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '@' | '%' | '#' | '|')
}

fn is_arg_char(c: char) -> bool {
    !matches!(c, ',' | '(' | ')')
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        value(Segment::Wildcard, char('*')),
        map(take_while1(is_segment_char), |s: &str| {
            Segment::Literal(s.to_string())
        }),
    ))
    .parse(input)
}

fn aggregator_spec(input: &str) -> IResult<&str, AggregatorSpec> {
    map(
        (
            take_while1(is_segment_char),
            delimited(
                char('('),
                separated_list0(char(','), take_while1(is_arg_char)),
                char(')'),
            ),
        ),
        |(name, args): (&str, Vec<&str>)| AggregatorSpec {
            name: name.to_string(),
            args: args.into_iter().map(String::from).collect(),
        },
    )
    .parse(input)
}

fn expression(input: &str) -> IResult<&str, StatExpression> {
    map(
        (
            many1(terminated(segment, char('.'))),
            separated_list1(char(','), aggregator_spec),
        ),
        |(path, aggregators)| StatExpression { path, aggregators },
    )
    .parse(input)
}

fn report_name(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(
        char('.'),
        map(take_while1(is_segment_char), |s: &str| s.to_string()),
    )
    .parse(input)
}
