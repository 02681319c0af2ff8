//! Lucene-style query string parsing for the in-memory engine
//!
//! Supports the subset the connector forwards from `"table: <query>"` names:
//! - bare terms and `"quoted phrases"`
//! - `field:term` and `field:"phrase"` scoped to one dotted field path
//! - `+clause` (required), `-clause` and `NOT clause` (prohibited)
//! - `AND` / `OR` between clauses; the default operator is OR
//! - `( ... )` grouping, nested to any depth
//!
//! Operators are upper-case only, as in Lucene; `and` is an ordinary term.
//! Anything else is a parse error reported as
//! `Failed to parse query [<query>]`, mirroring the engine's own message.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, value, verify},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    /// Lower-cased single token
    Word(String),
    /// Lower-cased token sequence
    Phrase(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// A term, optionally restricted to one field path
    Term {
        field: Option<String>,
        term: QueryTerm,
    },
    /// Parenthesized sub-query
    Group(Vec<QueryClause>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClause {
    pub occur: Occur,
    pub node: QueryNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

/// Split text into lower-cased alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn is_operator(word: &str) -> bool {
    matches!(word, "AND" | "OR" | "NOT")
}

fn word(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        |w: &str| !is_operator(w),
    )
    .parse(input)
}

fn field_name(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
        |f: &str| !is_operator(f),
    )
    .parse(input)
}

fn phrase(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_until("\""), char('"')).parse(input)
}

fn term(input: &str) -> IResult<&str, QueryTerm> {
    alt((
        map(phrase, |p| QueryTerm::Phrase(tokenize(p))),
        map(word, |w| QueryTerm::Word(w.to_lowercase())),
    ))
    .parse(input)
}

fn field_term(input: &str) -> IResult<&str, QueryNode> {
    map(
        pair(opt(terminated(field_name, char(':'))), term),
        |(field, term)| QueryNode::Term {
            field: field.map(str::to_string),
            term,
        },
    )
    .parse(input)
}

fn group(input: &str) -> IResult<&str, QueryNode> {
    map(delimited(char('('), clauses, char(')')), QueryNode::Group).parse(input)
}

fn prefix(input: &str) -> IResult<&str, Occur> {
    alt((
        value(Occur::Must, char('+')),
        value(Occur::MustNot, char('-')),
        value(Occur::MustNot, terminated(tag("NOT"), multispace1)),
    ))
    .parse(input)
}

fn clause(input: &str) -> IResult<&str, QueryClause> {
    map(pair(opt(prefix), alt((group, field_term))), |(occur, node)| {
        QueryClause {
            occur: occur.unwrap_or(Occur::Should),
            node,
        }
    })
    .parse(input)
}

fn connective(input: &str) -> IResult<&str, Connective> {
    alt((
        value(Connective::And, tag("AND")),
        value(Connective::Or, tag("OR")),
    ))
    .parse(input)
}

/// One level of clauses; surrounding whitespace is consumed
fn clauses(input: &str) -> IResult<&str, Vec<QueryClause>> {
    let (input, first) = preceded(multispace0, clause).parse(input)?;
    let (input, rest) = many0(pair(
        alt((
            map(delimited(multispace1, connective, multispace1), Some),
            value(None, multispace1),
        )),
        clause,
    ))
    .parse(input)?;
    let (input, _) = multispace0.parse(input)?;

    let mut parsed = vec![first];
    let mut connectives = vec![None];
    for (conn, clause) in rest {
        parsed.push(clause);
        connectives.push(conn);
    }

    // AND makes both neighbours required unless they are prohibited
    for i in 1..parsed.len() {
        if connectives[i] == Some(Connective::And) {
            for j in [i - 1, i] {
                if parsed[j].occur == Occur::Should {
                    parsed[j].occur = Occur::Must;
                }
            }
        }
    }

    Ok((input, parsed))
}

/// Parse a query string into clauses
pub fn parse_query_string(query: &str) -> Result<Vec<QueryClause>, String> {
    match clauses(query) {
        Ok(("", parsed)) => Ok(parsed),
        _ => Err(format!("Failed to parse query [{}]", query)),
    }
}

impl QueryTerm {
    /// Match against a tokenized field value
    pub fn matches(&self, tokens: &[String]) -> bool {
        match self {
            QueryTerm::Word(w) => tokens.iter().any(|t| t == w),
            QueryTerm::Phrase(phrase) if phrase.is_empty() => false,
            QueryTerm::Phrase(phrase) => tokens.windows(phrase.len()).any(|win| win == &phrase[..]),
        }
    }
}

impl QueryNode {
    fn matches(&self, fields: &[(String, Vec<String>)]) -> bool {
        match self {
            QueryNode::Term { field, term } => fields
                .iter()
                .filter(|(path, _)| field.as_deref().map_or(true, |f| f == path))
                .any(|(_, tokens)| term.matches(tokens)),
            QueryNode::Group(clauses) => evaluate(clauses, fields),
        }
    }
}

/// Evaluate parsed clauses against the tokenized text fields of a document,
/// given as `(dotted path, tokens)` pairs
pub fn evaluate(clauses: &[QueryClause], fields: &[(String, Vec<String>)]) -> bool {
    let mut has_must = false;
    let mut any_should = false;
    let mut should_hit = false;
    for clause in clauses {
        match clause.occur {
            Occur::Must => {
                has_must = true;
                if !clause.node.matches(fields) {
                    return false;
                }
            }
            Occur::MustNot => {
                if clause.node.matches(fields) {
                    return false;
                }
            }
            Occur::Should => {
                any_should = true;
                should_hit |= clause.node.matches(fields);
            }
        }
    }

    has_must || !any_should || should_hit
}
