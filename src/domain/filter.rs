//! Boolean search filters ("domains") in prefix notation.
//!
//! A domain is a flat list of terms. Each term is either a logical operator
//! (`&`, `|`, `!`) or a leaf condition `[left, operator, right]`. Consecutive
//! expressions without an explicit operator are implicitly AND-ed together,
//! so `[A, B]` means `["&", A, B]`.
//!
//! The combinators in this module produce normalized domains, where every
//! implicit `&` has been made explicit. Normalized domains can be concatenated
//! behind a run of operators to build larger filters.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A logical operator in a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Binary conjunction.
    #[serde(rename = "&")]
    And,
    /// Binary disjunction.
    #[serde(rename = "|")]
    Or,
    /// Unary negation.
    #[serde(rename = "!")]
    Not,
}

impl Operator {
    const fn arity(self) -> i64 {
        match self {
            Self::Not => 1,
            Self::And | Self::Or => 2,
        }
    }
}

/// A leaf condition: `[left, operator, right]`.
///
/// The left side is usually a field name, but the constant leaves use
/// integers, so it is kept as a raw JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf(pub Value, pub String, pub Value);

impl Leaf {
    /// Creates a condition on a named field.
    pub fn new(field: &str, operator: &str, value: impl Into<Value>) -> Self {
        Self(Value::from(field), operator.to_string(), value.into())
    }

    /// Whether the right-hand side is itself a domain (`any` / `not any`).
    fn has_subdomain(&self) -> bool {
        matches!(self.1.as_str(), "any" | "not any")
    }

    fn normalized(&self) -> Result<Self, DomainError> {
        if !self.has_subdomain() {
            return Ok(self.clone());
        }
        let inner: Domain = serde_json::from_value(self.2.clone())?;
        let inner = serde_json::to_value(inner.normalize()?)?;
        Ok(Self(self.0.clone(), self.1.clone(), inner))
    }
}

/// A single element of a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    /// A logical operator.
    Operator(Operator),
    /// A leaf condition.
    Leaf(Leaf),
}

impl From<Leaf> for Term {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<Operator> for Term {
    fn from(operator: Operator) -> Self {
        Self::Operator(operator)
    }
}

/// Errors raised while building or parsing a domain.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Operators and operands do not line up.
    #[error("domain {0} is syntactically not correct")]
    Malformed(String),

    /// The domain could not be decoded.
    #[error("failed to parse domain: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A search filter in prefix notation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(Vec<Term>);

impl Domain {
    /// The empty domain, which matches every record.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds a domain from raw terms.
    #[must_use]
    pub const fn from_terms(terms: Vec<Term>) -> Self {
        Self(terms)
    }

    /// A domain made of a single condition.
    pub fn leaf(field: &str, operator: &str, value: impl Into<Value>) -> Self {
        Self(vec![Leaf::new(field, operator, value).into()])
    }

    /// `[(1, "=", 1)]`, always true.
    #[must_use]
    pub fn true_domain() -> Self {
        Self(vec![Leaf(Value::from(1), "=".to_string(), Value::from(1)).into()])
    }

    /// `[(0, "=", 1)]`, always false.
    #[must_use]
    pub fn false_domain() -> Self {
        Self(vec![Leaf(Value::from(0), "=".to_string(), Value::from(1)).into()])
    }

    /// The terms of this domain.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.0
    }

    /// Whether the domain has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Makes every implicit `&` explicit.
    ///
    /// An empty domain normalizes to the always-true domain. Subdomains of
    /// `any` and `not any` leaves are normalized recursively.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Malformed`] if an operator is missing operands.
    pub fn normalize(&self) -> Result<Self, DomainError> {
        if self.0.is_empty() {
            return Ok(Self::true_domain());
        }

        let mut result: Vec<Term> = Vec::with_capacity(self.0.len() + 1);
        // number of complete expressions still needed
        let mut expected: i64 = 1;
        for term in &self.0 {
            if expected == 0 {
                result.insert(0, Operator::And.into());
                expected = 1;
            }
            match term {
                Term::Leaf(leaf) => {
                    expected -= 1;
                    result.push(leaf.normalized()?.into());
                }
                Term::Operator(operator) => {
                    expected += operator.arity() - 1;
                    result.push((*operator).into());
                }
            }
        }

        if expected != 0 {
            return Err(DomainError::Malformed(self.to_string()));
        }
        Ok(Self(result))
    }

    /// Parses a domain literal.
    ///
    /// JSON is accepted as-is. Python-style literals (single quotes,
    /// `True`/`False`/`None`, tuples) are translated first, so values copied
    /// from the server's own UI can be pasted directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a list of domain terms.
    pub fn parse_literal(text: &str) -> Result<Self, DomainError> {
        match serde_json::from_str(text) {
            Ok(domain) => Ok(domain),
            Err(_) => Ok(serde_json::from_str(&python_literal_to_json(text))?),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_literal(s)
    }
}

/// Joins `domains` with `operator`.
///
/// `unit` is the identity element for the operator and is skipped; `zero` is
/// the absorbing element and short-circuits the whole result. Empty domains
/// are ignored. The result is always normalized.
///
/// # Errors
///
/// Returns an error if any of the input domains is malformed.
pub fn combine(
    operator: Operator,
    unit: &Domain,
    zero: &Domain,
    domains: &[Domain],
) -> Result<Domain, DomainError> {
    if let [only] = domains {
        if only == unit {
            return Ok(unit.clone());
        }
    }

    let mut terms: Vec<Term> = Vec::new();
    let mut count = 0usize;
    for domain in domains {
        if domain == unit {
            continue;
        }
        if domain == zero {
            return Ok(zero.clone());
        }
        if !domain.is_empty() {
            terms.extend(domain.normalize()?.0);
            count += 1;
        }
    }

    if terms.is_empty() {
        return Ok(unit.clone());
    }

    let mut result: Vec<Term> = vec![operator.into(); count - 1];
    result.extend(terms);
    Ok(Domain(result))
}

/// `D1 and D2 and ...`
///
/// # Errors
///
/// Returns an error if any of the input domains is malformed.
pub fn and(domains: &[Domain]) -> Result<Domain, DomainError> {
    combine(
        Operator::And,
        &Domain::true_domain(),
        &Domain::false_domain(),
        domains,
    )
}

/// `D1 or D2 or ...`
///
/// # Errors
///
/// Returns an error if any of the input domains is malformed.
pub fn or(domains: &[Domain]) -> Result<Domain, DomainError> {
    combine(
        Operator::Or,
        &Domain::false_domain(),
        &Domain::true_domain(),
        domains,
    )
}

fn python_literal_to_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            match c {
                '\\' => match chars.next() {
                    // `\'` is not a JSON escape
                    Some('\'') => out.push('\''),
                    Some(escaped) => {
                        out.push(c);
                        out.push(escaped);
                    }
                    None => out.push(c),
                },
                _ if c == q => {
                    out.push('"');
                    quote = None;
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push('"');
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn domain(value: Value) -> Domain {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_domain_normalizes_to_true() {
        assert_eq!(Domain::new().normalize().unwrap(), Domain::true_domain());
    }

    #[test]
    fn implicit_and_is_made_explicit() {
        let input = domain(json!([["a", "=", 1], ["b", "=", 2], ["c", "=", 3]]));
        let expected = domain(json!([
            "&",
            "&",
            ["a", "=", 1],
            ["b", "=", 2],
            ["c", "=", 3]
        ]));
        assert_eq!(input.normalize().unwrap(), expected);
    }

    #[test]
    fn normalized_domain_is_unchanged() {
        let input = domain(json!(["|", ["a", "=", 1], "!", ["b", "=", 2]]));
        assert_eq!(input.normalize().unwrap(), input);
    }

    #[test]
    fn subdomains_of_any_are_normalized() {
        let input = domain(json!([[
            "partner_id",
            "any",
            [["name", "=", "x"], ["active", "=", true]]
        ]]));
        let expected = domain(json!([[
            "partner_id",
            "any",
            ["&", ["name", "=", "x"], ["active", "=", true]]
        ]]));
        assert_eq!(input.normalize().unwrap(), expected);
    }

    #[test]
    fn dangling_operator_is_rejected() {
        let input = domain(json!(["&", ["a", "=", 1]]));
        let error = input.normalize().unwrap_err();
        assert!(matches!(error, DomainError::Malformed(_)));
        assert!(error.to_string().contains("syntactically not correct"));
    }

    #[test]
    fn and_prefixes_one_operator_per_extra_domain() {
        let a = Domain::leaf("a", "=", 1);
        let b = domain(json!([["b", "=", 2], ["c", "=", 3]]));
        let combined = and(&[a, b]).unwrap();
        assert_eq!(
            combined,
            domain(json!([
                "&",
                ["a", "=", 1],
                "&",
                ["b", "=", 2],
                ["c", "=", 3]
            ]))
        );
    }

    #[test]
    fn and_skips_unit_and_empty_domains() {
        let a = Domain::leaf("a", "=", 1);
        let combined = and(&[Domain::true_domain(), Domain::new(), a.clone()]).unwrap();
        assert_eq!(combined, a);
    }

    #[test]
    fn and_of_only_unit_is_unit() {
        assert_eq!(and(&[Domain::true_domain()]).unwrap(), Domain::true_domain());
        assert_eq!(and(&[]).unwrap(), Domain::true_domain());
    }

    #[test]
    fn zero_absorbs_the_combination() {
        let a = Domain::leaf("a", "=", 1);
        assert_eq!(
            and(&[a.clone(), Domain::false_domain()]).unwrap(),
            Domain::false_domain()
        );
        assert_eq!(
            or(&[a, Domain::true_domain()]).unwrap(),
            Domain::true_domain()
        );
    }

    #[test]
    fn or_joins_with_pipe() {
        let combined = or(&[Domain::leaf("a", "=", 1), Domain::leaf("b", "=", 2)]).unwrap();
        assert_eq!(
            combined,
            domain(json!(["|", ["a", "=", 1], ["b", "=", 2]]))
        );
    }

    #[test]
    fn serializes_to_wire_form() {
        let combined = and(&[
            Domain::leaf("name", "ilike", "[rr]%"),
            Domain::leaf("user_ids", "=", false),
        ])
        .unwrap();
        assert_eq!(
            combined.to_string(),
            r#"["&",["name","ilike","[rr]%"],["user_ids","=",false]]"#
        );
    }

    #[test]
    fn parses_python_literals() {
        let parsed = Domain::parse_literal(
            "['&', ('name', 'ilike', \"[rr]%\"), ('user_ids', '=', False)]",
        )
        .unwrap();
        assert_eq!(
            parsed,
            domain(json!(["&", ["name", "ilike", "[rr]%"], ["user_ids", "=", false]]))
        );
    }

    #[test]
    fn python_keywords_inside_strings_are_preserved() {
        let parsed = Domain::parse_literal("[('name', '=', 'False start')]").unwrap();
        assert_eq!(parsed, Domain::leaf("name", "=", "False start"));
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let parsed = Domain::parse_literal(r#"[('name', '=', 'it\'s'), ('x', '=', 'say \"hi\"')]"#)
            .unwrap();
        assert_eq!(
            parsed,
            domain(json!([["name", "=", "it's"], ["x", "=", "say \"hi\""]]))
        );
    }

    #[test]
    fn rejects_non_domain_literals() {
        assert!(Domain::parse_literal("not a domain").is_err());
        assert!(Domain::parse_literal(r#"[["a", "="]]"#).is_err());
    }
}
