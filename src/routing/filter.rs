//! Content filter expressions.
//!
//! The filter mini-language selects resources by field values:
//! `tag:bacon+tag:-chorizo` keeps resources tagged bacon and not chorizo,
//! `featured:true` keeps featured resources, `tag:bacon,sausage` keeps
//! either tag. `+` joins predicates with AND, `,` lists alternative
//! values, a `-` prefix negates a value, and values may be single-quoted.
//!
//! Expressions parse once into an AST and evaluate against a resource's
//! field map.

use std::fmt;

use thiserror::Error;

use crate::index::resource::Resource;

/// Filter expression parse failures. Fatal at config load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("empty filter expression")]
    Empty,

    #[error("predicate {predicate:?} is missing a ':' separator")]
    MissingSeparator { predicate: String },

    #[error("predicate {predicate:?} has an empty field name")]
    EmptyField { predicate: String },

    #[error("predicate {predicate:?} has an empty value")]
    EmptyValue { predicate: String },
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// All sub-expressions must hold.
    And(Vec<FilterExpr>),
    /// At least one sub-expression must hold.
    Or(Vec<FilterExpr>),
    /// The sub-expression must not hold.
    Not(Box<FilterExpr>),
    /// A field carries the given value.
    Predicate { field: String, value: String },
}

impl FilterExpr {
    /// Parse an expression string into an AST.
    pub fn parse(raw: &str) -> Result<Self, FilterParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FilterParseError::Empty);
        }

        let mut conjuncts = Vec::new();
        for part in raw.split('+') {
            conjuncts.push(parse_predicate(part.trim())?);
        }

        if conjuncts.len() == 1 {
            Ok(conjuncts.pop().expect("one conjunct"))
        } else {
            Ok(FilterExpr::And(conjuncts))
        }
    }

    /// Evaluate the expression against a resource.
    pub fn matches(&self, resource: &Resource) -> bool {
        match self {
            FilterExpr::And(exprs) => exprs.iter().all(|e| e.matches(resource)),
            FilterExpr::Or(exprs) => exprs.iter().any(|e| e.matches(resource)),
            FilterExpr::Not(expr) => !expr.matches(resource),
            FilterExpr::Predicate { field, value } => resource
                .field_values(field)
                .iter()
                .any(|v| v == value),
        }
    }
}

/// Parse one `field:valuelist` predicate.
fn parse_predicate(part: &str) -> Result<FilterExpr, FilterParseError> {
    let (field, values) =
        part.split_once(':')
            .ok_or_else(|| FilterParseError::MissingSeparator {
                predicate: part.to_string(),
            })?;

    let field = field.trim();
    if field.is_empty() {
        return Err(FilterParseError::EmptyField {
            predicate: part.to_string(),
        });
    }

    let mut alternatives = Vec::new();
    for value in values.split(',') {
        let value = unquote(value.trim());
        let (negated, value) = match value.strip_prefix('-') {
            Some(rest) => (true, unquote(rest)),
            None => (false, value),
        };

        if value.is_empty() {
            return Err(FilterParseError::EmptyValue {
                predicate: part.to_string(),
            });
        }

        let predicate = FilterExpr::Predicate {
            field: field.to_string(),
            value: value.to_string(),
        };
        alternatives.push(if negated {
            FilterExpr::Not(Box::new(predicate))
        } else {
            predicate
        });
    }

    if alternatives.len() == 1 {
        Ok(alternatives.pop().expect("one alternative"))
    } else {
        Ok(FilterExpr::Or(alternatives))
    }
}

/// Strip one layer of single quotes.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::And(exprs) => {
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str("+")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            FilterExpr::Or(exprs) => {
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            // negation lives in the value position: `tag:-chorizo`
            FilterExpr::Not(expr) => match expr.as_ref() {
                FilterExpr::Predicate { field, value } => write!(f, "{field}:-{value}"),
                other => write!(f, "-{other}"),
            },
            FilterExpr::Predicate { field, value } => write!(f, "{field}:{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::resource::{ResourceKind, Status, TagRef, Visibility};

    fn tagged(tags: &[&str], featured: bool) -> Resource {
        Resource {
            id: "r1".to_string(),
            kind: ResourceKind::Post,
            slug: "r1".to_string(),
            status: Status::Published,
            visibility: Visibility::Public,
            featured,
            tags: tags
                .iter()
                .map(|t| TagRef {
                    slug: t.to_string(),
                    visibility: Visibility::Public,
                })
                .collect(),
            authors: vec!["joe-bloggs".to_string()],
            published_at: None,
            templates: Vec::new(),
        }
    }

    #[test]
    fn single_predicate() {
        let expr = FilterExpr::parse("tag:bacon").unwrap();
        assert!(expr.matches(&tagged(&["bacon"], false)));
        assert!(!expr.matches(&tagged(&["chorizo"], false)));
    }

    #[test]
    fn conjunction_with_negation() {
        let expr = FilterExpr::parse("tag:bacon+tag:-chorizo").unwrap();
        assert!(expr.matches(&tagged(&["bacon"], false)));
        assert!(!expr.matches(&tagged(&["bacon", "chorizo"], false)));
        assert!(!expr.matches(&tagged(&["chorizo"], false)));
    }

    #[test]
    fn value_alternatives_are_or() {
        let expr = FilterExpr::parse("tag:bacon,sausage").unwrap();
        assert!(expr.matches(&tagged(&["sausage"], false)));
        assert!(expr.matches(&tagged(&["bacon"], false)));
        assert!(!expr.matches(&tagged(&["eggs"], false)));
    }

    #[test]
    fn boolean_fields_compare_as_text() {
        let expr = FilterExpr::parse("featured:true").unwrap();
        assert!(expr.matches(&tagged(&[], true)));
        assert!(!expr.matches(&tagged(&[], false)));
    }

    #[test]
    fn quoted_values_and_dotted_fields() {
        let expr = FilterExpr::parse("tags:'bacon'+tags.visibility:public").unwrap();
        assert!(expr.matches(&tagged(&["bacon"], false)));
    }

    #[test]
    fn unknown_field_never_matches() {
        let expr = FilterExpr::parse("flavor:umami").unwrap();
        assert!(!expr.matches(&tagged(&["bacon"], false)));

        // ...but its negation always does.
        let expr = FilterExpr::parse("flavor:-umami").unwrap();
        assert!(expr.matches(&tagged(&["bacon"], false)));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(FilterExpr::parse("  "), Err(FilterParseError::Empty));
        assert!(matches!(
            FilterExpr::parse("bacon"),
            Err(FilterParseError::MissingSeparator { .. })
        ));
        assert!(matches!(
            FilterExpr::parse(":bacon"),
            Err(FilterParseError::EmptyField { .. })
        ));
        assert!(matches!(
            FilterExpr::parse("tag:"),
            Err(FilterParseError::EmptyValue { .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        let raw = "tag:bacon+tag:-chorizo";
        let expr = FilterExpr::parse(raw).unwrap();
        assert_eq!(expr.to_string(), raw);
        assert_eq!(FilterExpr::parse(&expr.to_string()).unwrap(), expr);
    }
}
