//! Odoo search domains.
//!
//! A domain is a list of terms evaluated by the backend. Top-level terms are
//! ANDed implicitly; Odoo also emits prefix connectives (`&`, `|`, `!`) in
//! the `__domain` of `read_group` rows, so those round-trip as well.
//!
//! Values are carried as raw JSON and never coerced here: a filter on
//! `('id', '=', "42")` goes out with the string `"42"` and the backend
//! compares it against its own column type.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PagerError;

/// Comparison operator of a domain condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like")]
    NotLike,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "not ilike")]
    NotILike,
    #[serde(rename = "=like")]
    EqLike,
    #[serde(rename = "=ilike")]
    EqILike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "child_of")]
    ChildOf,
    #[serde(rename = "parent_of")]
    ParentOf,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::ILike => "ilike",
            Operator::NotILike => "not ilike",
            Operator::EqLike => "=like",
            Operator::EqILike => "=ilike",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::ChildOf => "child_of",
            Operator::ParentOf => "parent_of",
        }
    }
}

impl FromStr for Operator {
    type Err = PagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            "like" => Operator::Like,
            "not like" => Operator::NotLike,
            "ilike" => Operator::ILike,
            "not ilike" => Operator::NotILike,
            "=like" => Operator::EqLike,
            "=ilike" => Operator::EqILike,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            "child_of" => Operator::ChildOf,
            "parent_of" => Operator::ParentOf,
            other => {
                return Err(PagerError::InvalidQuery(format!(
                    "unknown domain operator '{}'",
                    other
                )));
            }
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(field, operator, value)` leaf. Serialized as a 3-element array.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.field)?;
        tuple.serialize_element(&self.operator)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (field, operator, value) = <(String, Operator, Value)>::deserialize(deserializer)?;
        if field.is_empty() {
            return Err(de::Error::custom("domain condition with empty field"));
        }
        Ok(Self { field, operator, value })
    }
}

/// Prefix connective in Polish notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    #[serde(rename = "&")]
    And,
    #[serde(rename = "|")]
    Or,
    #[serde(rename = "!")]
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainTerm {
    Connective(Connective),
    Condition(Condition),
}

/// Ordered list of domain terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(Vec<DomainTerm>);

impl Domain {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a domain from string triples, e.g. `[("id", "<=", json!("42"))]`.
    pub fn from_triples<I, F, O>(triples: I) -> Result<Self, PagerError>
    where
        I: IntoIterator<Item = (F, O, Value)>,
        F: Into<String>,
        O: AsRef<str>,
    {
        let mut domain = Domain::new();
        for (field, op, value) in triples {
            let field = field.into();
            if field.is_empty() {
                return Err(PagerError::InvalidQuery("domain condition with empty field".into()));
            }
            domain.push(Condition::new(field, op.as_ref().parse()?, value));
        }
        Ok(domain)
    }

    /// Append a condition (builder style).
    pub fn with(mut self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.push(Condition::new(field, operator, value));
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.0.push(DomainTerm::Condition(condition));
    }

    pub fn push_term(&mut self, term: DomainTerm) {
        self.0.push(term);
    }

    /// Conjunction of two well-formed domains. Each side stays a complete
    /// expression, so plain concatenation is an implicit AND.
    pub fn and(&self, other: &Domain) -> Domain {
        let mut terms = self.0.clone();
        terms.extend(other.0.iter().cloned());
        Domain(terms)
    }

    /// `self` followed by the top-level conditions of `other` that `self`
    /// does not already contain.
    ///
    /// Only used when `other` is a plain conjunction; a domain holding
    /// connectives is appended whole.
    pub fn narrowed_by(&self, other: &Domain) -> Domain {
        if other.has_connectives() {
            return self.and(other);
        }
        let mut terms = self.0.clone();
        for term in &other.0 {
            if !self.0.contains(term) {
                terms.push(term.clone());
            }
        }
        Domain(terms)
    }

    pub fn has_connectives(&self) -> bool {
        self.0.iter().any(|t| matches!(t, DomainTerm::Connective(_)))
    }

    /// Leaf conditions in order, connectives skipped.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter().filter_map(|t| match t {
            DomainTerm::Condition(c) => Some(c),
            DomainTerm::Connective(_) => None,
        })
    }

    pub fn terms(&self) -> &[DomainTerm] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Condition>> for Domain {
    fn from(conditions: Vec<Condition>) -> Self {
        Domain(conditions.into_iter().map(DomainTerm::Condition).collect())
    }
}

impl FromIterator<DomainTerm> for Domain {
    fn from_iter<T: IntoIterator<Item = DomainTerm>>(iter: T) -> Self {
        Domain(iter.into_iter().collect())
    }
}
