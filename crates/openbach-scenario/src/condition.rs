// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Predicate expression tree used by `if` and `while` operations.
//!
//! The tree renders to nested JSON mirroring its shape:
//!
//! ```json
//! {
//!   "type": "=",
//!   "left_operand": {"type": "database", "name": "Agent", "key": "$agentA", "attribute": "status"},
//!   "right_operand": {"type": "value", "value": "available"}
//! }
//! ```

use serde_json::{Map, Value, json};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{Result, ScenarioError};
use crate::token::{Declarations, Token, UnknownName};

/// Binary operators understood by the runtime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    IntoStaticStr,
)]
pub enum BinaryOperator {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Below,
    #[strum(serialize = "<=")]
    BelowOrEqual,
    #[strum(serialize = ">")]
    Above,
    #[strum(serialize = ">=")]
    AboveOrEqual,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "xor")]
    Xor,
}

/// Tag of the unary negation node.
pub const NOT_OPERATOR: &str = "not";

impl BinaryOperator {
    /// Every operator tag, binary ones first, then `not`.
    pub fn all_tags() -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = BinaryOperator::iter().map(|op| op.tag()).collect();
        tags.push(NOT_OPERATOR);
        tags
    }

    /// Wire tag of the operator.
    pub fn tag(&self) -> &'static str {
        self.into()
    }
}

/// Leaf of a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal value.
    Value(Token),
    /// Live lookup of an attribute of a controller database entity.
    Database {
        name: String,
        key: Token,
        attribute: String,
    },
    /// Last collected value of a statistic.
    Statistic { measurement: Token, field: String },
}

impl Operand {
    /// Literal operand. `$name` strings follow the usual substitution rules.
    pub fn value(value: impl Into<Token>) -> Self {
        Operand::Value(value.into())
    }

    /// Database lookup, e.g. `Agent($agentA).status`.
    pub fn database(
        name: impl Into<String>,
        key: impl Into<Token>,
        attribute: impl Into<String>,
    ) -> Self {
        Operand::Database {
            name: name.into(),
            key: key.into(),
            attribute: attribute.into(),
        }
    }

    /// Statistic lookup.
    pub fn statistic(measurement: impl Into<Token>, field: impl Into<String>) -> Self {
        Operand::Statistic {
            measurement: measurement.into(),
            field: field.into(),
        }
    }

    /// Wire tag of the operand.
    pub fn tag(&self) -> &'static str {
        match self {
            Operand::Value(_) => "value",
            Operand::Database { .. } => "database",
            Operand::Statistic { .. } => "statistic",
        }
    }

    /// Render the operand.
    pub fn build(&self, declarations: &Declarations) -> std::result::Result<Value, UnknownName> {
        Ok(match self {
            Operand::Value(value) => json!({
                "type": self.tag(),
                "value": value.resolve(declarations)?,
            }),
            Operand::Database {
                name,
                key,
                attribute,
            } => json!({
                "type": self.tag(),
                "name": name,
                "key": key.resolve(declarations)?,
                "attribute": attribute,
            }),
            Operand::Statistic { measurement, field } => json!({
                "type": self.tag(),
                "measurement": measurement.resolve(declarations)?,
                "field": field,
            }),
        })
    }

    fn references(&self) -> Vec<&str> {
        match self {
            Operand::Value(token) => token.references(),
            Operand::Database { key, .. } => key.references(),
            Operand::Statistic { measurement, .. } => measurement.references(),
        }
    }
}

/// Child of a condition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Operand(Operand),
    Condition(Condition),
}

impl From<Operand> for Expression {
    fn from(operand: Operand) -> Self {
        Expression::Operand(operand)
    }
}

impl From<Condition> for Expression {
    fn from(condition: Condition) -> Self {
        Expression::Condition(condition)
    }
}

impl Expression {
    /// Render the child.
    pub fn build(&self, declarations: &Declarations) -> std::result::Result<Value, UnknownName> {
        match self {
            Expression::Operand(operand) => operand.build(declarations),
            Expression::Condition(condition) => condition.build(declarations),
        }
    }

    /// Number of condition levels below and including this node.
    pub fn depth(&self) -> usize {
        match self {
            Expression::Operand(_) => 0,
            Expression::Condition(condition) => condition.depth(),
        }
    }

    fn references(&self) -> Vec<&str> {
        match self {
            Expression::Operand(operand) => operand.references(),
            Expression::Condition(condition) => condition.references(),
        }
    }
}

/// Inner node of a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
}

impl Condition {
    /// Build a binary node from its wire tag.
    ///
    /// Fails with [`ScenarioError::InvalidOperator`] for tags outside the
    /// operator table, including `not` which takes a single child.
    pub fn new(
        operator: &str,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Result<Self> {
        if operator == NOT_OPERATOR {
            return Err(ScenarioError::InvalidOperator {
                operator: operator.to_string(),
                reason: "unary operator, use Condition::not".to_string(),
            });
        }
        let operator =
            BinaryOperator::from_str(operator).map_err(|_| ScenarioError::InvalidOperator {
                operator: operator.to_string(),
                reason: format!("expected one of {}", BinaryOperator::all_tags().join(", ")),
            })?;
        Ok(Self::binary(operator, left, right))
    }

    /// Binary node from a typed operator.
    pub fn binary(
        operator: BinaryOperator,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Self {
        Condition::Binary {
            operator,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
        }
    }

    /// Negation node.
    pub fn not(child: impl Into<Expression>) -> Self {
        Condition::Not(Box::new(child.into()))
    }

    /// Wire tag of the node.
    pub fn tag(&self) -> &'static str {
        match self {
            Condition::Binary { operator, .. } => operator.tag(),
            Condition::Not(_) => NOT_OPERATOR,
        }
    }

    /// Number of condition levels, counting this one.
    pub fn depth(&self) -> usize {
        match self {
            Condition::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
            Condition::Not(child) => 1 + child.depth(),
        }
    }

    /// Render the tree. Pure: building twice yields equal values.
    pub fn build(&self, declarations: &Declarations) -> std::result::Result<Value, UnknownName> {
        let mut node = Map::new();
        node.insert("type".to_string(), Value::from(self.tag()));
        match self {
            Condition::Binary { left, right, .. } => {
                node.insert("left_operand".to_string(), left.build(declarations)?);
                node.insert("right_operand".to_string(), right.build(declarations)?);
            }
            Condition::Not(child) => {
                node.insert("operand".to_string(), child.build(declarations)?);
            }
        }
        Ok(Value::Object(node))
    }

    /// `$name` references anywhere in the tree.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Condition::Binary { left, right, .. } => {
                let mut names = left.references();
                names.extend(right.references());
                names
            }
            Condition::Not(child) => child.references(),
        }
    }
}
