// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Payload tokens and the two substitution phases.
//!
//! A payload value is either a literal or a reference to a declared name.
//! References come in two flavours with different timing:
//!
//! | Token | Resolved by | Rendered as |
//! |-------|-------------|-------------|
//! | `Constant(name)` | the builder, at build time | the constant's value |
//! | `Argument(name)` | the runtime, at launch time | `"$name"` unchanged |
//! | `Placeholder(name)` | the builder, classified at build time | one of the above |
//!
//! Strings of the exact form `$name` are parsed into `Placeholder` when the
//! token is created. A `$` anywhere else in a string is plain text.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::error::ScenarioError;

/// A `$name` token that matches no declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reference '${0}'")]
pub struct UnknownName(pub String);

impl UnknownName {
    /// Attach the index of the operation the token was found in.
    pub fn at(self, operation: usize) -> ScenarioError {
        ScenarioError::UnknownReference {
            name: self.0,
            operation,
        }
    }
}

/// A payload value with its substitution phase made explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Plain JSON value, rendered as-is.
    Literal(Value),
    /// `$name` whose phase is decided against the scenario declarations.
    Placeholder(String),
    /// Reference that must resolve to a declared constant.
    Constant(String),
    /// Reference that must resolve to a declared argument.
    Argument(String),
    /// Ordered list of tokens, rendered as a JSON array.
    List(Vec<Token>),
    /// Ordered key/token pairs, rendered as a JSON object.
    Map(Vec<(String, Token)>),
}

impl Token {
    /// Parse a string, recognizing the exact `$name` form.
    pub fn parse(text: &str) -> Self {
        match placeholder_name(text) {
            Some(name) => Token::Placeholder(name.to_string()),
            None => Token::Literal(Value::String(text.to_string())),
        }
    }

    /// Literal value, never interpreted as a reference.
    pub fn literal(value: impl Into<Value>) -> Self {
        Token::Literal(value.into())
    }

    /// Reference pinned to the constant table.
    pub fn constant(name: impl Into<String>) -> Self {
        Token::Constant(name.into())
    }

    /// Reference pinned to the argument table.
    pub fn argument(name: impl Into<String>) -> Self {
        Token::Argument(name.into())
    }

    /// Names referenced by this token, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Token::Literal(_) => vec![],
            Token::Placeholder(name) | Token::Constant(name) | Token::Argument(name) => {
                vec![name.as_str()]
            }
            Token::List(items) => items.iter().flat_map(|t| t.references()).collect(),
            Token::Map(entries) => entries.iter().flat_map(|(_, t)| t.references()).collect(),
        }
    }

    /// Render the token for the wire format.
    pub fn resolve(&self, declarations: &Declarations) -> Result<Value, UnknownName> {
        let unknown = |name: &str| UnknownName(name.to_string());

        match self {
            Token::Literal(value) => Ok(value.clone()),
            Token::Placeholder(name) => {
                if let Some(value) = declarations.constant(name) {
                    Ok(value.clone())
                } else if declarations.is_argument(name) {
                    Ok(Value::String(format!("${}", name)))
                } else {
                    Err(unknown(name))
                }
            }
            Token::Constant(name) => declarations
                .constant(name)
                .cloned()
                .ok_or_else(|| unknown(name)),
            Token::Argument(name) => {
                if declarations.is_argument(name) {
                    Ok(Value::String(format!("${}", name)))
                } else {
                    Err(unknown(name))
                }
            }
            Token::List(items) => items
                .iter()
                .map(|item| item.resolve(declarations))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Token::Map(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), item.resolve(declarations)?)))
                .collect::<Result<Map<String, Value>, UnknownName>>()
                .map(Value::Object),
        }
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token::parse(text)
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Token::parse(&text)
    }
}

impl From<&String> for Token {
    fn from(text: &String) -> Self {
        Token::parse(text)
    }
}

impl From<Value> for Token {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Token::parse(&text),
            Value::Array(items) => Token::List(items.into_iter().map(Token::from).collect()),
            Value::Object(entries) => Token::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Token::from(value)))
                    .collect(),
            ),
            other => Token::Literal(other),
        }
    }
}

impl<T: Into<Token>> From<Vec<T>> for Token {
    fn from(items: Vec<T>) -> Self {
        Token::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! literal_token_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Token {
                fn from(value: $ty) -> Self {
                    Token::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_token_from!(bool, i32, i64, u32, u64, f64);

/// Return the name inside `$name`, if the text has exactly that shape.
pub(crate) fn placeholder_name(text: &str) -> Option<&str> {
    let name = text.strip_prefix('$')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(name)
    } else {
        None
    }
}

/// Names a scenario declares, used to classify tokens.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    arguments: HashSet<String>,
    constants: HashMap<String, Value>,
}

impl Declarations {
    /// Empty declaration table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an argument name.
    pub fn with_argument(mut self, name: impl Into<String>) -> Self {
        self.arguments.insert(name.into());
        self
    }

    /// Declare a constant and its value.
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    /// Whether `name` is a declared argument.
    pub fn is_argument(&self, name: &str) -> bool {
        self.arguments.contains(name)
    }

    /// Value of a declared constant.
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }
}
