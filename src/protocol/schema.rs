//! Message schema definitions
//!
//! A schema ("order") names an arbitration id and an ordered list of
//! fixed-width parameters. Parameter order fixes the payload layout.

use std::fmt;

/// Wire type of a single parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// One UTF-8 code unit on decode; encode writes the whole argument string
    Char,
    Int8,
    Int16,
    Int32,
}

impl ParameterType {
    /// Parse a type token from the schema file or the `add` order.
    ///
    /// Unrecognized tokens fall back to `Char`, matching the established
    /// schema files in the field.
    pub fn from_token(token: &str) -> Self {
        match token {
            "i8" => ParameterType::Int8,
            "i16" => ParameterType::Int16,
            "i32" => ParameterType::Int32,
            _ => ParameterType::Char,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            ParameterType::Char => "c",
            ParameterType::Int8 => "i8",
            ParameterType::Int16 => "i16",
            ParameterType::Int32 => "i32",
        }
    }

    /// Declared width in bytes
    pub fn width(&self) -> usize {
        match self {
            ParameterType::Char | ParameterType::Int8 => 1,
            ParameterType::Int16 => 2,
            ParameterType::Int32 => 4,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// A named parameter slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDef {
    pub name: String,
    pub kind: ParameterType,
    /// Type token as written by the operator; unknown tokens are kept verbatim
    token: String,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            token: kind.as_token().to_string(),
        }
    }

    /// Build from a type token, keeping the token for write-back
    pub fn from_token(name: impl Into<String>, token: &str) -> Self {
        Self {
            name: name.into(),
            kind: ParameterType::from_token(token),
            token: token.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for ParameterDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.token)
    }
}

/// A registered message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    /// Unique order name
    pub name: String,
    /// Arbitration id used for both sending and lookup on receive
    pub id: u32,
    /// Parameters in payload order
    pub parameters: Vec<ParameterDef>,
}

impl MessageType {
    pub fn new(name: impl Into<String>, id: u32, parameters: Vec<ParameterDef>) -> Self {
        Self {
            name: name.into(),
            id,
            parameters,
        }
    }

    /// Sum of the declared parameter widths
    pub fn payload_width(&self) -> usize {
        self.parameters.iter().map(|p| p.kind.width()).sum()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id={} [", self.name, self.id)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str("]")
    }
}
