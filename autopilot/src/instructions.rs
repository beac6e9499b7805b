//! Route instructions
//!
//! A route is the ordered list of movement instructions supplied by the
//! client. Instructions are decoded leniently from the wire (the pilot's
//! route planner sends form text) and are immutable once a route is built.

use crate::error::{AutopilotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Movement kind of an instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstructionKind {
    /// Drive forward; value in meters
    Forward,
    /// Yaw left; value in degrees
    Left,
    /// Yaw right; value in degrees
    Right,
    /// Rise; value in meters
    Ascend,
    /// Sink; value in meters
    Descend,
    /// Any kind the engine does not know. Kept so it can be consumed from
    /// the queue without moving the vehicle.
    Unknown(String),
}

impl InstructionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Ascend => "ascend",
            Self::Descend => "descend",
            Self::Unknown(kind) => kind.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Unit of the instruction value
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Left | Self::Right => "deg",
            _ => "m",
        }
    }
}

impl From<String> for InstructionKind {
    fn from(kind: String) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "frw" | "forward" => Self::Forward,
            "left" => Self::Left,
            "right" => Self::Right,
            "ascend" => Self::Ascend,
            "descend" => Self::Descend,
            _ => Self::Unknown(kind),
        }
    }
}

impl From<InstructionKind> for String {
    fn from(kind: InstructionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single movement instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    /// Meters for Forward/Ascend/Descend, degrees for Left/Right
    pub value: f64,
}

impl Instruction {
    pub fn new(kind: InstructionKind, value: f64) -> Self {
        Self { kind, value }
    }

    pub fn forward(meters: f64) -> Self {
        Self::new(InstructionKind::Forward, meters)
    }

    pub fn left(degrees: f64) -> Self {
        Self::new(InstructionKind::Left, degrees)
    }

    pub fn right(degrees: f64) -> Self {
        Self::new(InstructionKind::Right, degrees)
    }

    pub fn ascend(meters: f64) -> Self {
        Self::new(InstructionKind::Ascend, meters)
    }

    pub fn descend(meters: f64) -> Self {
        Self::new(InstructionKind::Descend, meters)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.kind, self.value, self.kind.unit())
    }
}

// =============================================================================
// WIRE DECODING
// =============================================================================

/// Instruction exactly as the client sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireInstruction {
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    pub value: serde_json::Value,
}

impl WireInstruction {
    pub fn new(kind: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Parse an instruction value from a JSON number or numeric string
fn parse_value(value: &serde_json::Value) -> std::result::Result<f64, String> {
    let parsed = match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("value {} is not representable", n))?,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("value '{}' is not a number", s))?,
        other => return Err(format!("value {} is not a number", other)),
    };

    if !parsed.is_finite() {
        return Err(format!("value {} is not finite", parsed));
    }
    if parsed < 0.0 {
        return Err(format!("value {} is negative", parsed));
    }
    Ok(parsed)
}

impl TryFrom<(usize, &WireInstruction)> for Instruction {
    type Error = AutopilotError;

    fn try_from((index, wire): (usize, &WireInstruction)) -> Result<Self> {
        let value = parse_value(&wire.value)
            .map_err(|reason| AutopilotError::invalid_instruction(index, reason))?;
        Ok(Instruction::new(InstructionKind::from(wire.kind.clone()), value))
    }
}

// =============================================================================
// ROUTE
// =============================================================================

/// An ordered, client-supplied list of instructions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Route {
    instructions: Vec<Instruction>,
}

impl Route {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Decode a whole route; one bad instruction rejects the route
    pub fn from_wire(wire: &[WireInstruction]) -> Result<Self> {
        let instructions = wire
            .iter()
            .enumerate()
            .map(Instruction::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { instructions })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}
