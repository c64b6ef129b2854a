//! Workflow stages of a PLC programming session.
//!
//! Stages run strictly forward under automatic control:
//! `GatheringRequirements` → `CodeGeneration` → `RefinementTesting`.
//! Only an explicit caller override may move backwards or skip ahead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// One phase of the three-phase copilot workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Collecting requirements through focused questions.
    GatheringRequirements,

    /// Producing Structured Text from the gathered context.
    CodeGeneration,

    /// Iterating on generated code. Accepts calls indefinitely.
    RefinementTesting,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Stage; 3] = [
        Stage::GatheringRequirements,
        Stage::CodeGeneration,
        Stage::RefinementTesting,
    ];

    /// Position of the stage in the workflow, starting at zero.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::GatheringRequirements => 0,
            Self::CodeGeneration => 1,
            Self::RefinementTesting => 2,
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::GatheringRequirements => Some(Self::CodeGeneration),
            Self::CodeGeneration => Some(Self::RefinementTesting),
            Self::RefinementTesting => None,
        }
    }

    /// Wire name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GatheringRequirements => "gathering_requirements",
            Self::CodeGeneration => "code_generation",
            Self::RefinementTesting => "refinement_testing",
        }
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GatheringRequirements => "Requirements Gathering",
            Self::CodeGeneration => "Code Generation",
            Self::RefinementTesting => "Refinement & Testing",
        }
    }

    /// True if this stage comes earlier in the workflow than `other`.
    pub fn is_before(&self, other: &Self) -> bool {
        self.ordinal() < other.ordinal()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::GatheringRequirements
    }
}

impl StateMachine for Stage {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.next() == Some(*target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        self.next().into_iter().collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("stage", format!("unknown stage '{}'", s)))
    }
}
