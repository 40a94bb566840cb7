//! Quarantine reason taxonomy.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Why an input unit was routed to review.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    /// Every ladder rung scored below its cutoff.
    PassExhausted,
    /// Extension is not handled (or is review-only).
    UnsupportedExtension,
    /// Scratch free space was below the configured floor.
    LowScratchSpace,
    /// A required external tool is missing.
    CapabilityUnavailable,
    /// A pass exceeded its soft timeout.
    Timeout,
    /// A capability errored on the input.
    CorruptInput,
}

impl ReasonCode {
    /// Manifest string for this reason.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Ranking used to pick the reported reason when several rungs failed
    /// differently. Higher wins.
    pub fn severity(&self) -> u8 {
        match self {
            ReasonCode::PassExhausted => 0,
            ReasonCode::Timeout => 1,
            ReasonCode::CorruptInput => 2,
            ReasonCode::CapabilityUnavailable => 3,
            ReasonCode::UnsupportedExtension => 4,
            ReasonCode::LowScratchSpace => 5,
        }
    }

    /// Whether the escalation ladder must stop immediately on this reason.
    pub fn aborts_ladder(&self) -> bool {
        matches!(self, ReasonCode::LowScratchSpace)
    }
}
