use thiserror::Error;

use crate::rule_set::RuleError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifeError {
    /// A coordinate (or a stepping request) needs a quadtree deeper than [`crate::MAX_LEVEL`].
    #[error("Level {level} exceeds the maximum quadtree level {max}", max = crate::MAX_LEVEL)]
    LevelOverflow { level: u32 },

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Step exponent {step} is larger than the maximum {max}")]
    InvalidStep { step: u8, max: u8 },

    #[error("Generation counter overflowed")]
    GenerationOverflow,

    #[error("Field coordinate lists differ in length: {xs} x values, {ys} y values")]
    FieldLengthMismatch { xs: usize, ys: usize },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
}
