//! Error types for the ability engine

use thiserror::Error;

use crate::ability::AbilityId;

/// Errors raised by catalog lookups and slot management.
///
/// Gameplay refusals are not errors; they are reported through
/// [`crate::precondition::Refusal`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbilityError {
    #[error("unknown ability: {0}")]
    UnknownAbility(String),

    #[error("invalid ability slot: {0:?}")]
    InvalidSlot(char),

    #[error("no catalog entry for {0:?}")]
    MissingDefinition(AbilityId),

    #[error("aimed ability {0:?} has no targeter")]
    MissingTargeter(AbilityId),
}

pub type Result<T> = std::result::Result<T, AbilityError>;
