//! Core domain types for Ignite.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The scheduler, the configuration layer and the CLI all speak in these types.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod item;
mod phase;
mod state;

pub use item::{DEFAULT_ITEM_TIMEOUT, ItemKey, QueueItem};
pub use phase::Phase;
pub use state::{MissingMethodPolicy, SchedulerState};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must not be empty")]
pub struct EmptyIdentifierError {
    kind: &'static str,
}

impl EmptyIdentifierError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

fn non_empty(value: String, kind: &'static str) -> Result<String, EmptyIdentifierError> {
    if value.trim().is_empty() {
        Err(EmptyIdentifierError { kind })
    } else {
        Ok(value)
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdentifierError> {
                non_empty(value.into(), $kind).map(Self)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = EmptyIdentifierError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier a resolver maps to a live component instance (e.g. "database").
    TargetId,
    "target identifier"
);

identifier!(
    /// Name of a startup method exposed by a component (e.g. "connect").
    MethodName,
    "method name"
);

identifier!(
    /// Identity of a scheduler; registration sources may scope items by it.
    SchedulerId,
    "scheduler id"
);
