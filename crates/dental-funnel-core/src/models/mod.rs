//! Domain models for the dental funnel system.

mod call_log;
mod callback;
mod consultation;
mod journey;
mod patient;
mod recall;

pub use call_log::*;
pub use callback::*;
pub use consultation::*;
pub use journey::*;
pub use patient::*;
pub use recall::*;

use thiserror::Error;

/// A string did not name any variant of a domain enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
