//! Diagnostic codes with category prefixes for structured finding identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
///
/// Displayed as the prefix followed by a 3-digit number, e.g. `W101` for an
/// incompletely routed net or `H201` for an abandoned hold repair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Hard failures of a pass, prefixed with `E`.
    Error,
    /// Recoverable data problems, prefixed with `W`.
    Warning,
    /// Hold-repair outcomes, prefixed with `H`.
    Hold,
    /// Router outcomes, prefixed with `R`.
    Route,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Hold => 'H',
            Category::Route => 'R',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// A sink's fabric entry node is missing from the measured route.
    pub const NET_NOT_FULLY_ROUTED: Self = Self::new(Category::Warning, 101);
    /// A hold-risk connection could not be repaired.
    pub const REPAIR_ABANDONED: Self = Self::new(Category::Hold, 201);
    /// A failed repair left its sink without a route.
    pub const SINK_LEFT_UNROUTED: Self = Self::new(Category::Hold, 202);
    /// A carry-out driven net needs an alternate source that does not exist.
    pub const MISSING_ALTERNATE_SOURCE: Self = Self::new(Category::Error, 301);
    /// A committed resource cannot be resolved in the device model.
    pub const MODEL_CORRUPTION: Self = Self::new(Category::Error, 302);

    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
