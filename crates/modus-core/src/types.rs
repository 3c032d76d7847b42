//! Core types shared across the Modus framework.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Position of a named input or output block within the state-space model
/// input vector `u` or output vector `y`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoRange {
    pub name: String,
    pub range: Range<usize>,
}

impl IoRange {
    pub fn new<S: Into<String>>(name: S, range: Range<usize>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Find a block by name.
pub fn find_io<'a>(ios: &'a [IoRange], name: &str) -> Option<&'a IoRange> {
    ios.iter().find(|io| io.name == name)
}
