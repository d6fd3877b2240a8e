//! Generated test cases and groups

use serde::Serialize;

/// Expression and receiver for one runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Side {
    /// Expression to evaluate, arguments already substituted
    pub expr: String,
    /// Receiver bound as `self` before evaluation
    pub receiver: Option<String>,
}

/// One fully resolved comparison test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    /// Derived name (category prefix + method or sanitized expression)
    pub name: String,
    pub reference: Side,
    pub target: Side,
    pub ret_type: Option<String>,
    pub self_type: Option<String>,
}

/// All cases sharing a derived name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestGroup {
    pub name: String,
    pub cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn new(name: impl Into<String>, cases: Vec<TestCase>) -> Self {
        Self {
            name: name.into(),
            cases,
        }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Consecutive slices of at most `size` cases (`size` of 0 is treated as 1)
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = &[TestCase]> {
        self.cases.chunks(size.max(1))
    }
}
