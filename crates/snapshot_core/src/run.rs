use std::fmt;

pub type JobId = u64;

/// Token identifying one task invocation.
///
/// Every render request carries the id of the run that issued it, and the
/// pipeline drops events tagged with any other id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Run id derived from a wall-clock timestamp in milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
