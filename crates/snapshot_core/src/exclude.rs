use regex::Regex;

/// Compiled `rexclude` pattern. Locations matching it are skipped at every level.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    pattern: Option<Regex>,
}

impl ExclusionFilter {
    /// Filter that keeps every location.
    pub fn none() -> Self {
        Self::default()
    }

    /// An empty pattern excludes nothing, matching the unset option.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        if pattern.is_empty() {
            return Ok(Self::none());
        }
        Ok(Self {
            pattern: Some(Regex::new(pattern)?),
        })
    }

    pub fn excludes(&self, location: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(location))
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }
}
