//! Parse options.

/// Configuration snapshot for a single parse.
///
/// The default is the lenient HTML4 mode: recover from every error and
/// record it as a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep parsing after a diagnostic. When false, the first diagnostic aborts.
    pub recover: bool,
    /// Wrap bare top-level text that follows block content in an implied `<p>`.
    pub legacy_paragraph_wrap: bool,
    /// Drop whitespace-only text nodes.
    pub noblanks: bool,
    /// Lift the nesting depth limit.
    pub huge: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recover: true,
            legacy_paragraph_wrap: false,
            noblanks: false,
            huge: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default HTML options.
    pub fn default_html() -> Self {
        Self::default()
    }

    /// Fail on the first diagnostic.
    pub fn strict(mut self) -> Self {
        self.recover = false;
        self
    }

    /// Alias of [`ParseOptions::strict`].
    pub fn norecover(self) -> Self {
        self.strict()
    }

    pub fn recover(mut self) -> Self {
        self.recover = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        !self.recover
    }

    pub fn set_recover(&mut self, recover: bool) {
        self.recover = recover;
    }

    pub fn with_legacy_paragraph_wrap(mut self, enabled: bool) -> Self {
        self.legacy_paragraph_wrap = enabled;
        self
    }

    pub fn noblanks(mut self) -> Self {
        self.noblanks = true;
        self
    }

    pub fn huge(mut self) -> Self {
        self.huge = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_lenient() {
        let options = ParseOptions::default();
        assert!(options.recover);
        assert!(!options.is_strict());
        assert!(!options.legacy_paragraph_wrap);
    }

    #[test]
    fn test_strict_toggles() {
        assert!(ParseOptions::default_html().norecover().is_strict());
        assert!(ParseOptions::new().strict().is_strict());
        assert!(!ParseOptions::new().strict().recover().is_strict());

        let mut options = ParseOptions::new();
        options.set_recover(false);
        assert!(options.is_strict());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let base = ParseOptions::new();
        let strict = base.strict();
        assert!(!base.is_strict());
        assert!(strict.is_strict());
    }
}
