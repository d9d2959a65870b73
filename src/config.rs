use std::time::Duration;

#[cfg(not(feature = "constrained"))]
const DEFAULT_CHUNK_SIZE: usize = 4096;
#[cfg(feature = "constrained")]
const DEFAULT_CHUNK_SIZE: usize = 256;

/// Knobs for a [`crate::Tokenizer`].
///
/// ```
/// use std::time::Duration;
/// use htmlfeed::TokenizerConfig;
///
/// let config = TokenizerConfig {
///     time_budget: Duration::from_millis(50),
///     ..TokenizerConfig::default()
/// };
/// assert!(config.scripting_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// How many scanning steps to take between two looks at the clock.
    pub chunk_size: usize,
    /// How long a single write may run before the tokenizer yields. `Duration::ZERO` yields at
    /// every check.
    pub time_budget: Duration,
    /// Keep the source text as literal as possible: tag and attribute names keep their case,
    /// character references are not decoded, `<!foo>` tags are reported and scripts never run.
    pub view_source: bool,
    /// The input is a fragment (e.g. `innerHTML`). Scripts never run or load.
    pub fragment: bool,
    /// Whether scripts are executed and external scripts requested at all.
    pub scripting_enabled: bool,
    /// Treat every diagnostic as fatal.
    pub strict: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        TokenizerConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            time_budget: Duration::from_millis(500),
            view_source: false,
            fragment: false,
            scripting_enabled: true,
            strict: false,
        }
    }
}

impl TokenizerConfig {
    pub(crate) fn may_run_scripts(&self) -> bool {
        self.scripting_enabled && !self.fragment && !self.view_source
    }
}
