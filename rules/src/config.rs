use bon::bon;

/// Hard upper bound on distinct binding names per rule (binding slots are `u8`).
pub const MAX_BINDINGS_CAP: usize = u8::MAX as usize;

/// Limits and switches applied while compiling rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    /// Deepest allowed nesting of operation patterns (the root is depth 1).
    pub max_pattern_depth: usize,
    /// Maximum number of distinct names a rule may bind, capped at [`MAX_BINDINGS_CAP`].
    pub max_bindings: usize,
    /// Verify every operation a rewrite creates against its descriptor.
    pub verify_created_ops: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self { max_pattern_depth: 32, max_bindings: MAX_BINDINGS_CAP, verify_created_ops: true }
    }
}

#[bon]
impl CompileConfig {
    #[builder]
    pub fn new(
        #[builder(default = 32)] max_pattern_depth: usize,
        #[builder(default = MAX_BINDINGS_CAP)] max_bindings: usize,
        #[builder(default = true)] verify_created_ops: bool,
    ) -> Self {
        Self { max_pattern_depth, max_bindings: max_bindings.min(MAX_BINDINGS_CAP), verify_created_ops }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `DRR_MAX_PATTERN_DEPTH` - Maximum pattern depth (default: 32)
    /// * `DRR_MAX_BINDINGS` - Maximum bound names per rule (default and cap: 255)
    /// * `DRR_NO_VERIFY` - Skip verification of created operations if set
    pub fn from_env() -> Self {
        let max_pattern_depth = std::env::var("DRR_MAX_PATTERN_DEPTH").ok().and_then(|s| s.parse().ok()).unwrap_or(32);
        let max_bindings =
            std::env::var("DRR_MAX_BINDINGS").ok().and_then(|s| s.parse().ok()).unwrap_or(MAX_BINDINGS_CAP);
        let verify_created_ops = std::env::var("DRR_NO_VERIFY").is_err();

        Self::builder()
            .max_pattern_depth(max_pattern_depth)
            .max_bindings(max_bindings)
            .verify_created_ops(verify_created_ops)
            .build()
    }
}
