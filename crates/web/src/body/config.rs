/// How `application/x-www-form-urlencoded` bodies are turned into values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FormMode {
    /// Flat keys with string values; `a[b]=1` stays the key `"a[b]"`.
    #[default]
    Simple,
    /// Bracket notation builds nested objects and arrays: `a[b]=1` is `{"a": {"b": "1"}}`.
    Extended,
}

/// Limits and decoding options applied to every request body.
///
/// ```
/// use ingest_web::body::{BodyConfig, FormMode};
///
/// let config = BodyConfig::builder().limit(1024 * 1024).form_mode(FormMode::Extended).build();
/// assert_eq!(config.limit(), 1024 * 1024);
/// assert!(config.strict());
/// ```
#[derive(Debug, Clone)]
pub struct BodyConfig {
    limit: usize,
    strict: bool,
    form_mode: FormMode,
    parameter_limit: usize,
    inflate: bool,
}

impl BodyConfig {
    pub const DEFAULT_LIMIT: usize = 100 * 1024;
    pub const DEFAULT_PARAMETER_LIMIT: usize = 1000;

    pub fn builder() -> BodyConfigBuilder {
        BodyConfigBuilder { config: Self::default() }
    }

    /// Maximum body size in bytes, both on the wire and after inflation.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether JSON bodies must be an object or an array at the top level.
    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn form_mode(&self) -> FormMode {
        self.form_mode
    }

    /// Maximum number of `key=value` pairs in a form body.
    pub fn parameter_limit(&self) -> usize {
        self.parameter_limit
    }

    /// Whether gzip, deflate and br bodies are inflated before decoding.
    pub fn inflate(&self) -> bool {
        self.inflate
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            strict: true,
            form_mode: FormMode::Simple,
            parameter_limit: Self::DEFAULT_PARAMETER_LIMIT,
            inflate: true,
        }
    }
}

#[derive(Debug)]
pub struct BodyConfigBuilder {
    config: BodyConfig,
}

impl BodyConfigBuilder {
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn form_mode(mut self, form_mode: FormMode) -> Self {
        self.config.form_mode = form_mode;
        self
    }

    pub fn parameter_limit(mut self, parameter_limit: usize) -> Self {
        self.config.parameter_limit = parameter_limit;
        self
    }

    pub fn inflate(mut self, inflate: bool) -> Self {
        self.config.inflate = inflate;
        self
    }

    pub fn build(self) -> BodyConfig {
        self.config
    }
}
