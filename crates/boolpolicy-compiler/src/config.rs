//! Configuration for the query compiler

use boolpolicy_engine::is_plain_identifier;
use serde::{Deserialize, Serialize};

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Allow `negate` on fields with several values. Such fields compile to the
    /// single "not-match" aggregate instead of failing as unsupported.
    #[serde(default)]
    pub negation_supported: bool,

    /// Upper bound on the number of rules a query may expand to
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,

    /// Package name written into the program header: dot-separated
    /// identifiers such as `policy.main`
    #[serde(default = "default_package")]
    pub package: String,

    /// Bound on path frames one evaluation may visit. Unset means unbounded.
    /// An evaluation that runs out of frames is logged as an invariant
    /// violation and reported as no match, so a bound trades missed
    /// violations for predictable latency.
    #[serde(default)]
    pub max_frames: Option<usize>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            negation_supported: false,
            max_rules: default_max_rules(),
            package: default_package(),
            max_frames: None,
        }
    }
}

fn default_max_rules() -> usize {
    4096
}

fn default_package() -> String {
    "policy.main".to_string()
}

impl CompilerConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CompilerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // BOOLPOLICY_MAX_RULES, BOOLPOLICY_NEGATION_SUPPORTED, ...
        builder = builder.add_source(config::Environment::with_prefix("BOOLPOLICY").try_parsing(true));

        let config: CompilerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the program text depends on.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !is_valid_package(&self.package) {
            return Err(config::ConfigError::Message(format!(
                "package {:?} must be dot-separated identifiers",
                self.package
            )));
        }
        if self.max_frames == Some(0) {
            return Err(config::ConfigError::Message(
                "max_frames must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuration with multi-value negation enabled
    pub fn with_negation() -> Self {
        Self {
            negation_supported: true,
            ..Default::default()
        }
    }
}

fn is_valid_package(package: &str) -> bool {
    package.split('.').all(is_plain_identifier)
}
