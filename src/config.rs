//! Staging configuration.
//!
//! Loaded from an optional TOML file:
//!
//! ```toml
//! memory_mb = 1024
//! autoreconfig_jar = "/var/vcap/packages/auto-reconfiguration-0.6.5.jar"
//!
//! [policy]
//! autoconfig_resource = "classpath:META-INF/cloud/custom-context.xml"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::StageError;
use crate::reconfig::policy::SERVLET_PLACEHOLDER;
use crate::reconfig::Policy;
use crate::script::DEFAULT_MEMORY_MB;

/// Jar file name used when the configuration names none
pub const DEFAULT_AUTORECONFIG_JAR: &str = "auto-reconfiguration.jar";

/// Settings for staging one or more applications
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// JVM heap size in megabytes
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,

    /// Auto-reconfiguration library copied into `WEB-INF/lib`
    #[serde(default = "default_autoreconfig_jar")]
    pub autoreconfig_jar: PathBuf,

    /// Overrides for the injected classes and resources
    #[serde(default)]
    pub policy: Policy,
}

fn default_memory_mb() -> u32 {
    DEFAULT_MEMORY_MB
}

fn default_autoreconfig_jar() -> PathBuf {
    PathBuf::from(DEFAULT_AUTORECONFIG_JAR)
}

impl Default for StagingConfig {
    fn default() -> Self {
        StagingConfig {
            memory_mb: default_memory_mb(),
            autoreconfig_jar: default_autoreconfig_jar(),
            policy: Policy::default(),
        }
    }
}

impl StagingConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, StageError> {
        let content = std::fs::read_to_string(path).map_err(|e| StageError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, StageError> {
        let config: StagingConfig = toml::from_str(content).map_err(|e| StageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the startup script cannot use
    pub fn validate(&self) -> Result<(), StageError> {
        if self.memory_mb == 0 {
            return Err(StageError::Config("memory_mb must be greater than zero".to_string()));
        }
        if !self.policy.default_servlet_location.contains(SERVLET_PLACEHOLDER) {
            return Err(StageError::Config(format!(
                "policy.default_servlet_location must contain {}",
                SERVLET_PLACEHOLDER
            )));
        }
        Ok(())
    }

    pub fn with_memory(mut self, memory_mb: u32) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn with_autoreconfig_jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.autoreconfig_jar = jar.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StagingConfig::from_toml("").unwrap();
        assert_eq!(config, StagingConfig::default());
        assert_eq!(config.memory_mb, 512);
    }

    #[test]
    fn test_full_file() {
        let config = StagingConfig::from_toml(
            r#"
memory_mb = 256
autoreconfig_jar = "/opt/jars/auto-reconfiguration-0.6.5.jar"

[policy]
default_root_location = "/WEB-INF/spring/root.xml"
"#,
        )
        .unwrap();
        assert_eq!(config.memory_mb, 256);
        assert_eq!(config.autoreconfig_jar, PathBuf::from("/opt/jars/auto-reconfiguration-0.6.5.jar"));
        assert_eq!(config.policy.default_root_location, "/WEB-INF/spring/root.xml");
        assert_eq!(config.policy.dispatcher_servlet_class, Policy::default().dispatcher_servlet_class);
    }

    #[test]
    fn test_zero_memory_rejected() {
        assert!(matches!(StagingConfig::from_toml("memory_mb = 0"), Err(StageError::Config(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(StagingConfig::from_toml("memory = 256"), Err(StageError::Config(_))));
    }

    #[test]
    fn test_servlet_location_needs_placeholder() {
        let err = StagingConfig::from_toml("[policy]\ndefault_servlet_location = \"/WEB-INF/servlet.xml\"");
        assert!(matches!(err, Err(StageError::Config(_))));
    }

    #[test]
    fn test_builder_overrides() {
        let config = StagingConfig::default().with_memory(1024).with_autoreconfig_jar("x.jar");
        assert_eq!(config.memory_mb, 1024);
        assert_eq!(config.autoreconfig_jar, PathBuf::from("x.jar"));
    }
}
