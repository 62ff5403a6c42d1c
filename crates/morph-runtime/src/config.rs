//! Runtime configuration loaded from `morph.toml`.
//!
//! Every field has a default, so an absent or partial file is fine. The file
//! is the tuning surface for embedders: default timing, the scheduler's
//! slice budget ceiling, and whether the background worker is used at all.

use serde::{Deserialize, Serialize};
use std::path::Path;

use morph_core::easing::EasingFunction;

use crate::error::EngineError;

/// Top-level configuration for the morph runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MorphConfig {
    pub animation: AnimationConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
}

/// Default timing applied when the caller specifies none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Total runtime of one invocation in milliseconds.
    pub duration_ms: f64,
    /// Default easing for synthesized keyframes.
    pub easing: EasingFunction,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 400.0,
            easing: EasingFunction::Ease,
        }
    }
}

/// Cooperative scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on one work slice in milliseconds. The effective deadline
    /// is the smaller of this and half the measured frame interval.
    pub slice_budget_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { slice_budget_ms: 5.0 }
    }
}

/// Background worker tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// When false, diff/synthesis run inline on the calling context.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MorphConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load `morph.toml` from the working directory, falling back to defaults
    /// when it does not exist.
    pub fn load_or_default() -> Self {
        let path = Path::new("morph.toml");
        if path.exists() {
            Self::load(path).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MorphConfig::default();
        assert_eq!(config.animation.duration_ms, 400.0);
        assert_eq!(config.animation.easing, EasingFunction::Ease);
        assert_eq!(config.scheduler.slice_budget_ms, 5.0);
        assert!(config.worker.enabled);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[animation]\nduration_ms = 800.0").expect("write");

        let config = MorphConfig::load(file.path()).expect("load");
        assert_eq!(config.animation.duration_ms, 800.0);
        assert_eq!(config.animation.easing, EasingFunction::Ease);
        assert!(config.worker.enabled);
    }

    #[test]
    fn test_full_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[animation]
duration_ms = 250.0

[animation.easing]
type = "ease_in_out"

[scheduler]
slice_budget_ms = 8.0

[worker]
enabled = false
"#
        )
        .expect("write");

        let config = MorphConfig::load(file.path()).expect("load");
        assert_eq!(config.animation.duration_ms, 250.0);
        assert_eq!(config.animation.easing, EasingFunction::EaseInOut);
        assert_eq!(config.scheduler.slice_budget_ms, 8.0);
        assert!(!config.worker.enabled);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = MorphConfig::load(Path::new("/nonexistent/morph.toml"));
        assert!(matches!(err, Err(EngineError::Config(_))));
    }
}
