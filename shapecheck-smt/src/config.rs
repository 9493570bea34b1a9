#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtProfile {
    /// Very low timeouts.
    Fast,
    /// CI-friendly medium timeouts.
    Ci,
    /// Higher timeouts.
    Thorough,
}

impl SmtProfile {
    pub fn timeout_ms(self) -> u64 {
        match self {
            SmtProfile::Fast => 50,
            SmtProfile::Ci => 250,
            SmtProfile::Thorough => 2_000,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("invalid solver configuration: {message}")]
#[diagnostic(code(shapecheck::smt::config))]
pub struct ConfigError {
    pub message: String,
}

/// Solver environment settings, applied when a context is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtConfig {
    /// Enable model generation.
    #[serde(default = "default_true")]
    pub model: bool,

    /// Enable proof generation.
    #[serde(default = "default_true")]
    pub proof: bool,

    /// Per-check timeout handed to Z3 as the `timeout` parameter.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Add well-formedness side conditions (non-negative dims, in-range offsets)
    /// when lowering shape facts.
    #[serde(default = "default_true")]
    pub shape_axioms: bool,

    /// Extra parameters passed through to Z3 verbatim.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for SmtConfig {
    fn default() -> Self {
        Self {
            model: true,
            proof: true,
            timeout_ms: None,
            shape_axioms: true,
            params: BTreeMap::new(),
        }
    }
}

impl SmtConfig {
    pub fn from_profile(profile: SmtProfile) -> Self {
        Self {
            timeout_ms: Some(profile.timeout_ms()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError {
            message: e.to_string(),
        })
    }

    /// All parameters as Z3 expects them, in a stable order.
    pub fn z3_params(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("model".to_string(), self.model.to_string()),
            ("proof".to_string(), self.proof.to_string()),
        ];
        if let Some(ms) = self.timeout_ms {
            out.push(("timeout".to_string(), ms.to_string()));
        }
        out.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}
