//! Model registry: the enumerated set of supported models and validated
//! model selection.
//!
//! The supported set is fixed at build time; it is never queried from the
//! backend. Selection is validated at construction, so an unvalidated
//! [`ModelSelection`] cannot exist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A model identifier from the supported set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Qwen 1.8B.
    #[serde(rename = "qwen:1.8b")]
    Qwen1_8b,

    /// Gemma 2 2B.
    #[serde(rename = "gemma2:2b")]
    Gemma2_2b,

    /// Llama 3.2 1B.
    #[serde(rename = "llama3.2:1b")]
    Llama32_1b,

    /// Phi-3 Mini.
    #[serde(rename = "phi3:mini")]
    Phi3Mini,

    /// TinyLlama 1.1B.
    #[serde(rename = "tinyllama:1.1b")]
    TinyLlama1_1b,
}

impl KnownModel {
    /// Returns every supported model, in a stable order.
    pub fn all() -> &'static [KnownModel] {
        &[
            KnownModel::Qwen1_8b,
            KnownModel::Gemma2_2b,
            KnownModel::Llama32_1b,
            KnownModel::Phi3Mini,
            KnownModel::TinyLlama1_1b,
        ]
    }

    /// Returns the backend identifier for this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Qwen1_8b => "qwen:1.8b",
            KnownModel::Gemma2_2b => "gemma2:2b",
            KnownModel::Llama32_1b => "llama3.2:1b",
            KnownModel::Phi3Mini => "phi3:mini",
            KnownModel::TinyLlama1_1b => "tinyllama:1.1b",
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        KnownModel::all()
            .iter()
            .find(|model| model.as_str() == s)
            .copied()
            .ok_or_else(|| Error::model_not_found(s))
    }
}

/// A validated model selection: a supported model plus its generation
/// parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSelection {
    model: KnownModel,
    parameters: Map<String, Value>,
}

impl ModelSelection {
    /// Selects a model by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] when `name` is not in the supported
    /// set.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            model: name.parse()?,
            parameters: Map::new(),
        })
    }

    /// Selects a model by identifier with initial generation parameters.
    pub fn with_parameters(name: &str, parameters: Map<String, Value>) -> Result<Self> {
        Ok(Self {
            model: name.parse()?,
            parameters,
        })
    }

    /// Returns the selected model.
    pub fn model(&self) -> KnownModel {
        self.model
    }

    /// Returns the current generation parameters.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Merges `parameters` into the current parameter map, overwriting on
    /// key collision.
    pub fn update_parameters(&mut self, parameters: Map<String, Value>) {
        for (key, value) in parameters {
            self.parameters.insert(key, value);
        }
    }
}
