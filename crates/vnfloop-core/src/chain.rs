//! Service chains and the per-function parameters they reference.

use std::collections::BTreeMap;

use crate::template::TemplateError;

/// Chain names.
pub type SfcName = String;

/// Service function names.
pub type SfName = String;

/// Per-function parameters, keyed by function name.
pub type ServiceFunctions = BTreeMap<SfName, FunctionSpec>;

/// An ordered sequence of service functions. The order is the processing order.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct ServiceChain {
    pub name: SfcName,
    pub functions: Vec<SfName>,
}

impl ServiceChain {
    /// The function every flow of this chain requests first.
    pub fn first(&self) -> Option<&str> {
        self.functions.first().map(String::as_str)
    }

    /// Checks that the chain is non-empty and that every function has parameters in `functions`.
    pub fn validate(&self, functions: &ServiceFunctions) -> Result<(), TemplateError> {
        if self.functions.is_empty() {
            return Err(TemplateError::EmptyChain(self.name.clone()));
        }
        match self.functions.iter().find(|f| !functions.contains_key(*f)) {
            Some(missing) => Err(TemplateError::MissingFunction(missing.clone())),
            None => Ok(()),
        }
    }

    /// Mean of the chain functions' mean processing delays.
    pub fn mean_processing_delay(
        &self,
        functions: &ServiceFunctions,
    ) -> Result<f64, TemplateError> {
        self.validate(functions)?;
        let total = self
            .functions
            .iter()
            .map(|f| functions[f].processing_delay_mean)
            .sum::<f64>();
        Ok(total / self.functions.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionSpec {
    pub processing_delay_mean: f64,
    #[serde(default)]
    pub processing_delay_stdev: f64,
}

impl FunctionSpec {
    pub fn with_mean(processing_delay_mean: f64) -> Self {
        Self {
            processing_delay_mean,
            processing_delay_stdev: 0.0,
        }
    }
}
