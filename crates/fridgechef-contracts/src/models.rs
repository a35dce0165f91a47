use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

/// A model that can turn a fridge photo into recipes, and the provider that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
        }
    }
}

/// Why the resolved model is not the one the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    NotRequested,
    Unknown { requested: String, known: Vec<String> },
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => f.write_str("No model specified; using the default."),
            Self::Unknown { requested, known } => write!(
                f,
                "Model '{requested}' is not available (known: {}); using the default.",
                known.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    pub model: ModelSpec,
    pub fallback: Option<Fallback>,
}

impl ModelChoice {
    /// Only an unknown name is worth telling the user about.
    pub fn warning(&self) -> Option<&Fallback> {
        self.fallback
            .as_ref()
            .filter(|fallback| matches!(fallback, Fallback::Unknown { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("no recipe models are configured")]
    EmptyCatalog,
}

/// Ordered set of recipe models. The first entry is the default.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::from_specs([
            ModelSpec::new("gemini-2.5-flash", "gemini"),
            ModelSpec::new("gemini-2.5-pro", "gemini"),
            ModelSpec::new("gemini-2.0-flash", "gemini"),
            ModelSpec::new("dryrun-recipes-1", "dryrun"),
        ])
    }
}

impl ModelCatalog {
    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            models: specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim())
    }

    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Picks `requested` when known, otherwise the default with the reason recorded.
    /// Blank requests count as no request.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ModelChoice, ModelError> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        if let Some(model) = requested.and_then(|name| self.get(name)) {
            return Ok(ModelChoice {
                model: model.clone(),
                fallback: None,
            });
        }
        let (_, default) = self.models.first().ok_or(ModelError::EmptyCatalog)?;
        let fallback = match requested {
            Some(name) => Fallback::Unknown {
                requested: name.to_string(),
                known: self.names(),
            },
            None => Fallback::NotRequested,
        };
        Ok(ModelChoice {
            model: default.clone(),
            fallback: Some(fallback),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Fallback, ModelCatalog, ModelError, ModelSpec};

    #[test]
    fn known_model_is_used_as_is() -> Result<(), ModelError> {
        let choice = ModelCatalog::default().resolve(Some(" gemini-2.5-pro "))?;
        assert_eq!(choice.model, ModelSpec::new("gemini-2.5-pro", "gemini"));
        assert_eq!(choice.fallback, None);
        assert_eq!(choice.warning(), None);
        Ok(())
    }

    #[test]
    fn unknown_model_falls_back_and_lists_known_names() -> Result<(), ModelError> {
        let catalog = ModelCatalog::from_specs([
            ModelSpec::new("local", "dryrun"),
            ModelSpec::new("other", "dryrun"),
        ]);
        let choice = catalog.resolve(Some("gpt-image-1"))?;
        assert_eq!(choice.model.name, "local");
        let warning = choice.warning().map(ToString::to_string);
        assert_eq!(
            warning.as_deref(),
            Some("Model 'gpt-image-1' is not available (known: local, other); using the default.")
        );
        Ok(())
    }

    #[test]
    fn missing_or_blank_request_uses_default_quietly() -> Result<(), ModelError> {
        for requested in [None, Some("   ")] {
            let choice = ModelCatalog::default().resolve(requested)?;
            assert_eq!(choice.model.name, "gemini-2.5-flash");
            assert_eq!(choice.fallback, Some(Fallback::NotRequested));
            assert_eq!(choice.warning(), None);
        }
        Ok(())
    }

    #[test]
    fn empty_catalog_is_an_error() {
        let catalog = ModelCatalog::from_specs(Vec::<ModelSpec>::new());
        assert_eq!(catalog.resolve(Some("gemini-2.5-flash")), Err(ModelError::EmptyCatalog));
    }

    #[test]
    fn default_catalog_includes_offline_model() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.names()[0], "gemini-2.5-flash");
        assert_eq!(
            catalog.get("dryrun-recipes-1").map(|spec| spec.provider.as_str()),
            Some("dryrun")
        );
    }
}
