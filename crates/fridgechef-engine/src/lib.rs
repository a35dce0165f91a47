pub mod config;
pub mod providers;
pub mod request;
pub mod worker;

use std::time::Instant;

use anyhow::{bail, Result};
use fridgechef_contracts::errors::RecipeError;
use fridgechef_contracts::events::{EventLog, SessionEvent};
use fridgechef_contracts::image::ImagePayload;
use fridgechef_contracts::models::{Fallback, ModelCatalog, ModelChoice, ModelSpec};
use fridgechef_contracts::recipes::{validate_response, Recipe, ValidatedResponse};
use fridgechef_contracts::session::RequestId;

pub use config::EngineConfig;
pub use providers::{default_provider_registry, RecipeProvider, RecipeProviderRegistry};
pub use request::{build_recipe_request, RecipeRequest};
pub use worker::{FetchCompletion, FetchHandle, FetchSlot, FetchWorker};

/// Builds recipe requests, sends them to the chosen provider and validates answers.
///
/// Every fetch is logged to the session's event stream; validation failures and
/// transport failures are told apart by the `kind` field.
pub struct RecipeEngine {
    events: EventLog,
    providers: RecipeProviderRegistry,
    choice: ModelChoice,
}

impl RecipeEngine {
    pub fn new(config: EngineConfig, events: EventLog) -> Result<Self> {
        let providers = default_provider_registry(&config);
        Self::with_parts(&config, events, ModelCatalog::default(), providers)
    }

    pub fn with_parts(
        config: &EngineConfig,
        events: EventLog,
        catalog: ModelCatalog,
        providers: RecipeProviderRegistry,
    ) -> Result<Self> {
        let choice = catalog.resolve(config.model.as_deref())?;
        if providers.get(&choice.model.provider).is_none() {
            bail!(
                "no provider registered for '{}' (known: {})",
                choice.model.provider,
                providers.names().join(", ")
            );
        }

        events.record(&SessionEvent::ModelSelected {
            model: choice.model.name.clone(),
            provider: choice.model.provider.clone(),
            fallback_reason: choice.fallback.as_ref().map(ToString::to_string),
        })?;

        Ok(Self {
            events,
            providers,
            choice,
        })
    }

    pub fn model(&self) -> &ModelSpec {
        &self.choice.model
    }

    /// Set when the user named a model that is not in the catalog.
    pub fn model_warning(&self) -> Option<&Fallback> {
        self.choice.warning()
    }

    pub fn event_log(&self) -> EventLog {
        self.events.clone()
    }

    pub fn build_request(&self, image: ImagePayload, filters: &[String]) -> RecipeRequest {
        build_recipe_request(&self.choice.model.name, image, filters)
    }

    /// One blocking round trip: build, send, validate.
    pub fn fetch_recipes(
        &self,
        request_id: RequestId,
        image: ImagePayload,
        filters: &[String],
    ) -> Result<Vec<Recipe>, RecipeError> {
        let request = self.build_request(image, filters);
        self.log(SessionEvent::RecipesRequested {
            request_id,
            model: request.model.clone(),
            provider: self.choice.model.provider.clone(),
            filters: filters.to_vec(),
            image_mime: request.image.mime_type().to_string(),
            image_bytes: request.image.decoded_len(),
        });

        let started = Instant::now();
        let result = self
            .providers
            .get(&self.choice.model.provider)
            .ok_or_else(|| {
                RecipeError::fetch(format!(
                    "provider '{}' is not registered",
                    self.choice.model.provider
                ))
            })
            .and_then(|provider| provider.complete(&request))
            .and_then(|raw| validate_response(&raw));
        let latency_s = started.elapsed().as_secs_f64();

        match result {
            Ok(ValidatedResponse::Recipes(recipes)) if recipes.is_empty() => {
                self.log(SessionEvent::RecipesEmptyResult {
                    request_id,
                    reason: "model returned an empty array".to_string(),
                    latency_s,
                });
                Ok(recipes)
            }
            Ok(ValidatedResponse::Recipes(recipes)) => {
                self.log(SessionEvent::RecipesReceived {
                    request_id,
                    count: recipes.len(),
                    latency_s,
                });
                Ok(recipes)
            }
            Ok(ValidatedResponse::EmptyResult { reason }) => {
                self.log(SessionEvent::RecipesEmptyResult {
                    request_id,
                    reason,
                    latency_s,
                });
                Ok(Vec::new())
            }
            Err(err) => {
                self.log_failure(request_id, &err, latency_s);
                Err(err)
            }
        }
    }

    pub(crate) fn log_failure(&self, request_id: RequestId, err: &RecipeError, latency_s: f64) {
        self.log(SessionEvent::RecipesFetchFailed {
            request_id,
            kind: err.kind(),
            message: err.message().to_string(),
            latency_s,
        });
    }

    // Logging must never turn a good fetch into a failed one.
    pub(crate) fn log(&self, event: SessionEvent) {
        if let Err(err) = self.events.record(&event) {
            eprintln!("fridgechef: failed to log event: {err:#}");
        }
    }
}
