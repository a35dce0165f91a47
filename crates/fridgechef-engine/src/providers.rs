use std::collections::BTreeMap;
use std::time::Duration;

use fridgechef_contracts::errors::RecipeError;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::request::RecipeRequest;

/// A backend that turns a [`RecipeRequest`] into the model's raw answer text.
pub trait RecipeProvider: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &RecipeRequest) -> Result<String, RecipeError>;
}

#[derive(Default)]
pub struct RecipeProviderRegistry {
    providers: BTreeMap<String, Box<dyn RecipeProvider>>,
}

impl RecipeProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: RecipeProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn RecipeProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_provider_registry(config: &EngineConfig) -> RecipeProviderRegistry {
    let mut providers = RecipeProviderRegistry::new();
    providers.register(DryrunProvider);
    providers.register(GeminiProvider::new(config));
    providers
}

/// Offline provider with a fixed answer. Filter names are worked into the recipe
/// names so the local filter keeps them.
pub struct DryrunProvider;

impl RecipeProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn complete(&self, request: &RecipeRequest) -> Result<String, RecipeError> {
        let prefix = if request.filters.is_empty() {
            String::new()
        } else {
            format!("{} ", request.filters.join(" "))
        };
        let recipes = json!([
            {
                "recipeName": format!("{prefix}Garden Vegetable Stir-Fry"),
                "difficulty": "Easy",
                "prepTime": "20 minutes",
                "calories": "380 kcal",
                "ingredients": [
                    {"name": "bell pepper", "quantity": "1"},
                    {"name": "broccoli", "quantity": "1 head"},
                    {"name": "carrots", "quantity": "2"}
                ],
                "steps": [
                    "Slice the vegetables into bite-sized pieces.",
                    "Stir-fry on high heat for 6 minutes.",
                    "Season with soy sauce and serve over rice."
                ],
                "missingIngredients": ["soy sauce", "rice"]
            },
            {
                "recipeName": format!("{prefix}Roasted Tomato Soup"),
                "difficulty": "Medium",
                "prepTime": "45 minutes",
                "calories": "290 kcal",
                "ingredients": [
                    {"name": "tomatoes", "quantity": "8"},
                    {"name": "onion", "quantity": "1"},
                    {"name": "garlic", "quantity": "3 cloves"}
                ],
                "steps": [
                    "Roast the tomatoes, onion and garlic for 30 minutes.",
                    "Blend until smooth.",
                    "Simmer with stock and season to taste."
                ],
                "missingIngredients": ["vegetable stock"]
            },
            {
                "recipeName": format!("{prefix}Crispy Chickpea Salad"),
                "difficulty": "Hard",
                "prepTime": "35 minutes",
                "calories": "450 kcal",
                "ingredients": [
                    {"name": "chickpeas", "quantity": "1 can"},
                    {"name": "cucumber", "quantity": "1"},
                    {"name": "lemon", "quantity": "1"}
                ],
                "steps": [
                    "Dry the chickpeas and roast until crisp.",
                    "Chop the cucumber.",
                    "Toss everything with lemon juice and olive oil."
                ],
                "missingIngredients": ["olive oil", "smoked paprika"]
            }
        ]);
        Ok(recipes.to_string())
    }
}

pub struct GeminiProvider {
    api_base: String,
    api_key: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::try_from_secs_f64(config.request_timeout_s)
                .unwrap_or(Duration::from_secs(90)),
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// Joins the text parts of the first candidate.
    pub(crate) fn extract_candidate_text(response_payload: &Value) -> Result<String, RecipeError> {
        if let Some(reason) = response_payload
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str)
        {
            return Err(RecipeError::fetch(format!(
                "Gemini blocked the request ({reason})"
            )));
        }

        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let text = parts
            .iter()
            .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<String>();
        if text.trim().is_empty() {
            return Err(RecipeError::fetch("Gemini returned no text"));
        }
        Ok(text)
    }
}

impl RecipeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn complete(&self, request: &RecipeRequest) -> Result<String, RecipeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RecipeError::fetch(
                "GEMINI_API_KEY or GOOGLE_API_KEY or API_KEY not set",
            ));
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&request.to_gemini_payload())
            .send()
            .map_err(|err| {
                RecipeError::fetch(format!("Gemini request failed ({endpoint}): {err}"))
            })?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Self::extract_candidate_text(&response_payload)
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value, RecipeError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| {
        RecipeError::fetch(format!("{provider} response body read failed: {err}"))
    })?;
    if !status.is_success() {
        return Err(RecipeError::fetch(format!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    serde_json::from_str(&body).map_err(|err| {
        RecipeError::fetch(format!("{provider} returned invalid JSON payload: {err}"))
    })
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
