use std::env;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Engine settings, read from the environment and overridable by CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub request_timeout_s: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: None,
            request_timeout_s: 90.0,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let api_base = non_empty("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("GOOGLE_API_KEY"))
            .or_else(|| non_empty("API_KEY"));
        let request_timeout_s = non_empty("FRIDGECHEF_REQUEST_TIMEOUT")
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(90.0)
            .clamp(15.0, 300.0);

        Self {
            api_base,
            api_key,
            model: None,
            request_timeout_s,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{EngineConfig, DEFAULT_API_BASE};

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.api_key, None);
        assert_eq!(config.request_timeout_s, 90.0);
    }

    #[test]
    fn api_key_precedence_and_blank_values() {
        let config = config_from(&[("GEMINI_API_KEY", "  "), ("GOOGLE_API_KEY", "g"), ("API_KEY", "a")]);
        assert_eq!(config.api_key.as_deref(), Some("g"));
        let config = config_from(&[("API_KEY", "a")]);
        assert_eq!(config.api_key.as_deref(), Some("a"));
    }

    #[test]
    fn base_is_trimmed_and_timeout_clamped() {
        let config = config_from(&[
            ("GEMINI_API_BASE", "http://localhost:8080/v1beta/"),
            ("FRIDGECHEF_REQUEST_TIMEOUT", "5"),
        ]);
        assert_eq!(config.api_base, "http://localhost:8080/v1beta");
        assert_eq!(config.request_timeout_s, 15.0);

        let config = config_from(&[("FRIDGECHEF_REQUEST_TIMEOUT", "not-a-number")]);
        assert_eq!(config.request_timeout_s, 90.0);
    }

    #[test]
    fn blank_model_flag_means_default() {
        let config = EngineConfig::default().with_model(Some(" ".to_string()));
        assert_eq!(config.model, None);
    }
}
