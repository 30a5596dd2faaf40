use std::fmt;

use serde::Serialize;

use crate::models::user::ApiKey;

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Google,
    OpenAi,
    Anthropic,
    DeepSeek,
}

impl AiProvider {
    /// Service name under which keys are stored.
    pub fn service(&self) -> &'static str {
        match self {
            AiProvider::Google => "google",
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
            AiProvider::DeepSeek => "deepseek",
        }
    }

    pub fn from_service(service: &str) -> Option<Self> {
        match service {
            "google" => Some(AiProvider::Google),
            "openai" => Some(AiProvider::OpenAi),
            "anthropic" => Some(AiProvider::Anthropic),
            "deepseek" => Some(AiProvider::DeepSeek),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::Google => "Google",
            AiProvider::OpenAi => "OpenAI",
            AiProvider::Anthropic => "Anthropic",
            AiProvider::DeepSeek => "DeepSeek",
        }
    }

    /// Provider serving a model, by model-name prefix. Unknown prefixes go to OpenAI.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            AiProvider::Anthropic
        } else if model.starts_with("deepseek") {
            AiProvider::DeepSeek
        } else if model.starts_with("gemini") {
            AiProvider::Google
        } else {
            AiProvider::OpenAi
        }
    }
}

/// Server-wide provider keys from the environment.
#[derive(Clone, Default)]
pub struct ProviderKeys {
    pub google: Option<String>,
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub deepseek: Option<String>,
}

impl ProviderKeys {
    pub fn get(&self, provider: AiProvider) -> Option<&str> {
        let key = match provider {
            AiProvider::Google => &self.google,
            AiProvider::OpenAi => &self.openai,
            AiProvider::Anthropic => &self.anthropic,
            AiProvider::DeepSeek => &self.deepseek,
        };
        key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("google", &self.google.is_some())
            .field("openai", &self.openai.is_some())
            .field("anthropic", &self.anthropic.is_some())
            .field("deepseek", &self.deepseek.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    User,
    Environment,
}

/// A model bound to the provider and key that will serve it.
#[derive(Clone, PartialEq)]
pub struct ModelSelection {
    pub provider: AiProvider,
    pub model: String,
    pub api_key: String,
    pub key_source: KeySource,
}

impl fmt::Debug for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSelection")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("key_source", &self.key_source)
            .finish_non_exhaustive()
    }
}

/// Picks provider and key for `model`. The user's stored key wins over the
/// environment key. With no model, the default Gemini model runs on the
/// environment Google key.
pub fn resolve_model(
    model: Option<&str>,
    stored: &[ApiKey],
    env: &ProviderKeys,
) -> Result<ModelSelection, String> {
    let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(ModelSelection {
            provider: AiProvider::Google,
            model: DEFAULT_MODEL.to_string(),
            api_key: env.get(AiProvider::Google).unwrap_or_default().to_string(),
            key_source: KeySource::Environment,
        });
    };

    let provider = AiProvider::for_model(model);
    let user_key = stored
        .iter()
        .find(|k| k.service == provider.service())
        .map(|k| k.api_key.trim())
        .filter(|k| !k.is_empty());

    let (api_key, key_source) = match (user_key, env.get(provider)) {
        (Some(key), _) => (key, KeySource::User),
        (None, Some(key)) => (key, KeySource::Environment),
        (None, None) => return Err(format!("{} API key not found", provider.display_name())),
    };

    Ok(ModelSelection {
        provider,
        model: model.to_string(),
        api_key: api_key.to_string(),
        key_source,
    })
}
