//! Provider Registry for managing multiple LLM providers
//!
//! This module provides a registry for the named providers and models declared
//! in `research.toml`. Agents refer to models by name; the registry resolves
//! the model -> provider chain and builds the matching client.

use crate::llm::client::{GenerationParams, LLMClient, Provider};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{ModelConfig, ProviderConfig, ResearchConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

impl Provider {
    /// Build a provider from a model definition and the provider it references
    pub fn from_model_config(model: &ModelConfig, provider: &ProviderConfig) -> Result<Self> {
        match provider {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                timeout_secs,
                ..
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' is not set",
                        api_key_env
                    ))
                })?;

                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.model.clone(),
                    params: params_for(model, *timeout_secs),
                })
            }
            ProviderConfig::Ollama {
                base_url,
                timeout_secs,
                ..
            } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.model.clone(),
                params: params_for(model, *timeout_secs),
            }),
        }
    }
}

fn params_for(model: &ModelConfig, timeout_secs: u64) -> GenerationParams {
    GenerationParams {
        temperature: model.temperature,
        max_tokens: model.max_tokens,
        timeout: Duration::from_secs(timeout_secs),
    }
}

/// Registry for managing multiple named LLM providers
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    /// Provider configurations keyed by name
    providers: HashMap<String, ProviderConfig>,
    /// Model configurations keyed by name
    models: HashMap<String, ModelConfig>,
}

impl ProviderRegistry {
    /// Create a provider registry from TOML configuration
    pub fn from_config(config: &ResearchConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
        }
    }

    /// Resolve a model name to its provider settings
    pub fn resolve(&self, model_name: &str) -> Result<Provider> {
        let model_config = self.models.get(model_name).ok_or_else(|| {
            AppError::Configuration(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.providers.get(&model_config.provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        Provider::from_model_config(model_config, provider_config)
    }

    /// Create an LLM client for a specific model by name
    pub fn create_client_for_model(&self, model_name: &str) -> Result<Arc<dyn LLMClient>> {
        let provider = self.resolve(model_name)?;
        tracing::debug!(
            model = model_name,
            provider = provider.name(),
            "Creating LLM client"
        );
        Ok(Arc::from(provider.create_client()?))
    }
}
