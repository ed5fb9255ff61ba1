//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for interacting with Large Language
//! Model (LLM) providers. Provider-specific details stay behind the
//! [`LLMClient`] trait so agents work with any supported backend.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Resolved provider settings for one model
//! - [`ProviderRegistry`] - Named providers and models from `research.toml`
//!
//! # Supported Providers
//!
//! - `openai` - OpenAI API and compatible servers
//! - `ollama` - Local Ollama server
//!
//! # Example
//!
//! ```ignore
//! use deep_research::llm::ProviderRegistry;
//!
//! let registry = ProviderRegistry::from_config(&config);
//! let client = registry.create_client_for_model("default")?;
//!
//! let answer = client.generate("What is 2+2?").await?;
//! println!("{}", answer);
//! ```

pub mod client;
pub mod ollama;
pub mod openai;
pub mod provider_registry;

pub use client::{GenerationParams, LLMClient, LLMResponse, Provider, TextStream};
pub use provider_registry::ProviderRegistry;
