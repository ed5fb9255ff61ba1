//! Init command implementation
//!
//! Scaffolds `research.toml`, `.env.example` and a `.gitignore`.

use super::output::{Output, Status};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// research.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama, openai, or both)
    pub provider: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.section(&format!("Initializing {}", config.path.display()));

    let base_path = &config.path;
    if let Err(e) = fs::create_dir_all(base_path) {
        output.status(Status::Fail, &format!("cannot create {}: {}", base_path.display(), e));
        return InitResult::Error(e.to_string());
    }

    let config_path = base_path.join("research.toml");
    if config_path.exists() && !config.force {
        output.status(Status::Warn, "research.toml already exists (use --force to overwrite)");
        return InitResult::AlreadyExists;
    }

    let files = [
        (config_path, generate_research_toml(&config)),
        (base_path.join(".env.example"), generate_env_example(&config)),
    ];
    for (path, content) in &files {
        if let Err(e) = write_file(path, content, config.force) {
            output.status(Status::Fail, &format!("cannot write {}: {}", path.display(), e));
            return InitResult::Error(e.to_string());
        }
        output.status(Status::Done, &path.display().to_string());
    }

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.status(Status::Skip, ".gitignore already exists");
    } else if let Err(e) = write_file(&gitignore_path, GITIGNORE, false) {
        output.status(Status::Warn, &format!("cannot write .gitignore: {}", e));
    } else {
        output.status(Status::Done, &gitignore_path.display().to_string());
    }

    output.section("Next steps");
    output.status(Status::Note, "set BRAVE_API_KEY (and OPENAI_API_KEY if used) in .env");
    output.command("cp .env.example .env");
    if config.provider != "openai" {
        output.status(Status::Note, "make sure Ollama is running with the model pulled");
        output.command("ollama pull llama3.1");
    }
    output.status(
        Status::Note,
        &format!("start the server on http://{}:{}", config.host, config.port),
    );
    output.command("deep-research-server serve");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_research_toml(config: &InitConfig) -> String {
    let provider_section = match config.provider.as_str() {
        "openai" => OPENAI_PROVIDER.to_string(),
        "both" => format!("{}\n{}", OLLAMA_PROVIDER, OPENAI_PROVIDER),
        _ => OLLAMA_PROVIDER.to_string(),
    };

    let (model_provider, model_name) = if config.provider == "openai" {
        ("openai", "gpt-4o-mini")
    } else {
        ("ollama-local", "llama3.1")
    };

    format!(
        r#"# Deep Research Server Configuration
# Generated by: deep-research-server init
#
# REQUIRED environment variables (see .env.example):
#   - BRAVE_API_KEY: Brave Search API token used by the web_search tool

[server]
host = "{host}"
port = {port}
log_level = "info"
log_format = "pretty"
cors_origins = ["http://localhost", "http://localhost:3000"]

# =============================================================================
# LLM Providers
# =============================================================================
{provider_section}
# =============================================================================
# Models
# =============================================================================
[models.default]
provider = "{model_provider}"
model = "{model_name}"
temperature = 0.7
max_tokens = 4096

[models.precise]
provider = "{model_provider}"
model = "{model_name}"
temperature = 0.2
max_tokens = 4096

# =============================================================================
# Agents
# =============================================================================
# Plans tasks, judges coverage and writes the final report
[agents.lead]
model = "precise"
output_retries = 2

# Optional per-stage instructions; {{CURRENT_DATE}} is filled in per request
# [agents.lead.stage_prompts]
# planning = "..."
# evaluation = "..."
# synthesis = "..."

# Researches one task with the web tools
[agents.subagent]
model = "default"
tools = ["web_search", "web_fetch"]
max_tool_iterations = 10
output_retries = 2

# Plain chat replies when webSearch is off
[agents.chat]
model = "default"

# =============================================================================
# Tools
# =============================================================================
[tools.web_search]
api_key_env = "BRAVE_API_KEY"
timeout_secs = 20
count = 10
country = "us"
search_lang = "en"

[tools.web_fetch]
timeout_secs = 30
max_content_chars = 40000

# Backoff applied when a search is rate limited or fails
[retry]
max_attempts = 3
rate_limit_backoff_ms = 2000
server_error_backoff_ms = 3000
network_backoff_ms = 2000

[research]
max_followup_rounds = 2
"#,
        host = config.host,
        port = config.port,
        provider_section = provider_section,
        model_provider = model_provider,
        model_name = model_name,
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    let mut env = String::from(
        "# Brave Search API token for the web_search tool\nBRAVE_API_KEY=\n",
    );
    if config.provider == "openai" || config.provider == "both" {
        env.push_str("\n# OpenAI API key\nOPENAI_API_KEY=\n");
    }
    env.push_str("\n# Log filter override, e.g. deep_research=debug\n# RUST_LOG=info\n");
    env
}

const OLLAMA_PROVIDER: &str = r#"# Ollama - local inference (no API key required)
[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"
default_model = "llama3.1"
"#;

const OPENAI_PROVIDER: &str = r#"# OpenAI-compatible API (set OPENAI_API_KEY in .env)
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
default_model = "gpt-4o-mini"
"#;

const GITIGNORE: &str = "/target\n.env\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::ResearchConfig;
    use tempfile::TempDir;

    fn init_config(path: &Path, provider: &str) -> InitConfig {
        InitConfig {
            path: path.to_path_buf(),
            force: false,
            provider: provider.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }

    #[test]
    fn test_generated_config_is_valid() {
        for provider in ["ollama", "openai", "both"] {
            let dir = TempDir::new().unwrap();
            let toml = generate_research_toml(&init_config(dir.path(), provider));
            let config = ResearchConfig::from_toml_str(&toml).unwrap();
            config.validate_references().unwrap();
            assert_eq!(config.agents.subagent.tools, vec!["web_search", "web_fetch"]);
        }
    }

    #[test]
    fn test_init_writes_files() {
        let dir = TempDir::new().unwrap();
        let result = run(init_config(dir.path(), "openai"), &Output::new(false));

        assert_eq!(result, InitResult::Success);
        assert!(dir.path().join("research.toml").exists());
        assert!(dir.path().join(".gitignore").exists());
        let env = fs::read_to_string(dir.path().join(".env.example")).unwrap();
        assert!(env.contains("OPENAI_API_KEY="));
        assert!(env.contains("BRAVE_API_KEY="));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("research.toml"), "# mine").unwrap();

        let result = run(init_config(dir.path(), "ollama"), &Output::new(false));
        assert_eq!(result, InitResult::AlreadyExists);
        assert_eq!(
            fs::read_to_string(dir.path().join("research.toml")).unwrap(),
            "# mine"
        );
    }
}
