//! Layered configuration (§6's ambient stack): a TOML file provides
//! defaults, environment variables override them. Mirrors the
//! file-then-env layering of the teacher's own runtime config loader,
//! narrowed to what this runtime actually needs: which providers are
//! configured and where the repository lives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use warden_agents::{AgentConfig, AgentRegistry, AgentRunner};
use warden_audit::{AuditService, InMemoryAuditLog};
use warden_events::EventBus;
use warden_providers::{AnthropicProvider, GeminiProvider, OllamaProvider, OpenAiProvider, ProviderRegistry};
use warden_repository::{InMemoryRepository, PostgresRepository, Repository};
use warden_resilience::{CircuitBreakerConfig, RetryConfig};
use warden_workflow::{Orchestrator, StepExecutor};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenConfig {
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub database_url: Option<String>,
}

impl WardenConfig {
    /// Load from `path` if given, otherwise `warden.toml` in the working
    /// directory, otherwise `$XDG_CONFIG_HOME/warden/config.toml` (or the
    /// platform equivalent via `dirs`), otherwise an empty default.
    /// Environment variables never change the *shape* loaded here — they're
    /// applied later, when providers are actually constructed, since that's
    /// where the spec's env vars (`ANTHROPIC_API_KEY` etc.) are scoped.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let user_config = dirs::config_dir().map(|d| d.join("warden").join("config.toml"));
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None if Path::new("warden.toml").exists() => Some("warden.toml".into()),
            None => user_config.filter(|p| p.exists()),
        };

        match resolved {
            Some(p) => {
                let text = tokio::fs::read_to_string(&p)
                    .await
                    .with_context(|| format!("reading config file {}", p.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing config file {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }
}

/// Everything `run`/`status`/`approve` need to drive an orchestrator.
/// Built fresh per invocation — this CLI has no long-lived daemon.
pub struct Runtime {
    pub orchestrator: Orchestrator,
    pub repository: Arc<dyn Repository>,
}

/// Wires the repository (Postgres if `database_url` is set, in-memory
/// otherwise — `status`/`approve` only see a prior `run`'s state across
/// separate invocations in the Postgres case, since this CLI has no
/// long-lived daemon to hold an in-memory repository open), the agents
/// declared in `config`, and one provider per recognised API-key/base-URL
/// environment variable (§6). A provider whose credential is absent is
/// simply not registered — agents that reference it fail with
/// `agent-not-found`-style errors only when actually invoked, not at
/// startup.
pub async fn build_runtime(config: &WardenConfig) -> Result<Runtime> {
    let providers = Arc::new(ProviderRegistry::new());

    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        providers.register(Arc::new(resilient(AnthropicProvider::new(key))));
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        providers.register(Arc::new(resilient(OpenAiProvider::new(key))));
    }
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        providers.register(Arc::new(resilient(GeminiProvider::new(key))));
    }
    let ollama_base = std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
    providers.register(Arc::new(resilient(OllamaProvider::new(ollama_base))));

    let agents = Arc::new(AgentRegistry::new());
    for agent in &config.agents {
        agents.register(agent.clone());
    }

    let runner = Arc::new(AgentRunner::new(providers));
    let audit = Arc::new(AuditService::new(Arc::new(InMemoryAuditLog::new())));
    let events = Arc::new(EventBus::new());
    let executor = StepExecutor::new(agents, runner, audit.clone());

    let repository: Arc<dyn Repository> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .with_context(|| "connecting to database_url")?;
            Arc::new(PostgresRepository::new(pool))
        }
        None => Arc::new(InMemoryRepository::new()),
    };

    let orchestrator = Orchestrator::new(repository.clone(), executor, audit, events);
    Ok(Runtime { orchestrator, repository })
}

fn resilient<P: warden_providers::Provider + 'static>(inner: P) -> warden_providers::ResilientProvider {
    warden_providers::ResilientProvider::new(
        Arc::new(inner),
        warden_resilience::Timeout::new(std::time::Duration::from_secs(60)),
        warden_resilience::CircuitBreaker::new("default", CircuitBreakerConfig::default()),
        warden_resilience::Retry::new(RetryConfig::default()),
        None,
    )
}

/// Resolve an approver identity per §6: `--approver` wins, then `USER`,
/// then `USERNAME` (Windows), then `"unknown"`.
pub fn default_approver(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}
