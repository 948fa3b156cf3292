//! Write-rare agent registry, keyed by [`AgentId`] (§5 — "the provider
//! registry and agent registry are write-rare; readers do not take
//! exclusive locks").

use crate::config::AgentConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use warden_core::{AgentId, Result, WardenError};

#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, AgentConfig>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, config: AgentConfig) {
        self.agents.write().insert(config.id, config);
    }

    pub fn get(&self, id: AgentId) -> Result<AgentConfig> {
        self.agents
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| WardenError::AgentNotFound(id.to_string()))
    }

    pub fn get_by_name(&self, name: &str) -> Result<AgentConfig> {
        self.agents
            .read()
            .values()
            .find(|a| a.name == name)
            .cloned()
            .ok_or_else(|| WardenError::AgentNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_by_id_and_name() {
        let registry = AgentRegistry::new();
        let config = AgentConfig::new("reviewer", "openai", "gpt-4o");
        let id = config.id;
        registry.register(config);

        assert_eq!(registry.get(id).unwrap().name, "reviewer");
        assert_eq!(registry.get_by_name("reviewer").unwrap().id, id);
    }

    #[test]
    fn unknown_agent_id_is_not_found() {
        let registry = AgentRegistry::new();
        assert!(matches!(
            registry.get(AgentId::new()),
            Err(WardenError::AgentNotFound(_))
        ));
    }
}
