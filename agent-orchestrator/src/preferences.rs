//! Persisted user preferences for chat and workflow runs

use crate::backend::Agent;
use crate::client::{ChatOptions, ExecuteOptions};
use crate::storage::{KeyValueStore, StorageError};
use crate::workflow::{WorkflowOptions, WorkflowType};
use tracing::debug;

const SERVER_KEY: &str = "mcp_preferred_server";
const MODEL_KEY: &str = "mcp_preferred_model";
const TEMPERATURE_KEY: &str = "mcp_preferred_temperature";
const AUTO_WORKFLOW_KEY: &str = "mcp_auto_workflow";
const AGENT_KEY: &str = "mcp_preferred_agent";

/// Provider, model and agent selection
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    /// Upstream LLM provider, e.g. "anthropic", "openai", "google"
    pub mcp_server: String,
    pub model: String,
    pub temperature: f32,
    /// Run the full workflow instead of a plain chat on send
    pub auto_workflow: bool,
    pub agent: Agent,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            mcp_server: "anthropic".to_string(),
            model: "default".to_string(),
            temperature: 0.7,
            auto_workflow: false,
            agent: Agent::Executor,
        }
    }
}

impl Preferences {
    /// Load preferences; missing or unparsable values keep their defaults
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        let mut prefs = Self::default();

        if let Some(server) = store.get(SERVER_KEY)?.filter(|s| !s.is_empty()) {
            prefs.mcp_server = server;
        }
        if let Some(model) = store.get(MODEL_KEY)?.filter(|s| !s.is_empty()) {
            prefs.model = model;
        }
        if let Some(temperature) = store.get(TEMPERATURE_KEY)?.and_then(|s| s.parse().ok()) {
            prefs.temperature = temperature;
        }
        if let Some(auto) = store.get(AUTO_WORKFLOW_KEY)?.and_then(|s| s.parse().ok()) {
            prefs.auto_workflow = auto;
        }
        if let Some(agent) = store.get(AGENT_KEY)?.and_then(|s| s.parse().ok()) {
            prefs.agent = agent;
        }

        Ok(prefs)
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            mcp_server: self.mcp_server.clone(),
            auto_process: true,
        }
    }

    /// Execution options targeting the preferred provider
    pub fn execute_options(&self, auto_debug: bool) -> ExecuteOptions {
        ExecuteOptions {
            auto_debug,
            mcp_server: self.mcp_server.clone(),
            ..Default::default()
        }
    }

    /// Workflow options with the preferred model, overriding the agent
    pub fn workflow_options(&self, agent: Agent, workflow_type: WorkflowType) -> WorkflowOptions {
        WorkflowOptions {
            agent,
            model: self.model.clone(),
            temperature: self.temperature,
            mcp_server: self.mcp_server.clone(),
            workflow_type,
        }
    }

    /// Persist every preference
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        debug!(preferences = ?self, "Saving preferences");
        store.set(SERVER_KEY, &self.mcp_server)?;
        store.set(MODEL_KEY, &self.model)?;
        store.set(TEMPERATURE_KEY, &self.temperature.to_string())?;
        store.set(AUTO_WORKFLOW_KEY, &self.auto_workflow.to_string())?;
        store.set(AGENT_KEY, self.agent.as_str())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_when_store_empty() {
        let store = MemoryStore::new();
        assert_eq!(Preferences::load(&store).unwrap(), Preferences::default());
    }

    #[test]
    fn test_execute_options_use_preferred_server() {
        let prefs = Preferences {
            mcp_server: "google".to_string(),
            ..Default::default()
        };
        let options = prefs.execute_options(false);
        assert_eq!(options.mcp_server, "google");
        assert!(!options.auto_debug);
        assert_eq!(options.mode, "script");
    }

    #[test]
    fn test_workflow_options_carry_model_and_agent() {
        let prefs = Preferences {
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            ..Default::default()
        };
        let options = prefs.workflow_options(Agent::Planner, WorkflowType::NoDebug);
        assert_eq!(options.agent, Agent::Planner);
        assert_eq!(options.model, "gpt-4o");
        assert_eq!(options.temperature, 0.2);
        assert_eq!(options.workflow_type, WorkflowType::NoDebug);
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let prefs = Preferences {
            mcp_server: "openai".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.2,
            auto_workflow: true,
            agent: Agent::Code,
        };
        prefs.save(&store).unwrap();
        assert_eq!(store.get("mcp_auto_workflow").unwrap(), Some("true".to_string()));
        assert_eq!(Preferences::load(&store).unwrap(), prefs);
    }

    #[test]
    fn test_garbage_values_fall_back() {
        let store = MemoryStore::new();
        store.set("mcp_preferred_temperature", "warm").unwrap();
        store.set("mcp_preferred_agent", "wizard").unwrap();
        store.set("mcp_auto_workflow", "maybe").unwrap();
        let prefs = Preferences::load(&store).unwrap();
        assert_eq!(prefs.temperature, 0.7);
        assert_eq!(prefs.agent, Agent::Executor);
        assert!(!prefs.auto_workflow);
    }
}
