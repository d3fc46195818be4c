//! Application state: the profile store and the content orchestrator.
//!
//! If OpenAI is unavailable, the orchestrator still answers every request with
//! locally generated fallback content.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::load_agent_config_from_env;
use crate::openai::{Completion, OpenAI};
use crate::orchestrator::Orchestrator;
use crate::store::ProfileStore;

#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileStore,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(profiles: ProfileStore, orchestrator: Orchestrator) -> Self {
        Self { profiles, orchestrator }
    }

    /// Build state from env: load config, open the profile store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Self {
        let prompts = load_agent_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "skilltree", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "skilltree", "OpenAI disabled (no OPENAI_API_KEY). Serving fallback content.");
        }
        let completion = openai.map(|oa| Arc::new(oa) as Arc<dyn Completion>);

        let profiles = ProfileStore::from_env().await;
        Self::new(profiles, Orchestrator::new(completion, prompts))
    }
}
