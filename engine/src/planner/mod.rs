//! Planner adapter
//!
//! Turns a profile and a user goal into a [`Plan`] by asking an LLM
//! provider. Every failure (no provider, timeout, transport, authentication,
//! unparseable output) is absorbed here: the caller always gets a plan, and
//! degraded mode shows only in the plan's `notes`.

pub mod fallback;
pub mod prompts;

use crate::config::PlannerConfig;
use crate::llm::{GeminiProvider, LLMProvider, Message, OllamaProvider};
use crate::secrets::SecretString;
use sdk::{ImageProfile, Modality, OpSpec, PipelineError, Plan, TabularProfile, TextProfile};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Plan generation front-end; shareable across pipelines
#[derive(Clone)]
pub struct Planner {
    provider: Option<Arc<dyn LLMProvider>>,
    timeout: Duration,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("provider", &self.provider_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Planner {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    /// Planner that always returns fallback plans
    pub fn offline() -> Self {
        Self {
            provider: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build the provider named in `config`
    ///
    /// Gemini needs `api_key`; without one the planner runs offline.
    pub fn from_config(config: &PlannerConfig, api_key: Option<SecretString>) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let provider: Option<Arc<dyn LLMProvider>> = match config.provider.as_str() {
            "gemini" => match api_key {
                Some(key) => Some(Arc::new(GeminiProvider::new(config.gemini.clone(), key))),
                None => {
                    info!("No Gemini API key found; planner will use fallback plans");
                    None
                }
            },
            "ollama" => Some(Arc::new(OllamaProvider::from_config(&config.ollama))),
            _ => None,
        };

        Self { provider, timeout }
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    pub fn is_offline(&self) -> bool {
        self.provider.is_none()
    }

    /// One bounded provider call
    async fn complete(&self, messages: &[Message]) -> Result<String, PipelineError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| PipelineError::Planner("no planner provider configured".to_string()))?;

        match tokio::time::timeout(self.timeout, provider.generate(messages)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(PipelineError::Planner(e.to_string())),
            Err(_) => Err(PipelineError::Planner(format!(
                "{} did not answer within {}s",
                provider.name(),
                self.timeout.as_secs()
            ))),
        }
    }

    async fn plan_with<P: Serialize>(
        &self,
        modality: Modality,
        profile: &P,
        goal: &str,
        fallback: impl FnOnce() -> Plan,
    ) -> Plan {
        let messages = prompts::plan_messages(modality, profile, goal);
        let result = match self.complete(&messages).await {
            Ok(text) => parse_plan(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(plan) => {
                info!("Planner produced a {} plan with {} ops", modality, plan.len());
                plan
            }
            Err(e) => {
                if self.provider.is_some() {
                    warn!("Using {} fallback plan: {}", modality, e);
                } else {
                    debug!("Using {} fallback plan: {}", modality, e);
                }
                fallback()
            }
        }
    }

    pub async fn plan_tabular(&self, profile: &TabularProfile, goal: &str) -> Plan {
        self.plan_with(Modality::Tabular, profile, goal, || {
            fallback::tabular_plan(profile)
        })
        .await
    }

    pub async fn plan_text(&self, profile: &TextProfile, goal: &str) -> Plan {
        self.plan_with(Modality::Text, profile, goal, fallback::text_plan)
            .await
    }

    pub async fn plan_image(&self, profile: &ImageProfile, goal: &str) -> Plan {
        self.plan_with(Modality::Image, profile, goal, || fallback::image_plan(goal))
            .await
    }

    /// User-facing explanation of one image step; canned text when the model is unavailable
    pub async fn explain_step(&self, step: &OpSpec, profile: &ImageProfile, goal: &str) -> String {
        let messages = prompts::explain_messages(step, profile, goal);
        match self.complete(&messages).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback::explain(step),
            Err(e) => {
                debug!("Canned explanation for '{}': {}", step.name(), e);
                fallback::explain(step)
            }
        }
    }
}

/// Parse model output into a plan
///
/// The JSON object spanning the first `{` to the last `}` must carry an
/// `ops` array of objects. `notes` defaults to "" and `reasoning` is kept
/// when it is a string.
pub fn parse_plan(text: &str) -> Result<Plan, PipelineError> {
    let invalid = |reason: &str| PipelineError::Planner(format!("invalid plan: {}", reason));

    let start = text.find('{').ok_or_else(|| invalid("no JSON object"))?;
    let end = text.rfind('}').ok_or_else(|| invalid("no JSON object"))?;
    if end < start {
        return Err(invalid("no JSON object"));
    }

    let value: Value =
        serde_json::from_str(&text[start..=end]).map_err(|e| invalid(&e.to_string()))?;
    let ops = value
        .get("ops")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing ops array"))?;

    let ops = ops
        .iter()
        .map(|op| op.as_object().cloned().map(OpSpec::from))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("ops must be objects"))?;

    let notes = value
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let mut plan = Plan::new(ops, notes);
    if let Some(reasoning) = value.get("reasoning").and_then(Value::as_str) {
        plan = plan.with_reasoning(reasoning);
    }
    Ok(plan)
}
