//! The agent reasoning loop implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dayloop_config::AgentConfig;
use dayloop_core::agent::{AbortReason, RunOutcome, SessionState};
use dayloop_core::capability::{CapabilitySession, SessionConnector};
use dayloop_core::event::{DomainEvent, EventBus};
use dayloop_core::message::RunId;
use dayloop_core::Error;
use dayloop_mcp::CapabilityRegistry;
use dayloop_memory::{DEFAULT_RETRIEVE_LIMIT, MemoryStore};
use dayloop_providers::OracleGateway;
use tracing::{debug, info, warn};

use crate::binder::bind;
use crate::decision;
use crate::executor::ActionExecutor;
use crate::prompt;

/// Iterations allowed per run unless configured otherwise.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Drives one request at a time through the perceive-decide-act cycle.
pub struct AgentLoop {
    /// The oracle, wrapped with model settings and timeout
    gateway: OracleGateway,

    /// Opens the remote capability session for each run
    connector: Arc<dyn SessionConnector>,

    /// Preferences and notes for the current run
    memory: MemoryStore,

    /// Where preferences are kept between runs
    preference_file: Option<PathBuf>,

    /// Maximum action cycles per run
    max_iterations: usize,

    /// Maximum memory items recalled into one prompt
    recall_limit: usize,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    state: SessionState,
}

impl AgentLoop {
    pub fn new(gateway: OracleGateway, connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            gateway,
            connector,
            memory: MemoryStore::new(),
            preference_file: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            recall_limit: DEFAULT_RETRIEVE_LIMIT,
            event_bus: Arc::new(EventBus::default()),
            state: SessionState::new(),
        }
    }

    /// Apply the `[agent]` config section.
    pub fn with_config(self, config: &AgentConfig) -> Self {
        self.with_max_iterations(config.max_iterations)
            .with_recall_limit(config.recall_limit)
    }

    /// Set the maximum number of action cycles per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the maximum number of memory items recalled per prompt.
    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    /// Load and save preferences at `path`.
    pub fn with_preference_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.preference_file = Some(path.into());
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Handle one user request from start to a terminal state.
    ///
    /// `preferences` is free text the user wants remembered; it is stored
    /// before the first iteration and recalled into prompts when relevant.
    /// Whatever happens, the session is closed and memory and state are
    /// cleared before this returns.
    pub async fn run(&mut self, request: &str, preferences: Option<&str>) -> RunOutcome {
        let run_id = RunId::new();
        self.state.reset();
        self.memory.clear();
        self.apply_preferences(preferences);

        info!(
            run_id = %run_id,
            max_iterations = self.max_iterations,
            remembered = self.memory.len(),
            "Run started"
        );
        self.event_bus.publish(DomainEvent::RunStarted {
            run_id: run_id.to_string(),
            request_preview: request.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        let result = match self.connector.connect().await {
            Ok(mut session) => {
                let result = self.drive(&run_id, request, session.as_mut()).await;
                session.close().await;
                result
            }
            Err(e) => Err(e.into()),
        };

        self.finish(&run_id, result)
    }

    /// Discover capabilities, then iterate until a final decision, a fault,
    /// or the ceiling. `Ok(None)` means the ceiling was reached.
    async fn drive(
        &mut self,
        run_id: &RunId,
        request: &str,
        session: &mut dyn CapabilitySession,
    ) -> Result<Option<String>, Error> {
        let registry = CapabilityRegistry::discover(session).await?;
        self.event_bus.publish(DomainEvent::CapabilitiesDiscovered {
            run_id: run_id.to_string(),
            count: registry.len(),
            timestamp: Utc::now(),
        });

        let system = prompt::system_prompt(&registry.describe());
        let mut executor = ActionExecutor::new(&registry, session);

        for iteration in 1..=self.max_iterations {
            let query = prompt::build_query(request, &self.state);
            let recalled = self.memory.recall(request, self.recall_limit);
            if !recalled.is_empty() {
                debug!(count = recalled.len(), "Recalled memory for prompt");
            }
            let oracle_prompt = prompt::oracle_prompt(&system, &recalled, &query);

            debug!(run_id = %run_id, iteration, "Asking oracle");
            let raw = self.gateway.ask(&oracle_prompt).await?;
            let decision = decision::parse(&raw)?;

            self.event_bus.publish(DomainEvent::DecisionMade {
                run_id: run_id.to_string(),
                iteration,
                is_final: decision.is_final(),
                capability: decision.function_name.clone(),
                timestamp: Utc::now(),
            });

            if decision.is_final() {
                return Ok(Some(decision.your_comment));
            }

            let capability = executor.resolve(&decision.function_name)?;
            let bound = bind(capability, &decision.parameters)?;
            debug!(
                run_id = %run_id,
                iteration,
                capability = %capability.name,
                arguments = %bound,
                "Invoking capability"
            );

            let start = Instant::now();
            let result = executor.execute(&capability.name, &bound).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            self.event_bus.publish(DomainEvent::CapabilityInvoked {
                run_id: run_id.to_string(),
                capability: capability.name.clone(),
                success: result.is_ok(),
                duration_ms,
                timestamp: Utc::now(),
            });

            let output = result?;
            info!(
                run_id = %run_id,
                iteration,
                capability = %capability.name,
                duration_ms,
                "Capability completed"
            );
            self.state.record(capability.name.clone(), bound, output);
        }

        Ok(None)
    }

    fn finish(&mut self, run_id: &RunId, result: Result<Option<String>, Error>) -> RunOutcome {
        let history = std::mem::take(&mut self.state.history);
        let iterations = self.state.iteration_count;
        self.state.reset();
        self.memory.clear();

        let outcome = match result {
            Ok(Some(answer)) => {
                info!(run_id = %run_id, iterations, "Run completed");
                RunOutcome::Completed { answer, history }
            }
            Ok(None) => {
                warn!(run_id = %run_id, limit = self.max_iterations, "Iteration ceiling reached");
                RunOutcome::Aborted {
                    reason: AbortReason::IterationCeiling {
                        limit: self.max_iterations,
                    },
                    history,
                }
            }
            Err(e) => {
                warn!(run_id = %run_id, iterations, error = %e, "Run aborted");
                RunOutcome::Aborted {
                    reason: AbortReason::Fault(e),
                    history,
                }
            }
        };

        self.event_bus.publish(DomainEvent::RunFinished {
            run_id: run_id.to_string(),
            completed: outcome.is_completed(),
            iterations,
            timestamp: Utc::now(),
        });

        outcome
    }

    /// Load saved preferences, then add and save the ones given for this run.
    fn apply_preferences(&mut self, preferences: Option<&str>) {
        if let Some(path) = &self.preference_file {
            if let Err(e) = self.memory.load(path) {
                warn!(path = %path.display(), error = %e, "Could not load saved preferences");
            }
        }

        let Some(text) = preferences.map(str::trim).filter(|p| !p.is_empty()) else {
            return;
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("kind".into(), "preference".into());
        metadata.insert("saved_at".into(), Utc::now().to_rfc3339().into());
        if !self.memory.add(text, metadata) {
            debug!("Preference already remembered");
            return;
        }

        if let Some(path) = &self.preference_file {
            match self.memory.persist(path) {
                Ok(()) => debug!(path = %path.display(), "Preferences saved"),
                Err(e) => warn!(path = %path.display(), error = %e, "Could not save preferences"),
            }
        }
    }
}
