//! The agent loop: the heart of Dayloop.
//!
//! Each run follows a **perceive → decide → act** cycle:
//!
//! 1. **Discover** the capabilities of a freshly opened MCP session
//! 2. **Build context** (system prompt + recalled preferences + what was done so far)
//! 3. **Ask the oracle** for exactly one JSON decision
//! 4. **If final**: return the oracle's comment as the answer
//! 5. **Otherwise**: bind the arguments, invoke the capability, record the
//!    result and loop back to step 2
//!
//! The loop ends on a final decision, on the first fault, or when the
//! iteration ceiling is reached. Nothing is retried.

pub mod binder;
pub mod decision;
pub mod executor;
pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use binder::bind;
pub use decision::{Decision, DecisionArguments, FinalFlag};
pub use executor::{ActionExecutor, normalize};
pub use loop_runner::{AgentLoop, DEFAULT_MAX_ITERATIONS};
