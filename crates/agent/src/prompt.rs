//! Prompt assembly for the oracle.

use dayloop_core::agent::SessionState;
use dayloop_core::memory::MemoryItem;

const TOOLS_SLOT: &str = "{tools}";

/// Instructions sent ahead of every query. `{tools}` is replaced by the
/// numbered capability list.
pub const SYSTEM_PROMPT: &str = r#"You are a personal planning assistant. You help the user organise their day through a planning system that manages todos, events and reminders. The system exposes the tools listed below, and you may call exactly one of them per answer.

Available tools:
{tools}

Work through the user's request step by step. Decide which single tool call moves the task forward, then wait for its result before choosing the next one. Check every result before relying on it; if it looks wrong or incomplete, call another tool to correct or complete it. If you need today's date, call get_current_date instead of guessing.

Answer with EXACTLY ONE JSON object on a single line, in this format:
{"final_iteration": "True or False", "your_comment": "text", "function_name": "tool name", "parameters": [value1, value2]}

Field meanings:
1. final_iteration: "True" once the task is complete, "False" otherwise. Do not call a tool when it is "True".
2. your_comment: on the final answer, one line telling the user what was done or what you found. Leave it empty otherwise.
3. function_name: the tool to call, taken from the list above.
4. parameters: the tool's arguments, either as a list in the order the tool declares them or as an object keyed by parameter name.

Example for the request "Need to buy groceries tomorrow":
{"final_iteration": "False", "your_comment": "", "function_name": "get_current_date", "parameters": []}
{"final_iteration": "False", "your_comment": "", "function_name": "create_todo", "parameters": ["2025-04-12", "buy groceries"]}
{"final_iteration": "True", "your_comment": "Added a todo to buy groceries on 12 April 2025", "function_name": "", "parameters": []}

If the request is unclear, set final_iteration to "True" and ask your question in your_comment.

Reply with the JSON object only. No explanations and no code fences."#;

/// Render the system prompt for a discovered capability set.
pub fn system_prompt(tools_description: &str) -> String {
    SYSTEM_PROMPT.replace(TOOLS_SLOT, tools_description)
}

/// The per-iteration query: the request alone on the first iteration,
/// then the request followed by everything done so far.
pub fn build_query(request: &str, state: &SessionState) -> String {
    if state.history.is_empty() {
        return request.to_string();
    }
    format!(
        "{request}\n\n{}\nWhat should I do next?",
        state.joined_history()
    )
}

/// Recalled memory as a bullet block, empty when nothing was recalled.
pub fn memory_block(items: &[&MemoryItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut block = String::from("User preferences and notes:");
    for item in items {
        block.push_str("\n- ");
        block.push_str(&item.content);
    }
    block
}

/// The full text sent to the oracle for one iteration.
pub fn oracle_prompt(system: &str, recalled: &[&MemoryItem], query: &str) -> String {
    let memory = memory_block(recalled);
    if memory.is_empty() {
        format!("{system}\n\nQuery: {query}")
    } else {
        format!("{system}\n\n{memory}\n\nQuery: {query}")
    }
}
