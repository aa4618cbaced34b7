// src/agent/selector.rs
// Asks the model which tools to invoke and with what refined input. Any
// failure to parse or validate the reply degrades to the fixed default pair,
// which can never itself fail to produce a dispatch list.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{strip_code_fences, DynLlmClient};
use crate::prompts;
use crate::tools::{ToolRegistry, CRYPTO_SEARCH, TWITTER};

/// One planned tool dispatch, as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub custom_input: String,
}

#[derive(Deserialize)]
struct SelectionReply {
    #[serde(default)]
    tools_needed: Vec<ToolInvocation>,
}

/// The fixed default pair: keyword search + social search, both with the raw
/// query as input.
pub fn default_invocations(query: &str) -> Vec<ToolInvocation> {
    vec![
        ToolInvocation {
            name: CRYPTO_SEARCH.to_string(),
            custom_input: query.to_string(),
        },
        ToolInvocation {
            name: TWITTER.to_string(),
            custom_input: query.to_string(),
        },
    ]
}

/// Parse boundary for the selection reply. `None` means "degrade to the
/// default pair": not valid JSON, empty selection, or an unknown tool name.
pub fn parse_selection(raw: &str, registry: &ToolRegistry) -> Option<Vec<ToolInvocation>> {
    let cleaned = strip_code_fences(raw);
    let reply: SelectionReply = serde_json::from_str(cleaned).ok()?;
    if reply.tools_needed.is_empty() {
        return None;
    }
    if reply
        .tools_needed
        .iter()
        .any(|inv| registry.get(&inv.name).is_none())
    {
        return None;
    }
    Some(reply.tools_needed)
}

/// Select tools for the query, preserving the order the model returned.
/// Empty `custom_input` entries fall back to the raw query.
pub async fn select_tools(
    llm: &DynLlmClient,
    registry: &ToolRegistry,
    query: &str,
) -> Vec<ToolInvocation> {
    let prompt = prompts::tool_selection_prompt(&registry.describe());

    let raw = match llm.complete(&prompt, query).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "tool selection call failed, using default pair");
            return default_invocations(query);
        }
    };

    match parse_selection(&raw, registry) {
        Some(mut invocations) => {
            for inv in &mut invocations {
                if inv.custom_input.trim().is_empty() {
                    inv.custom_input = query.to_string();
                }
            }
            debug!(
                tools = ?invocations.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
                "model selected tools"
            );
            invocations
        }
        None => {
            warn!("tool selection reply was unusable, using default pair");
            default_invocations(query)
        }
    }
}
