//! `interact { action, ... }` — spec.md §4.3/§4.9. Gated by the AI Web
//! Pilot toggle; when enabled, bridges to the extension via the command
//! rendezvous channel and blocks for its answer (or the command's timeout).

use gasoline_core::GasolineError;
use gasoline_types::{CommandKind, ToolResult};
use serde::Deserialize;

use crate::commands::CommandOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct InteractArgs {
    action: CommandKind,
}

pub async fn handle(state: &AppState, arguments: serde_json::Value) -> ToolResult {
    if !state.capture_settings().ai_web_pilot_enabled {
        return ToolResult::error(serde_json::json!({
            "error": "ai_web_pilot_disabled",
            "message": "AI Web Pilot is disabled; enable it with configure { action: \"capture\", ai_web_pilot_enabled: true }",
        }));
    }

    let args: InteractArgs = match serde_json::from_value(arguments.clone()) {
        Ok(a) => a,
        Err(err) => {
            return ToolResult::error(
                GasolineError::invalid_parameter("action", err.to_string()).as_tool_payload(),
            )
        }
    };

    match state.commands.submit(args.action, arguments).await {
        CommandOutcome::Answered(response) if response.ok => {
            ToolResult::ok(serde_json::json!({ "result": response.result }))
        }
        CommandOutcome::Answered(response) => ToolResult::error(serde_json::json!({
            "error": "command_failed",
            "message": response.error.unwrap_or_else(|| "extension reported failure".to_string()),
        })),
        CommandOutcome::TimedOut => ToolResult::error(serde_json::json!({
            "error": "command_timed_out",
            "message": "no response from extension before the command's timeout",
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn state() -> std::sync::Arc<AppState> {
        let dir = tempfile::tempdir().unwrap();
        AppState::new(dir.path().to_path_buf(), None, HashSet::new())
    }

    #[tokio::test]
    async fn disabled_pilot_short_circuits() {
        let result = handle(&state(), serde_json::json!({"action": "click"})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn enabled_pilot_times_out_without_extension() {
        let state = state();
        state
            .process
            .capture
            .apply(|settings| settings.ai_web_pilot_enabled = true)
            .unwrap();

        let handle_fut = tokio::spawn({
            let state = state.clone();
            async move { handle(&state, serde_json::json!({"action": "click"})).await }
        });
        let command = state.commands.poll(std::time::Duration::from_millis(200)).await;
        assert!(command.is_some());
        handle_fut.abort();
    }
}
