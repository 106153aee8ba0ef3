//! Transport-agnostic MCP server: tool dispatch, the capture-store fan-out
//! into the analyzers, the interact command channel, and the cooperative
//! alarm scheduler. `gasoline-http` and `gasoline-stdio` each own a
//! transport and a loop; both hand every request to the [`McpServer`]
//! built here and otherwise know nothing about each other.

pub mod alarms;
pub mod commands;
pub mod fanout;
pub mod history;
pub mod state;
pub mod tools;

pub use state::AppState;
pub use tools::McpServer;

use std::sync::Arc;

/// Wires the fan-out task and every alarm onto `state` and returns their
/// join handles. Call once per process, after `AppState::new`.
pub fn spawn_background_tasks(state: Arc<AppState>) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = vec![fanout::spawn_fanout_task(state.clone())];
    handles.extend(alarms::spawn_all(state));
    handles
}
