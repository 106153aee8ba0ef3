//! Command-line surface (spec.md §6).

use clap::Parser;

pub const DEFAULT_PORT: u16 = 7890;

#[derive(Debug, Parser)]
#[command(
    name = "gasoline",
    version,
    about = "Localhost browser-observability daemon exposing captured telemetry to AI assistants over MCP"
)]
pub struct Cli {
    /// TCP port for the loopback HTTP surface and /mcp endpoint.
    #[arg(long, env = "GASOLINE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// HTTP only; do not also run the stdio MCP transport.
    #[arg(long)]
    pub server: bool,

    /// Detach to the background after a successful bind.
    #[arg(long)]
    pub daemon: bool,

    /// Keep the HTTP surface running after the stdio MCP transport disconnects.
    #[arg(long)]
    pub persist: bool,

    /// Do not attempt to bind; require an existing daemon and bridge stdio to it.
    #[arg(long)]
    pub connect: bool,

    /// Send SIGTERM to the daemon on this port and remove its pid file.
    #[arg(long)]
    pub stop: bool,

    /// Verify the environment (port free, or owned by a matching-version daemon) and exit.
    #[arg(long)]
    pub check: bool,

    /// Require the `X-Gasoline-Key` header on every HTTP request.
    #[arg(long = "api-key", env = "GASOLINE_API_KEY")]
    pub api_key: Option<String>,

    /// Internal marker set on the re-exec'd child when detaching via --daemon.
    #[arg(long, hide = true)]
    pub daemon_child: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_documented_port() {
        let cli = Cli::parse_from(["gasoline"]);
        assert_eq!(cli.port, DEFAULT_PORT);
        assert!(!cli.server);
        assert!(!cli.daemon);
        assert!(cli.api_key.is_none());
    }

    #[test]
    fn parses_port_and_api_key() {
        let cli = Cli::parse_from(["gasoline", "--port", "9001", "--api-key", "secret"]);
        assert_eq!(cli.port, 9001);
        assert_eq!(cli.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn parses_every_boolean_flag() {
        let cli = Cli::parse_from([
            "gasoline", "--server", "--daemon", "--persist", "--connect", "--stop", "--check",
        ]);
        assert!(cli.server && cli.daemon && cli.persist && cli.connect && cli.stop && cli.check);
    }
}
