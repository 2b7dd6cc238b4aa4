//! `hotload serve` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use hotload_artifact::ArtifactSelection;
use hotload_config::{CliSettings, Config};
use hotload_server::{Server, local_network_host, server_config_from_config, shutdown_signal};

use crate::build_process::BuildProcess;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover hotload.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// WebSocket port for pushing builds (overrides config).
    #[arg(long, env = "HOTLOAD_WS_PORT")]
    ws_port: Option<u16>,

    /// Status page port (overrides config).
    #[arg(long, env = "HOTLOAD_HTTP_PORT")]
    http_port: Option<u16>,

    /// Build output directory to watch (overrides config).
    #[arg(short, long)]
    dist_dir: Option<PathBuf>,

    /// Plugin metadata file (overrides config).
    #[arg(long)]
    plugin_json: Option<PathBuf>,

    /// Quiet period in milliseconds before a build is pushed (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Artifact selection when several builds exist: newest or first (overrides config).
    #[arg(long)]
    selection: Option<ArtifactSelection>,

    /// Watch-mode build command to run alongside the server, such as
    /// "vite build --watch --mode dev" (overrides config; none by default).
    #[arg(long)]
    build_command: Option<String>,

    /// Enable verbose output (connection and dispatch logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let server = Server::bind(server_config_from_config(&config)).await?;
        print_banner(&output, &server, &config)?;

        let build = config
            .build_resolved
            .command
            .as_deref()
            .and_then(|command| start_build(&output, command, &working_dir(&config)));

        let result = server.serve(shutdown_signal()).await;

        if let Some(build) = build {
            build.stop().await;
        }
        result?;

        output.success("Server stopped");
        Ok(())
    }

    /// Collect overrides for the loaded configuration.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            ws_port: self.ws_port,
            http_port: self.http_port,
            dist_dir: self.dist_dir.clone(),
            plugin_json: self.plugin_json.clone(),
            debounce_ms: self.debounce_ms,
            selection: self.selection,
            build_command: self.build_command.clone(),
        }
    }
}

/// Print connection instructions.
fn print_banner(output: &Output, server: &Server, config: &Config) -> Result<(), CliError> {
    let ws_port = server.live_addr()?.port();
    let http_port = server.status_addr()?.port();
    let metadata = server.metadata();

    output.heading("Plugin development server running");
    output.address("WebSocket (LAN):", &format!("ws://{}:{ws_port}", local_network_host()));
    output.address("WebSocket (local):", &format!("ws://localhost:{ws_port}"));
    output.address("Status page:", &format!("http://localhost:{http_port}"));
    output.field(
        "Output directory:",
        &config.build_resolved.dist_dir.display().to_string(),
    );
    output.field(
        "Plugin:",
        &format!("{} v{}", metadata.name, metadata.version),
    );
    output.rule();
    if config.build_resolved.command.is_none() {
        output.info("No build command configured; run your bundler in watch mode separately.");
    }
    output.info("Waiting for builds... press Ctrl+C to stop.");
    Ok(())
}

/// Start the build command, reporting a spawn failure without aborting.
fn start_build(output: &Output, command: &str, cwd: &Path) -> Option<BuildProcess> {
    match BuildProcess::spawn(command, cwd) {
        Ok(process) => {
            output.success(&format!("Running build command: {command}"));
            Some(process)
        }
        Err(e) => {
            output.warning(&format!("Failed to start build command '{command}': {e}"));
            None
        }
    }
}

/// Directory the build command runs in: next to the config file, or the
/// current directory.
fn working_dir(config: &Config) -> PathBuf {
    config
        .config_path
        .as_ref()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ServeArgs,
    }

    #[test]
    fn test_parse_overrides() {
        let cli = TestCli::parse_from([
            "hotload",
            "--host",
            "127.0.0.1",
            "--ws-port",
            "9000",
            "--dist-dir",
            "build",
            "--debounce-ms",
            "250",
            "--selection",
            "first",
            "--build-command",
            "npm run dev",
            "-v",
        ]);

        let settings = cli.args.cli_settings();

        assert_eq!(settings.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(settings.ws_port, Some(9000));
        assert_eq!(settings.dist_dir, Some(PathBuf::from("build")));
        assert_eq!(settings.debounce_ms, Some(250));
        assert_eq!(settings.selection, Some(ArtifactSelection::First));
        assert_eq!(settings.build_command.as_deref(), Some("npm run dev"));
        assert!(cli.args.verbose);
    }

    #[test]
    fn test_parse_defaults_leave_config_untouched() {
        let cli = TestCli::parse_from(["hotload"]);

        let settings = cli.args.cli_settings();

        assert!(settings.host.is_none());
        assert!(settings.dist_dir.is_none());
        assert!(settings.selection.is_none());
        assert!(settings.build_command.is_none());
        assert!(!cli.args.verbose);
    }

    #[test]
    fn test_parse_rejects_unknown_selection() {
        let result = TestCli::try_parse_from(["hotload", "--selection", "oldest"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_build_command_help_mentions_no_default() {
        let command = TestCli::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == "build_command")
            .unwrap();
        let help = arg.get_help().unwrap().to_string();

        assert!(help.contains("vite build --watch --mode dev"));
        assert!(help.contains("none by default"));
    }

    #[test]
    fn test_working_dir_next_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("hotload.toml");
        std::fs::write(&config_path, "").unwrap();

        let config = Config::load(Some(&config_path), None).unwrap();

        assert_eq!(working_dir(&config), dir.path());
    }
}
