pub mod config;

use clap::{Parser, Subcommand};

/// Demo server for the MDK session middleware.
#[derive(Debug, Parser)]
#[command(name = "mdk-demo", version, about)]
pub struct Cli {
    /// Port to listen on (overrides `server.port`).
    pub port: Option<u16>,

    /// Path to the config file (defaults to `$MDK_CONFIG` or `config.toml`).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the demo server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `explicit`, else the path in `MDK_CONFIG`,
/// else `config.toml`. A missing file yields the defaults. Returns the
/// parsed [`Config`](mdk_domain::config::Config) and the path that was used.
pub fn load_config(
    explicit: Option<&str>,
) -> anyhow::Result<(mdk_domain::config::Config, String)> {
    let config_path = match explicit {
        Some(p) => p.to_owned(),
        None => std::env::var("MDK_CONFIG").unwrap_or_else(|_| "config.toml".into()),
    };

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        mdk_domain::config::Config::default()
    };

    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_port_parses() {
        let cli = Cli::parse_from(["mdk-demo", "9123"]);
        assert_eq!(cli.port, Some(9123));
        assert!(cli.command.is_none());
    }

    #[test]
    fn config_subcommand_parses() {
        let cli = Cli::parse_from(["mdk-demo", "config", "validate", "--config", "x.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Validate))
        ));
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let (config, path) = load_config(Some("/nonexistent/mdk-demo.toml")).unwrap();
        assert_eq!(path, "/nonexistent/mdk-demo.toml");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let path = std::env::temp_dir().join(format!("mdk-demo-{}.toml", std::process::id()));
        std::fs::write(&path, "[server\nport = ").unwrap();
        let err = load_config(Some(path.to_str().unwrap())).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().starts_with("parsing "));
    }
}
