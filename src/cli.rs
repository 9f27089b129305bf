//! Command-line surface — §6: `dhcv6d server --config PATH [--check]
//! [--foreground]`, with exit codes 0 (clean), 2 (bad arguments), 3
//! (configuration error), 4 (runtime/bind error).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// exit code used when the process ran and terminated normally, or a
/// `--check` passed validation.
pub const EXIT_OK: i32 = 0;
/// exit code for a configuration parse/build error (§6).
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// exit code for a socket bind failure (§6).
pub const EXIT_BIND_ERROR: i32 = 3;
/// exit code for a control command requesting shutdown while the
/// process had encountered a runtime error (§6).
pub const EXIT_SHUTDOWN_ERROR: i32 = 4;

#[derive(Debug, Parser)]
#[command(name = "dhcv6d", about = "A DHCPv6 server core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// validate configuration and, unless `--check` is given, run the
    /// server until a `shutdown` control command or signal.
    Server(ServerArgs),
}

#[derive(Debug, Args)]
pub struct ServerArgs {
    /// path to the YAML configuration document
    #[arg(long)]
    pub config: PathBuf,

    /// parse and validate the configuration, then exit without binding
    /// any sockets
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// stay attached to the controlling terminal instead of the
    /// process manager backgrounding it; this core never daemonizes
    /// itself either way, so this flag only affects log destination in
    /// the binary that wires `cli` up
    #[arg(long, default_value_t = false)]
    pub foreground: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_server_subcommand() {
        let cli = Cli::parse_from(["dhcv6d", "server", "--config", "dhcv6d.yaml", "--check"]);
        match cli.command {
            Command::Server(args) => {
                assert_eq!(args.config, PathBuf::from("dhcv6d.yaml"));
                assert!(args.check);
                assert!(!args.foreground);
            }
        }
    }
}
