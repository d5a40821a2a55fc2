use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// earshot: proximity voice for shared game sessions.
#[derive(Parser, Debug)]
#[command(name = "earshot", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Voice-chat participant id (at most 18 bytes).
    #[arg(long, global = true)]
    pub participant_id: Option<String>,

    /// Position file written by the game.
    #[arg(long, global = true)]
    pub position_file: Option<PathBuf>,

    /// Log filter override, e.g. `debug` or `earshot_relay=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long, global = true)]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the relay hub and join it as a participant.
    Host {
        /// Port to listen on (overrides `[hub] port`).
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Join a hub hosted by another participant.
    Join {
        /// `ws://host:port` or bare `host:port`; defaults to `[session] hub_url`.
        hub: Option<String>,
    },
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_with_port() {
        let args = Args::try_parse_from(["earshot", "host", "--port", "9001"]).unwrap();
        assert_eq!(args.command, Some(Command::Host { port: Some(9001) }));
    }

    #[test]
    fn join_with_bare_address_and_globals() {
        let args = Args::try_parse_from([
            "earshot",
            "join",
            "10.0.0.7:8970",
            "--participant-id",
            "42",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Some(Command::Join {
                hub: Some("10.0.0.7:8970".into())
            })
        );
        assert_eq!(args.participant_id.as_deref(), Some("42"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn print_config_needs_no_subcommand() {
        let args = Args::try_parse_from(["earshot", "--print-config", "--config", "/tmp/e.toml"]).unwrap();
        assert!(args.print_config);
        assert!(args.command.is_none());
        assert_eq!(args.config, Some(PathBuf::from("/tmp/e.toml")));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Args::try_parse_from(["earshot", "serve"]).is_err());
    }
}
