//! CLI argument parsing for the `plc-copilot` binary.
//!
//! The binary drives one interaction from a JSON request, or runs a
//! housekeeping command against the session store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::foundation::SessionId;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "plc-copilot",
    version,
    about = "Context-centric PLC programming copilot",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Interact(InteractArgs),
    Cleanup(CleanupArgs),
    Stats(StatsArgs),
}

/// Runs one interaction and prints the response JSON.
#[derive(Parser, Debug)]
#[command(about = "Process one interaction request (JSON) and print the response")]
pub struct InteractArgs {
    /// Interaction request JSON; read from stdin when omitted
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Upload to attach; may be repeated
    #[arg(long = "document", value_name = "FILE")]
    pub documents: Vec<PathBuf>,

    /// Session that owns the uploads; a new one is created when omitted
    #[arg(long, value_name = "UUID")]
    pub session: Option<SessionId>,

    /// Pretty-print the response
    #[arg(long)]
    pub pretty: bool,
}

/// Releases session uploads.
#[derive(Parser, Debug)]
#[command(about = "Release stored uploads for sessions")]
pub struct CleanupArgs {
    /// Session to release; may be repeated
    #[arg(long = "session", value_name = "UUID")]
    pub sessions: Vec<SessionId>,

    /// Also release every session past the inactivity timeout
    #[arg(long)]
    pub expired: bool,
}

/// Prints session and usage statistics.
#[derive(Parser, Debug)]
#[command(about = "Show session storage statistics")]
pub struct StatsArgs {
    /// Pretty-print the statistics
    #[arg(long)]
    pub pretty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interact_with_documents() {
        let session = SessionId::new();
        let args = RootArgs::try_parse_from([
            "plc-copilot",
            "interact",
            "--request",
            "req.json",
            "--document",
            "io.csv",
            "--document",
            "spec.txt",
            "--session",
            &session.to_string(),
        ])
        .unwrap();

        let Command::Interact(interact) = args.command else {
            panic!("expected interact");
        };
        assert_eq!(interact.request, Some(PathBuf::from("req.json")));
        assert_eq!(interact.documents.len(), 2);
        assert_eq!(interact.session, Some(session));
        assert!(!interact.pretty);
    }

    #[test]
    fn parses_cleanup_flags() {
        let args = RootArgs::try_parse_from(["plc-copilot", "cleanup", "--expired"]).unwrap();

        let Command::Cleanup(cleanup) = args.command else {
            panic!("expected cleanup");
        };
        assert!(cleanup.expired);
        assert!(cleanup.sessions.is_empty());
    }

    #[test]
    fn rejects_malformed_session_id() {
        let result = RootArgs::try_parse_from(["plc-copilot", "cleanup", "--session", "not-a-uuid"]);
        assert!(result.is_err());
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(RootArgs::try_parse_from(["plc-copilot"]).is_err());
    }
}
