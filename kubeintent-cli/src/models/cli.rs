// kubeintent-cli/src/models/cli.rs
use clap::{ArgAction, Parser, Subcommand};
use uuid::Uuid;

/// kubeintent: describe a cluster operation in plain language and let the
/// assistant run the matching kubectl commands.
/// Starts an interactive session by default, or handles a single request with --task.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Handle a single request non-interactively.
    #[arg(short, long)]
    pub task: Option<String>,

    /// Print replies as JSON instead of formatted text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recorded interactions, newest first.
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one recorded interaction.
    View { id: Uuid },
    /// Delete one recorded interaction.
    Delete {
        id: Uuid,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Check a command against the safety policy without running it.
    Check { command: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task() {
        let cli = Cli::parse_from(["kubeintent", "-vv", "--task", "list pods in billing"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.task.as_deref(), Some("list pods in billing"));
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["kubeintent", "list", "--limit", "5", "--json"]);
        assert!(matches!(cli.command, Some(Commands::List { limit: 5 })));
        assert!(cli.json);

        let cli = Cli::parse_from(["kubeintent", "check", "kubectl delete ns prod"]);
        match cli.command {
            Some(Commands::Check { command }) => assert_eq!(command, "kubectl delete ns prod"),
            other => panic!("unexpected command {:?}", other),
        }

        let id = Uuid::new_v4();
        let cli = Cli::parse_from(["kubeintent", "delete", &id.to_string(), "-y"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Delete { id: parsed, yes: true }) if parsed == id
        ));
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        assert!(Cli::try_parse_from(["kubeintent", "view", "not-a-uuid"]).is_err());
    }
}
