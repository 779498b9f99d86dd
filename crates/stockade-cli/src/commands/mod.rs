//! CLI command definitions and dispatch.

pub mod exec;
pub mod ps;
pub mod rm;
pub mod run;
pub mod start;
pub mod status;
pub mod stop;

use clap::{Parser, Subcommand};
use stockade_core::host::LinuxHost;
use stockade_runtime::manager::ContainerManager;

use crate::RootArgs;

/// Stockade: minimal, daemon-less container manager.
#[derive(Parser, Debug)]
#[command(name = "stockade", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Host roots.
    #[command(flatten)]
    pub roots: RootArgs,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and launch a new container.
    Run(run::RunArgs),
    /// Relaunch a stopped or failed container.
    Start(start::StartArgs),
    /// List containers and their state.
    #[command(visible_alias = "list")]
    Ps(ps::PsArgs),
    /// Execute a command inside a running container.
    Exec(exec::ExecArgs),
    /// Show a container's state and resource usage.
    Status(status::StatusArgs),
    /// Stop a running container.
    Stop(stop::StopArgs),
    /// Remove a stopped container and its resources.
    Rm(rm::RmArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let manager = ContainerManager::new(&LinuxHost, cli.roots.runtime_config());
    match cli.command {
        Command::Run(args) => run::execute(&manager, args),
        Command::Start(args) => start::execute(&manager, &args),
        Command::Ps(args) => ps::execute(&manager, &args),
        Command::Exec(args) => exec::execute(&manager, args),
        Command::Status(args) => status::execute(&manager, &args),
        Command::Stop(args) => stop::execute(&manager, &args),
        Command::Rm(args) => rm::execute(&manager, &args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_limits_and_rootfs() {
        let cli = Cli::try_parse_from(["stockade", "run", "--memory", "100M", "--cpu", "0.5", "/images/base"])
            .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.memory, "100M");
        assert_eq!(args.cpu, Some(0.5));
        assert_eq!(args.rootfs, "/images/base");
    }

    #[test]
    fn list_is_an_alias_of_ps() {
        let cli = Cli::try_parse_from(["stockade", "list"]).unwrap();
        assert!(matches!(cli.command, Command::Ps(_)));
    }

    #[test]
    fn exec_keeps_hyphenated_command_arguments() {
        let cli = Cli::try_parse_from(["stockade", "exec", "abc", "ls", "-la", "/"]).unwrap();
        let Command::Exec(args) = cli.command else {
            panic!("expected exec");
        };
        assert_eq!(args.command, vec!["ls", "-la", "/"]);
    }

    #[test]
    fn exec_requires_a_command() {
        assert!(Cli::try_parse_from(["stockade", "exec", "abc"]).is_err());
    }
}
