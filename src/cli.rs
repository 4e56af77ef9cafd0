use clap::{Parser, ValueEnum};
use zyppkit::DesiredState;

#[derive(Parser)]
#[command(name = "zyppctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile installed zypper packages against a desired state", long_about = None)]
pub struct Cli {
    /// Package specifiers: name, name=version or name=version-release
    #[arg(required = true, value_name = "SPEC")]
    pub packages: Vec<String>,

    /// Desired package state
    #[arg(short, long, value_enum, default_value_t = StateArg::Present)]
    pub state: StateArg,

    /// Skip GPG signature checking of packages being installed
    #[arg(long)]
    pub disable_gpg_check: bool,

    /// Also pull in packages recommended by the requested ones
    #[arg(long)]
    pub install_recommends: bool,

    /// Report what would change without mutating package state
    #[arg(long)]
    pub check: bool,

    /// Include the collected debug lines in the JSON result
    #[arg(long)]
    pub debug_in_result: bool,

    /// Mirror debug lines to stderr as they are recorded
    #[arg(long)]
    pub debug_in_stderr: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

/// CLI-level state words; `installed` and `removed` are accepted aliases.
#[derive(Clone, Copy, ValueEnum)]
pub enum StateArg {
    Present,
    Installed,
    Latest,
    Absent,
    Removed,
}

impl StateArg {
    pub fn desired(self) -> DesiredState {
        match self {
            Self::Present | Self::Installed => DesiredState::Present,
            Self::Latest => DesiredState::Latest,
            Self::Absent | Self::Removed => DesiredState::Absent,
        }
    }
}
