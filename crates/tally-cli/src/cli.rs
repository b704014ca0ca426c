use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track spending offline and sync the ledger between two devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local ledger database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the CLI config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new transaction
    #[command(alias = "new")]
    Add {
        /// Signed amount, e.g. -12.50
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Spending category
        #[arg(short, long, value_enum, default_value_t = CategoryArg::Other)]
        category: CategoryArg,
        /// Who recorded it (defaults to the configured author)
        #[arg(long, value_name = "NAME")]
        author: Option<String>,
        /// When the spend happened, RFC 3339 or YYYY-MM-DD (defaults to now)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing transaction
    Edit {
        /// Transaction ID or unique ID prefix
        id: String,
        #[command(flatten)]
        fields: EditFields,
    },
    /// Delete an existing transaction
    Delete {
        /// Transaction ID or unique ID prefix
        id: String,
    },
    /// Merge two ledger files without touching the local database
    Merge {
        /// JSON array of the local replica's transactions
        #[arg(long, value_name = "PATH")]
        local: PathBuf,
        /// JSON array of the remote replica's transactions
        #[arg(long, value_name = "PATH")]
        remote: PathBuf,
        /// JSON array of identifiers present locally at the last sync
        #[arg(long, value_name = "PATH")]
        previous: Option<PathBuf>,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Exchange the ledger with another device through payload files
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Configure this device
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct EditFields {
    /// New signed amount
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<String>,
    /// New category
    #[arg(short, long, value_enum)]
    pub category: Option<CategoryArg>,
    /// New author name
    #[arg(long, value_name = "NAME")]
    pub author: Option<String>,
    /// New spend date, RFC 3339 or YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CategoryArg {
    Grocery,
    Cafe,
    Transport,
    Entertainment,
    Bills,
    Other,
}

impl From<CategoryArg> for tally_core::Category {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Grocery => Self::Grocery,
            CategoryArg::Cafe => Self::Cafe,
            CategoryArg::Transport => Self::Transport,
            CategoryArg::Entertainment => Self::Entertainment,
            CategoryArg::Bills => Self::Bills,
            CategoryArg::Other => Self::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Elvish,
    #[value(name = "powershell")]
    PowerShell,
}

impl From<CompletionShell> for clap_complete::Shell {
    fn from(value: CompletionShell) -> Self {
        match value {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
            CompletionShell::Elvish => Self::Elvish,
            CompletionShell::PowerShell => Self::PowerShell,
        }
    }
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Write this device's ledger as an opening payload for a peer
    Offer {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Apply a payload received from a peer, writing the reply if one is due
    Receive {
        /// Payload file received from the peer
        payload: PathBuf,
        /// Where to write the reply (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Show which side opens the round with a peer
    Role {
        /// Peer device id
        #[arg(long, value_name = "ID")]
        peer: String,
    },
    /// List peers this device has synced with
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the device config
    Init {
        /// Default author name for new transactions
        #[arg(long, value_name = "NAME")]
        author: Option<String>,
        /// Device id used as the peer id during sync (generated when unset)
        #[arg(long, value_name = "ID")]
        device_id: Option<String>,
        /// Default ledger database path
        #[arg(long, value_name = "PATH")]
        db_path: Option<PathBuf>,
    },
    /// Print the current config
    Show,
}
