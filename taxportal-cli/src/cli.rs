use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Tax return filing portal")]
pub struct Cli {
    /// Path to the data file (.json or .db); overrides TAXPORTAL_DATA and the config file
    #[clap(long, global = true)]
    pub data: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with email or phone, then confirm with a one-time code
    Login {
        /// Email address to log in with
        #[clap(long, conflicts_with = "phone")]
        email: Option<String>,

        /// Phone number to log in with
        #[clap(long)]
        phone: Option<String>,

        /// Password (prompted if omitted)
        #[clap(long)]
        password: Option<String>,

        /// One-time code (prompted if omitted)
        #[clap(long)]
        otp: Option<String>,
    },

    /// Create an account, then confirm with a one-time code
    Register {
        #[clap(long)]
        first_name: Option<String>,

        #[clap(long)]
        last_name: Option<String>,

        /// Register with this email address
        #[clap(long, conflicts_with = "phone")]
        email: Option<String>,

        /// Register with this phone number
        #[clap(long)]
        phone: Option<String>,

        /// Password (prompted if omitted)
        #[clap(long)]
        password: Option<String>,

        /// Password confirmation (prompted if omitted)
        #[clap(long)]
        confirm_password: Option<String>,

        /// Agree to the terms and conditions
        #[clap(long)]
        agree_terms: bool,

        /// One-time code (prompted if omitted)
        #[clap(long)]
        otp: Option<String>,
    },

    /// Log out the current user
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage tax returns
    #[clap(subcommand)]
    Returns(ReturnsCommand),

    /// Manage documents attached to a return
    #[clap(subcommand)]
    Doc(DocCommand),

    /// Show recent activity
    Activity {
        /// Number of entries to show
        #[clap(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Data file management
    #[clap(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
pub enum ReturnsCommand {
    /// Create a new return from one or more documents
    New {
        /// Return type (1040 or 1065)
        #[clap(long, short = 't', default_value = "1040")]
        r#type: String,

        /// Display name for the return
        #[clap(long)]
        name: Option<String>,

        /// Additional notes or special instructions
        #[clap(long, default_value = "")]
        notes: String,

        /// Supporting documents (PDF, Word, images; max size from config)
        #[clap(long = "file", short = 'f')]
        files: Vec<PathBuf>,
    },

    /// List returns
    List {
        /// Case-insensitive search over name, type and status
        #[clap(long, short = 's', default_value = "")]
        search: String,
    },

    /// Show a return with its documents
    Show {
        id: String,
    },

    /// Edit a return's fields
    Edit {
        id: String,

        /// New return type (1040 or 1065)
        #[clap(long, short = 't')]
        r#type: Option<String>,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        notes: Option<String>,
    },

    /// Attach more documents to a return
    Attach {
        id: String,

        #[clap(long = "file", short = 'f', required = true)]
        files: Vec<PathBuf>,
    },

    /// Set the review status (Pending, "In Review", Completed)
    Status {
        id: String,
        status: String,
    },

    /// Delete a return
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Show per-status counts
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum DocCommand {
    /// Remove a document from a return
    Remove {
        return_id: String,
        document_id: String,
    },

    /// Set the comment on a document
    Comment {
        return_id: String,
        document_id: String,
        comment: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Print the path and backend of the data file
    Path,

    /// Show key count and size of the data file
    Stats,

    /// Copy all data into another file (backend inferred from extension)
    Migrate {
        /// Destination file
        #[clap(long)]
        to: PathBuf,
    },

    /// Write a JSON backup of all data
    Export {
        output: PathBuf,
    },

    /// Restore a JSON backup, overwriting matching keys
    Import {
        input: PathBuf,
    },
}
