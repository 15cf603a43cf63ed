use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drivelens")]
#[command(about = "drivelens - list, search, and read Google Drive files as text")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  drivelens auth start --client-id <ID>         Begin Google device authorization
  drivelens auth poll --client-id <ID> --device-code <CODE>
  drivelens list --limit 10                     First ten files
  drivelens search \"name contains 'report'\"     Native Drive query
  drivelens read --name notes.txt               Resolve a name, or list candidates
  drivelens read --id 1AbC...                   Read a file by id

\x1b[1;36mEnvironment:\x1b[0m
  DRIVELENS_GOOGLE_ACCESS_TOKEN                 Use this bearer token as-is
  DRIVELENS_CONFIG                              TOML settings file
  DRIVELENS_AUTH_PATH                           Credential store location")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "DRIVELENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List files in provider order
    #[command(alias = "ls")]
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  drivelens list                    First page with the configured limit
  drivelens list --offset 25 --limit 25
  drivelens list --output json      {data, count, offset, limit}")]
    List {
        /// Files to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Page size (default from config)
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Run a Drive query string, passed through unchanged
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  drivelens search \"mimeType='application/pdf'\"
  drivelens search \"name contains 'budget'\" --max 5")]
    Search {
        /// Drive query, e.g. name contains 'report'
        query: String,

        /// Maximum matches
        #[arg(long)]
        max: Option<u32>,
    },

    /// Read a file as text by id or by exact name
    #[command(group(ArgGroup::new("target").required(true).args(["id", "name"])))]
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  drivelens read --id 1AbCdEf
  drivelens read --name \"Quarterly notes.txt\"")]
    Read {
        /// Drive file id
        #[arg(long)]
        id: Option<String>,

        /// Exact file name; ambiguous names list candidates instead
        #[arg(long)]
        name: Option<String>,
    },

    /// Google device-flow authorization and stored credential status
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum AuthAction {
    /// Request a device code and show where to enter it
    Start {
        #[arg(long, env = "DRIVELENS_GOOGLE_CLIENT_ID")]
        client_id: String,

        /// Space-separated scopes (default drive.readonly)
        #[arg(long)]
        scopes: Option<String>,
    },

    /// Exchange an approved device code for tokens and store them
    Poll {
        #[arg(long, env = "DRIVELENS_GOOGLE_CLIENT_ID")]
        client_id: String,

        #[arg(long, env = "DRIVELENS_GOOGLE_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,

        /// Prompt for the client secret without echo
        #[arg(long)]
        ask_secret: bool,

        #[arg(long)]
        device_code: String,
    },

    /// Show which credentials are available
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// Plain text output
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["drivelens", "read"]).is_err());
        assert!(Cli::try_parse_from(["drivelens", "read", "--id", "a", "--name", "b"]).is_err());
        let cli = Cli::try_parse_from(["drivelens", "read", "--name", "notes.txt"]).unwrap();
        assert!(matches!(cli.command, Commands::Read { name: Some(_), id: None }));
    }

    #[test]
    fn output_flag_is_global() {
        let cli = Cli::try_parse_from(["drivelens", "list", "--limit", "3", "--output", "json"])
            .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::List { offset: 0, limit: Some(3) }));
    }
}
