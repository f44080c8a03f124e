use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sessionward", about = "Token and refresh-session lifecycle")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a login chain for an already-authenticated subject.
    Login {
        #[arg(long)]
        subject: String,
    },
    /// Exchange a refresh token for a new token pair.
    Refresh {
        #[arg(long)]
        token: String,
    },
    /// Revoke the session behind a refresh token and optionally blacklist an access token.
    Logout {
        #[arg(long)]
        refresh: String,
        #[arg(long)]
        access: Option<String>,
    },
    /// Resolve an access token to its subject.
    Authorize {
        #[arg(long)]
        token: String,
    },
    /// Run one housekeeping pass.
    Sweep,
}
