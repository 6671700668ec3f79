//! Residence Hub CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rh-cli migrate
//!
//! # Create a user
//! rh-cli user create -e admin@example.com -n "Admin Name" -r admin --verified
//!
//! # Change a user's role
//! rh-cli user set-role -e admin@example.com -r super_admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create users
//! - `user set-role` - Change a user's role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "rh-cli")]
#[command(author, version, about = "Residence Hub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`user`, `caretaker`, `manager`, `admin`, `super_admin`)
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Mark the email as verified
        #[arg(long)]
        verified: bool,
    },
    /// Change the role of an existing user
    SetRole {
        /// Email address of the user
        #[arg(short, long)]
        email: String,

        /// New role
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                verified,
            } => {
                commands::user::create(&email, &name, &role, verified).await?;
            }
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_set_role() {
        let cli = Cli::try_parse_from(["rh-cli", "user", "set-role", "-e", "a@b.co", "-r", "admin"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::User {
                action: UserAction::SetRole { .. }
            })
        ));
    }
}
