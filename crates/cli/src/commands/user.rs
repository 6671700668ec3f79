//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a verified administrator
//! rh-cli user create -e admin@example.com -n "Admin Name" -r admin --verified
//!
//! # Promote an existing user
//! rh-cli user set-role -e caretaker@example.com -r caretaker
//! ```

use residence_hub_core::{Email, Role, UserId};
use residence_hub_server::db::store::NewUser;
use residence_hub_server::db::{PgStore, UserStore};

use super::{CommandError, connect};

fn parse_role(role: &str) -> Result<Role, CommandError> {
    role.parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))
}

fn parse_email(email: &str) -> Result<Email, CommandError> {
    Email::parse(email).map_err(|e| CommandError::InvalidEmail(format!("{email}: {e}")))
}

/// Create a user.
///
/// # Errors
///
/// Returns `CommandError` for an invalid role or email, or if the email is
/// already registered.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    verified: bool,
) -> Result<UserId, CommandError> {
    let role = parse_role(role)?;
    let email = parse_email(email)?;

    let store = PgStore::new(connect().await?);
    tracing::info!("Creating user: {} ({})", email, role);

    let user = store
        .create_user(NewUser {
            name: name.to_owned(),
            email,
            role,
            is_verified: verified,
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Change the role of the user registered under `email`.
///
/// # Errors
///
/// Returns `CommandError` for an invalid role or email, or if no user has
/// the email.
pub async fn set_role(email: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_role(role)?;
    let email = parse_email(email)?;

    let store = PgStore::new(connect().await?);
    let user = store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(email.to_string()))?;

    let updated = store.set_user_role(user.id, role).await?;
    tracing::info!(
        "Role of {} changed from {} to {}",
        updated.email,
        user.role,
        updated.role
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_accepts_wire_names() {
        assert!(matches!(parse_role("super_admin"), Ok(Role::SuperAdmin)));
        assert!(matches!(
            parse_role("janitor"),
            Err(CommandError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_parse_email_rejects_garbage() {
        assert!(matches!(
            parse_email("not-an-email"),
            Err(CommandError::InvalidEmail(_))
        ));
        assert!(parse_email("Someone@Example.com").is_ok());
    }
}
