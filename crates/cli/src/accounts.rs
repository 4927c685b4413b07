//! Account commands: create-user, create-superuser and `users`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dialoguer::{Confirm, Password};

use sitekit_core::config::AppConfig;
use sitekit_core::db::Database;
use sitekit_core::users::{
    BcryptHasher, ExtraFields, PasswordPolicy, User, UserAttributes, UserManager, UserQuery,
    UserStore,
};

use crate::style;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Login email of the new account.
    pub email: String,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// Read the password from this environment variable instead of prompting.
    #[arg(long, conflicts_with = "no_password")]
    pub password_env: Option<String>,

    /// Create the account with an unusable password.
    #[arg(long)]
    pub no_password: bool,

    /// Create a regular user without admin-site access.
    #[arg(long)]
    pub no_staff: bool,
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    /// List users ordered by email.
    List {
        /// Case-insensitive search in email, first and last name.
        #[arg(short, long)]
        search: Option<String>,

        /// Only superusers (true) or only non-superusers (false).
        #[arg(long)]
        superuser: Option<bool>,

        /// Only active (true) or only inactive (false) users.
        #[arg(long)]
        active: Option<bool>,

        /// Number of results.
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Show one user with its groups.
    Show {
        /// Login email.
        email: String,
    },
}

// ---------------------------------------------------------------------------
// create-user / create-superuser
// ---------------------------------------------------------------------------

pub fn cmd_create(config: &AppConfig, db: &Database, args: CreateArgs, superuser: bool) -> Result<()> {
    let hasher = BcryptHasher::new(config.auth.bcrypt_cost);
    let manager = UserManager::new(db, &hasher);
    let policy = PasswordPolicy::from_config(&config.auth);

    let attributes = UserAttributes {
        email: args.email.trim(),
        first_name: args.first_name.as_deref(),
        last_name: args.last_name.as_deref(),
    };
    let password = read_password(&args, &policy, &attributes)?;

    let extra = ExtraFields {
        first_name: args.first_name.clone(),
        last_name: args.last_name.clone(),
        is_staff: args.no_staff.then_some(false),
        ..Default::default()
    };

    let user = if superuser {
        manager.create_superuser(&args.email, password.as_deref(), extra)
    } else {
        manager.create_user(&args.email, password.as_deref(), extra)
    }
    .context("failed to create user")?;

    let kind = if superuser { "Superuser" } else { "User" };
    println!("{}", style::success(&format!("{} created: {} ({})", kind, user.email, user)));
    if password.is_none() {
        println!("  {}", style::dim("The account has no usable password."));
    }
    Ok(())
}

/// The raw password to set, or `None` for an unusable one.
///
/// Environment passwords must pass the policy; an interactive password that
/// fails it can still be accepted after confirmation.
fn read_password(
    args: &CreateArgs,
    policy: &PasswordPolicy,
    attributes: &UserAttributes<'_>,
) -> Result<Option<String>> {
    if args.no_password {
        return Ok(None);
    }

    if let Some(var) = &args.password_env {
        let password = std::env::var(var)
            .with_context(|| format!("environment variable {} is not set", var))?;
        policy
            .validate(&password, attributes)
            .with_context(|| format!("password from {} was rejected", var))?;
        return Ok(Some(password));
    }

    loop {
        let password = Password::new()
            .with_prompt("Password")
            .with_confirmation("Password (again)", "Error: your passwords didn't match.")
            .interact()
            .context("failed to read password")?;

        match policy.validate(&password, attributes) {
            Ok(()) => return Ok(Some(password)),
            Err(e) => {
                println!("{}", style::warn(&e.to_string()));
                let bypass = Confirm::new()
                    .with_prompt("Bypass password validation and create user anyway?")
                    .default(false)
                    .interact()
                    .context("failed to read confirmation")?;
                if bypass {
                    return Ok(Some(password));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// users list / show
// ---------------------------------------------------------------------------

pub fn cmd_users(config: &AppConfig, db: &Database, action: UsersAction) -> Result<()> {
    match action {
        UsersAction::List {
            search,
            superuser,
            active,
            limit,
        } => {
            let users = db
                .list_users(&UserQuery {
                    search,
                    is_superuser: superuser,
                    is_active: active,
                    limit: Some(limit),
                    offset: None,
                })
                .context("failed to list users")?;

            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }

            println!();
            println!("{}", style::header(&format!("Users ({})", users.len())));
            println!();
            println!("{}", users_table(&users));
            println!();
            Ok(())
        }

        UsersAction::Show { email } => {
            let hasher = BcryptHasher::new(config.auth.bcrypt_cost);
            let manager = UserManager::new(db, &hasher);
            let user = manager
                .get_by_email(&email)
                .context("database error")?
                .ok_or_else(|| anyhow::anyhow!("user '{}' not found", email))?;
            let groups = manager.group_names(&user).context("failed to load groups")?;
            let tz = config.i18n.tz()?;

            println!("User: {}", user.email);
            println!("======{}", "=".repeat(user.email.len()));
            println!();
            println!("  Id           : {}", user.id);
            println!("  Full name    : {}", user.full_name());
            println!("  Staff        : {}", style::flag(user.is_staff));
            println!("  Superuser    : {}", style::flag(user.is_superuser));
            println!("  Active       : {}", style::flag(user.is_active));
            println!("  Joined       : {}", local_time(user.date_joined, tz));
            println!(
                "  Last login   : {}",
                user.last_login
                    .map(|t| local_time(t, tz))
                    .unwrap_or_else(|| "never".to_string())
            );
            println!(
                "  Groups       : {}",
                if groups.is_empty() {
                    "-".to_string()
                } else {
                    groups.join(", ")
                }
            );
            Ok(())
        }
    }
}

/// `2024-01-15 13:00:00 CET` in the configured zone.
fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

fn users_table(users: &[User]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Email", "Full name", "Admin", "Active", "Joined"]);

    for u in users {
        table.add_row(vec![
            Cell::new(&u.email),
            Cell::new(u.full_name()),
            Cell::new(style::flag(u.is_admin())),
            Cell::new(style::flag(u.is_active)),
            Cell::new(u.date_joined.format("%Y-%m-%d").to_string()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(email: &str) -> CreateArgs {
        CreateArgs {
            email: email.into(),
            first_name: None,
            last_name: None,
            password_env: None,
            no_password: true,
            no_staff: false,
        }
    }

    fn setup() -> (AppConfig, Database) {
        let mut config = AppConfig::default();
        config.auth.bcrypt_cost = 4;
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        (config, db)
    }

    #[test]
    fn test_create_superuser_without_password() {
        let (config, db) = setup();
        cmd_create(&config, &db, args("root@example.com"), true).unwrap();

        let user = db.get_user_by_email("root@example.com").unwrap().unwrap();
        assert!(user.is_superuser && user.is_staff && user.is_active);
        assert!(user.password_hash.starts_with('!'));
    }

    #[test]
    fn test_create_user_no_staff_flag() {
        let (config, db) = setup();
        let mut create = args("plain@example.com");
        create.no_staff = true;
        cmd_create(&config, &db, create, false).unwrap();

        let user = db.get_user_by_email("plain@example.com").unwrap().unwrap();
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
    }

    #[test]
    fn test_password_env_must_pass_policy() {
        let (config, db) = setup();
        let var = format!("SITEKIT_TEST_PW_{}", std::process::id());
        std::env::set_var(&var, "12345678");

        let mut create = args("env@example.com");
        create.no_password = false;
        create.password_env = Some(var.clone());
        assert!(cmd_create(&config, &db, create, false).is_err());
        assert!(db.get_user_by_email("env@example.com").unwrap().is_none());

        std::env::set_var(&var, "Velvet-Orbit-913");
        let mut create = args("env@example.com");
        create.no_password = false;
        create.password_env = Some(var.clone());
        cmd_create(&config, &db, create, false).unwrap();
        std::env::remove_var(&var);

        let hasher = BcryptHasher::new(4);
        let manager = UserManager::new(&db, &hasher);
        assert!(manager
            .authenticate("env@example.com", "Velvet-Orbit-913")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_local_time_uses_zone_abbreviation() {
        let at = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(local_time(at, chrono_tz::Europe::Berlin), "2024-01-15 13:00:00 CET");
        assert_eq!(local_time(at, chrono_tz::UTC), "2024-01-15 12:00:00 UTC");
    }

    #[test]
    fn test_users_table_has_one_row_per_user() {
        let users = vec![User::new("a@example.com"), User::new("b@example.com")];
        assert_eq!(users_table(&users).row_iter().count(), 2);
    }
}
