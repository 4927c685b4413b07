//! Group commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use sitekit_core::db::Database;
use sitekit_core::users::{normalize_email, Group, UserStore};

use crate::style;

#[derive(Subcommand, Debug)]
pub enum GroupsAction {
    /// List all groups.
    List,
    /// Create a group.
    Create {
        name: String,
    },
    /// Add a user to a group.
    Add {
        /// Login email of the user.
        email: String,
        /// Group name.
        group: String,
    },
    /// Remove a user from a group.
    Remove {
        /// Login email of the user.
        email: String,
        /// Group name.
        group: String,
    },
}

pub fn cmd_groups(db: &Database, action: GroupsAction) -> Result<()> {
    match action {
        GroupsAction::List => {
            let groups = db.list_groups().context("failed to list groups")?;
            if groups.is_empty() {
                println!("No groups found.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Id", "Name"]);
            for g in &groups {
                table.add_row(vec![g.id.to_string(), g.name.clone()]);
            }
            println!("{}", table);
            Ok(())
        }

        GroupsAction::Create { name } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("group name must not be empty");
            }
            if db.get_group_by_name(name)?.is_some() {
                anyhow::bail!("group '{}' already exists", name);
            }
            let group = db.create_group(name).context("failed to create group")?;
            println!("{}", style::success(&format!("Group created: {} (id {})", group.name, group.id)));
            Ok(())
        }

        GroupsAction::Add { email, group } => {
            let (user_id, group) = resolve(db, &email, &group)?;
            db.add_user_to_group(user_id, group.id)
                .context("failed to add membership")?;
            println!("{}", style::success(&format!("{} added to {}", email, group.name)));
            Ok(())
        }

        GroupsAction::Remove { email, group } => {
            let (user_id, group) = resolve(db, &email, &group)?;
            db.remove_user_from_group(user_id, group.id)
                .context("failed to remove membership")?;
            println!("{}", style::success(&format!("{} removed from {}", email, group.name)));
            Ok(())
        }
    }
}

fn resolve(db: &Database, email: &str, group: &str) -> Result<(uuid::Uuid, Group)> {
    let user = db
        .get_user_by_email(&normalize_email(email))?
        .ok_or_else(|| anyhow::anyhow!("user '{}' not found", email))?;
    let group = db
        .get_group_by_name(group)?
        .ok_or_else(|| anyhow::anyhow!("group '{}' not found", group))?;
    Ok((user.id, group))
}
