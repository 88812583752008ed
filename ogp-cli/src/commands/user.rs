use super::{format_split, format_time};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use ogp_core::storage::{GameStore, UserStore};
use ogp_core::{OgpError, Result, Storage};
use std::path::Path;

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users that have submitted games
    List,
    /// Show a user and their games
    Show {
        /// User email
        email: String,
    },
}

pub async fn handle_user_command(cmd: UserCommands, database: &Path) -> Result<()> {
    let storage = Storage::new(database).await?;
    let users = UserStore::new(&storage);
    let games = GameStore::new(&storage);

    match cmd {
        UserCommands::List => {
            let records = users.list().await?;

            if records.is_empty() {
                println!("No users found.");
                println!("Users appear here after their first game submission.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Email", "OGP User ID", "Games", "Created"]);

            for user in records {
                let count = games.count_by_user(&user.email).await?;
                table.add_row(vec![
                    user.email,
                    user.ogp_user_id.unwrap_or_else(|| "-".to_string()),
                    count.to_string(),
                    format_time(&user.created_at),
                ]);
            }

            println!("{}", table);
        }

        UserCommands::Show { email } => {
            let user = users
                .get_by_email(&email)
                .await?
                .ok_or_else(|| OgpError::UserNotFound {
                    email: email.clone(),
                })?;

            println!("User Information:");
            println!("  Email: {}", user.email);
            println!(
                "  OGP User ID: {}",
                user.ogp_user_id.as_deref().unwrap_or("not linked yet")
            );
            println!("  Created: {}", format_time(&user.created_at));
            println!();

            let user_games = games.get_by_user_email(&email).await?;
            if user_games.is_empty() {
                println!("No games.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Game ID", "Name", "Rewards split", "Created"]);
            for game in user_games {
                table.add_row(vec![
                    game.game_id.clone(),
                    game.name.clone(),
                    format_split(&game.org_rewards_split),
                    format_time(&game.created_at),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
