use super::{format_split, format_time};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use ogp_core::storage::GameStore;
use ogp_core::{GameRecord, OgpError, Result, Storage};
use std::path::Path;

#[derive(Subcommand)]
pub enum GameCommands {
    /// List mirrored games, newest first
    List {
        /// Only games submitted by this email
        #[arg(short, long)]
        user: Option<String>,
        /// Maximum number of games
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
        /// Number of games to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },
    /// Show a mirrored game
    Show {
        /// Platform game id
        game_id: String,
    },
    /// Remove a game from the local mirror (the platform keeps it)
    Delete {
        /// Platform game id
        game_id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn handle_game_command(cmd: GameCommands, database: &Path) -> Result<()> {
    let storage = Storage::new(database).await?;
    let games = GameStore::new(&storage);

    match cmd {
        GameCommands::List {
            user,
            limit,
            offset,
        } => {
            let records = match &user {
                Some(email) => games.list_by_user(email, limit, offset).await?,
                None => games.list(limit, offset).await?,
            };

            if records.is_empty() {
                println!("No games found.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Game ID", "Name", "User", "Platform", "Created"]);

            for game in &records {
                table.add_row(vec![
                    game.game_id.clone(),
                    game.name.clone(),
                    game.user_email.clone(),
                    game.platform.clone().unwrap_or_default(),
                    format_time(&game.created_at),
                ]);
            }

            let total = match &user {
                Some(email) => games.count_by_user(email).await?,
                None => games.count().await?,
            };
            println!("{}", table);
            println!("{} of {} games", records.len(), total);
        }

        GameCommands::Show { game_id } => {
            let game = games
                .get_by_game_id(&game_id)
                .await?
                .ok_or(OgpError::GameNotFound { game_id })?;
            print_game(&game);
        }

        GameCommands::Delete { game_id, force } => {
            if games.get_by_game_id(&game_id).await?.is_none() {
                return Err(OgpError::GameNotFound { game_id });
            }

            if !force {
                let confirm = Confirm::new()
                    .with_prompt(format!(
                        "Remove game '{}' from the local mirror? It stays registered on the platform.",
                        game_id
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| OgpError::internal(e.to_string()))?;

                if !confirm {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            games.delete(&game_id).await?;
            println!("Game '{}' removed from the local mirror.", game_id);
        }
    }

    Ok(())
}

fn print_game(game: &GameRecord) {
    println!("Game Information:");
    println!("  ID: {}", game.game_id);
    println!("  Name: {}", game.name);
    if let Some(description) = &game.description {
        println!("  Description: {}", description);
    }
    println!("  Submitted by: {}", game.user_email);
    println!("  URL: {}", game.game_url);
    if let Some(platform) = &game.platform {
        println!("  Platform: {}", platform);
    }
    println!();

    println!("Gameplay:");
    if let Some(points) = game.points_per_jump {
        println!("  Points per jump: {}", points);
    }
    if let Some(lives) = game.lives {
        println!("  Lives: {}", lives);
    }
    for (label, limit) in [
        ("Max score per session", game.max_score_per_session),
        ("Max sessions per day", game.max_sessions_per_day),
        ("Max points per day", game.max_cumulative_points_per_day),
    ] {
        if let Some(limit) = limit {
            println!("  {}: {}", label, limit);
        }
    }
    println!();

    println!("Rewards split: {}", format_split(&game.org_rewards_split));

    let socials: Vec<String> = [
        ("Twitter", &game.twitter),
        ("Discord", &game.discord),
        ("Telegram", &game.telegram),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
    .collect();
    if !socials.is_empty() {
        println!("Socials: {}", socials.join(", "));
    }

    if let Some(image) = &game.image_url {
        println!("Image: {}", image);
    }
    if let Some(cover) = &game.cover_image_url {
        println!("Cover: {}", cover);
    }
    println!("Created: {}", format_time(&game.created_at));
    println!("Updated: {}", format_time(&game.updated_at));
}
