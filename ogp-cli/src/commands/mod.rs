pub mod game;
pub mod serve;
pub mod user;

pub use game::{handle_game_command, GameCommands};
pub use serve::{handle_serve_command, ServeArgs};
pub use user::{handle_user_command, UserCommands};

use chrono::{DateTime, Utc};
use ogp_core::RewardSplit;

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn format_split(split: &RewardSplit) -> String {
    split
        .iter()
        .map(|(identity, bps)| format!("{} {:.2}%", identity, f64::from(bps) / 100.0))
        .collect::<Vec<_>>()
        .join(", ")
}
