//! Terminal rendering of the board.

use crate::board::{short_key, BoardState, Notification, NotificationLevel};
use colored::Colorize;
use postboard_core::{PostRecord, PostStatus};

/// Formats one post as a single line.
pub fn post_line(index: usize, post: &PostRecord) -> String {
    let status = match post.status {
        PostStatus::Pending => " (pending)".yellow().to_string(),
        PostStatus::Confirmed => String::new(),
    };
    format!(
        "{:>3}. {} {} {}{}\n     {} {}",
        index + 1,
        format!("[{} sats]", post.sats).cyan(),
        post.post,
        "by".dimmed(),
        status,
        short_key(&post.identity_key).dimmed(),
        post.outpoint().to_string().dimmed(),
    )
}

/// Formats the whole post list.
pub fn posts(state: &BoardState) -> String {
    if state.posts.is_empty() {
        return if state.posts_loading {
            "Loading posts...".dimmed().to_string()
        } else {
            "No posts yet.".dimmed().to_string()
        };
    }
    state
        .posts
        .iter()
        .enumerate()
        .map(|(index, post)| post_line(index, post))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats a notification with a level marker.
pub fn notification(notification: &Notification) -> String {
    match notification.level {
        NotificationLevel::Success => format!("{} {}", "✔".green(), notification.message.green()),
        NotificationLevel::Info => format!("{} {}", "ℹ".blue(), notification.message),
        NotificationLevel::Error => format!("{} {}", "✘".red(), notification.message.red()),
    }
}

/// Prints notifications to the terminal, errors to stderr.
pub fn print_notifications(notifications: &[Notification]) {
    for item in notifications {
        match item.level {
            NotificationLevel::Error => eprintln!("{}", notification(item)),
            _ => println!("{}", notification(item)),
        }
    }
}
