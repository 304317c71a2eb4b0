//! Terminal output helpers.
//!
//! Status lines use colored symbols; long-running steps get an `indicatif`
//! spinner or byte counter. Progress bars hide themselves when stderr is not
//! a terminal, so tests and CI logs only see the plain status lines.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Byte progress for a download. Falls back to a spinner when the server did
/// not send a length.
pub fn download_bar(name: &str, total: Option<u64>) -> ProgressBar {
    let Some(total) = total else {
        return spinner(format!("Downloading {}...", name));
    };
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {}", name));
    pb
}

pub fn fetched(name: &str, detail: &str) {
    println!("   {} {} {}", "✓".green(), name.bold(), detail.dimmed());
}

pub fn cached(name: &str) {
    println!("   {} Using existing: {}", "⚡".green(), name);
}

pub fn warn(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

pub fn fail(message: &str) {
    println!("{} {}", "x".red(), message);
}
