// src/cli/ui.rs
//! Terminal status output helpers.
//!
//! Status lines use short colored tags instead of glyphs so they stay
//! legible in terminals without good Unicode fonts; errors go to stderr
//! so piped table output stays clean.

use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};

/// Print a success line to stdout.
pub fn print_success(message: &str) {
    println!("{}", status_line("ok", Color::Green, message));
}

/// Print a warning line to stdout.
pub fn print_warning(message: &str) {
    println!("{}", status_line("warn", Color::Yellow, message));
}

/// Print an error line to stderr.
pub fn print_error(message: &str) {
    eprintln!("{}", status_line("error", Color::Red, message));
}

fn status_line(tag: &str, color: Color, message: &str) -> String {
    format!("{} {}", tag.color(color).bold(), message)
}

/// Create the per-file batch progress bar.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:36.green/white} {pos}/{len} files ({percent}%, eta {eta})",
        )
        .unwrap()
        .progress_chars("=>-"),
    );
    bar
}
