//! Styled terminal output
//!
//! Backs [`crate::traits::TerminalOutput`]; everything else prints through the
//! [`crate::traits::Output`] trait.

use owo_colors::OwoColorize;

type Rgb = (u8, u8, u8);

const MINT: Rgb = (152, 225, 152);
const CORAL: Rgb = (255, 160, 160);
const CREAM: Rgb = (255, 230, 160);
const SKY: Rgb = (160, 200, 255);
const LAVENDER: Rgb = (181, 174, 254);
const GREY: Rgb = (160, 160, 160);

fn symbol(symbol: &str, (r, g, b): Rgb, message: &str) -> String {
    format!("{} {}", symbol.truecolor(r, g, b).bold(), message.bright_white())
}

fn grey(text: &str) -> String {
    let (r, g, b) = GREY;
    text.truecolor(r, g, b).to_string()
}

/// Print a success message with a green checkmark
pub fn success(message: &str) {
    println!("{}", symbol("✓", MINT, message));
}

/// Print an error message to stderr
pub fn error(message: &str) {
    eprintln!("{}", symbol("✗", CORAL, message));
}

pub fn warning(message: &str) {
    println!("{}", symbol("⚠", CREAM, message));
}

pub fn info(message: &str) {
    println!("{}", symbol("ℹ", SKY, message));
}

/// Print a section header with a separator line
pub fn section(title: &str) {
    let (r, g, b) = LAVENDER;
    println!("\n{}", title.truecolor(r, g, b).bold());
    println!("{}", grey(&"─".repeat(50)));
}

pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", grey(&format!("{}:", key)), value.bright_white());
}

/// Print a muted line (file lists, backend output in verbose mode)
pub fn dimmed(message: &str) {
    println!("{}", grey(message));
}

pub fn blank() {
    println!();
}
