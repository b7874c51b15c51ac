//! Terminal output helpers. Status lines go to stdout, errors to stderr.

use colored::{ColoredString, Colorize};

fn mark(symbol: ColoredString, msg: &str) {
    println!("{symbol} {msg}");
}

pub fn info(msg: &str) {
    mark("→".blue(), msg);
}

pub fn success(msg: &str) {
    mark("✓".green().bold(), msg);
}

pub fn warn(msg: &str) {
    mark("!".yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {msg}", "✗".red().bold());
}

/// Indented, muted detail line
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Title followed by an underline of the same width
pub fn header(title: &str) {
    let rule = "─".repeat(title.chars().count());
    println!("\n{}\n{}", title.bold(), rule.dimmed());
}

pub fn section(title: &str) {
    println!("\n{}", title.cyan().bold());
}

/// `  key: value`, key padded so consecutive pairs line up
pub fn kv(key: &str, value: &str) {
    println!("  {:<12} {value}", format!("{key}:").dimmed());
}

/// Shorten `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some(_) if max_chars <= 3 => "...".to_string(),
        Some(_) => {
            let cut = text
                .char_indices()
                .nth(max_chars - 3)
                .map_or(text.len(), |(i, _)| i);
            format!("{}...", &text[..cut])
        }
    }
}

pub fn list_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("mkdir /etc/apt", 20), "mkdir /etc/apt");
        assert_eq!(truncate("exact", 5), "exact");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn truncate_cuts_on_char_boundaries() {
        assert_eq!(
            truncate("download https://example.com/key.gpg", 15),
            "download htt..."
        );
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("test", 3), "...");
    }

    #[test]
    fn list_or_placeholder() {
        assert_eq!(list_or(&[], "any"), "any");
        assert_eq!(
            list_or(&["debian".to_string(), "ubuntu".to_string()], "any"),
            "debian, ubuntu"
        );
    }
}
