//! Terminal rendering with termimad, with a plain-text fallback.

use anyhow::Result;
use sous_core::{ToolResponse, ToolStatus};
use termimad::{crossterm::style::Color, MadSkin};

/// Renders markdown and tool responses to stdout.
pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(Color::Blue);
        skin.bold.set_fg(Color::Yellow);
        skin.italic.set_fg(Color::Magenta);
        skin.inline_code.set_bg(Color::AnsiValue(238));

        Self { rich_enabled, skin }
    }

    pub fn render(&self, markdown: &str) -> Result<()> {
        if self.rich_enabled {
            for line in markdown.lines() {
                if line.starts_with('#') {
                    println!("\x1b[34m{line}\x1b[0m");
                } else {
                    self.skin.print_inline(line);
                    println!();
                }
            }
        } else {
            print!("{markdown}");
        }
        Ok(())
    }

    /// Prints a response, coloring the status tag by severity.
    pub fn render_response(&self, response: &ToolResponse) -> Result<()> {
        let text = response.to_string();
        if !self.rich_enabled {
            println!("{text}");
            return Ok(());
        }

        let mut lines = text.lines();
        if let Some(first) = lines.next() {
            let color = status_color(response.status);
            match first.split_once(' ') {
                Some((tag, message)) => {
                    println!("\x1b[{color}m{tag}\x1b[0m {message}");
                }
                None => println!("\x1b[{color}m{first}\x1b[0m"),
            }
        }
        for line in lines {
            self.skin.print_inline(line);
            println!();
        }
        println!();
        Ok(())
    }
}

/// ANSI foreground code for a status tag.
fn status_color(status: ToolStatus) -> u8 {
    match status {
        ToolStatus::Started | ToolStatus::Done => 32,
        ToolStatus::Blocked | ToolStatus::Wait | ToolStatus::TimerRunning => 33,
        ToolStatus::Error => 31,
        ToolStatus::Info => 36,
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}
