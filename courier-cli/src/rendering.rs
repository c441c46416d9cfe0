// courier-cli/src/rendering.rs
use anyhow::Result;
use termimad::crossterm::style::Color;
use termimad::MadSkin;

fn assistant_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.bold.set_fg(Color::Yellow);
    skin.italic.set_fg(Color::Magenta);
    skin.inline_code.set_fg(Color::Cyan);
    skin.bullet.set_fg(Color::Cyan);
    skin
}

/// Prints a model reply as terminal-formatted markdown.
pub fn print_formatted(markdown_text: &str) -> Result<()> {
    let skin = assistant_skin();
    skin.write_text(markdown_text)?;
    Ok(())
}
