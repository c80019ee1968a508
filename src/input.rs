use std::io::{BufRead, Write};

use color_eyre::eyre::{Result, WrapErr};

pub const PROMPT: &str = "Ask me for weather: ";

/// Writes `prompt`, then reads a single line. EOF gives an empty string.
pub fn read_user_input<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, prompt: &str) -> Result<String> {
    write!(writer, "{}", prompt).wrap_err("Failed to write prompt")?;
    writer.flush().wrap_err("Failed to flush prompt")?;

    let mut line = String::new();
    reader.read_line(&mut line).wrap_err("Failed to read user input")?;
    Ok(line.trim().to_string())
}
