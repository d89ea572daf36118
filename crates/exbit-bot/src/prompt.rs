//! Console prompts with validation.
//!
//! Only the driver reads from the console; the engine never blocks on
//! input. Invalid answers are re-prompted here rather than surfaced as
//! errors.

use std::fmt::Display;
use std::str::FromStr;

use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

use crate::error::{AppError, AppResult};

/// Line-oriented prompt over an async reader/writer pair.
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

impl Prompter<BufReader<Stdin>, Stdout> {
    /// Prompter over the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Write one line of output.
    pub async fn say(&mut self, text: impl Display) -> AppResult<()> {
        self.writer.write_all(format!("{text}\n").as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Show `prompt` and read one trimmed line. EOF is [`AppError::InputClosed`].
    pub async fn ask(&mut self, prompt: &str) -> AppResult<String> {
        self.writer.write_all(prompt.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(AppError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Ask until the answer parses and lies within `[min, max]`.
    pub async fn ask_in_range<T>(&mut self, prompt: &str, min: T, max: T) -> AppResult<T>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        loop {
            let answer = self.ask(prompt).await?;
            match parse_in_range(&answer, min, max) {
                Ok(value) => return Ok(value),
                Err(e) => self.say(e).await?,
            }
        }
    }

    /// Ask until a non-empty answer is given.
    pub async fn ask_non_empty(&mut self, prompt: &str) -> AppResult<String> {
        loop {
            let answer = self.ask(prompt).await?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("A value is required. Try again.").await?;
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Parse `input` and check it lies within `[min, max]`.
pub fn parse_in_range<T>(input: &str, min: T, max: T) -> AppResult<T>
where
    T: FromStr + PartialOrd + Display + Copy,
{
    let value: T = input
        .trim()
        .parse()
        .map_err(|_| AppError::Input(format!("{input:?} is not a valid number. Try again.")))?;
    if value < min {
        return Err(AppError::Input(format!(
            "Value must be at least {min}. Try again."
        )));
    }
    if value > max {
        return Err(AppError::Input(format!(
            "Value must be at most {max}. Try again."
        )));
    }
    Ok(value)
}
