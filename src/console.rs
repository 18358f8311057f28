//! Interactive terminal front-end.
//!
//! The console keeps its own transcript for display; the conversational
//! memory the model sees lives in the [`ChatSession`] and is bounded
//! separately.

use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::application::ChatSession;

const PROMPT: &str = "you> ";
const EMPTY_INPUT_HINT: &str = "Please type a message (or /quit to leave).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("you"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.lines.push(TranscriptLine {
            speaker,
            text: text.into(),
        });
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

enum Command<'a> {
    Quit,
    History,
    Empty,
    Message(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Empty,
        "/quit" | "/exit" => Command::Quit,
        "/history" => Command::History,
        message => Command::Message(message),
    }
}

pub struct Console<R, W> {
    session: ChatSession,
    transcript: Transcript,
    input: Lines<R>,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: ChatSession, input: R, output: W) -> Self {
        Self {
            session,
            transcript: Transcript::default(),
            input: input.lines(),
            output,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Runs turns until `/quit`, `/exit` or end of input.
    pub async fn run(&mut self) -> std::io::Result<()> {
        loop {
            self.output.write_all(PROMPT.as_bytes()).await?;
            self.output.flush().await?;

            let Some(line) = self.input.next_line().await? else {
                self.output.write_all(b"\n").await?;
                break;
            };

            match parse_command(&line) {
                Command::Quit => break,
                Command::Empty => self.say(EMPTY_INPUT_HINT).await?,
                Command::History => self.print_history().await?,
                Command::Message(message) => self.turn(message).await?,
            }
        }
        self.output.flush().await
    }

    async fn turn(&mut self, message: &str) -> std::io::Result<()> {
        match self.session.respond(message).await {
            Ok(response) => {
                self.transcript.push(Speaker::User, message);
                self.transcript.push(Speaker::Assistant, response.clone());
                self.say(&format!("{}> {response}", Speaker::Assistant)).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "turn failed");
                self.say(&format!("error: {err}")).await
            }
        }
    }

    async fn print_history(&mut self) -> std::io::Result<()> {
        if self.transcript.is_empty() {
            return self.say("(no messages yet)").await;
        }
        let rendered = self
            .transcript
            .lines()
            .iter()
            .map(|line| format!("{}> {}", line.speaker, line.text))
            .collect::<Vec<_>>()
            .join("\n");
        self.say(&rendered).await
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await
    }
}
