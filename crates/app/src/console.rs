//! Line-oriented stand-in for the browser player surface.
//!
//! Reads player signals and viewer actions from input lines and writes every
//! session update as one JSON object per line.

use reelroute_core::route::parse_play_route;
use reelroute_core::{ContentRef, RouteError};
use reelroute_playback::{EpisodeNavigator, PlaybackError, PlaybackSession, SessionUpdate};
use serde_json::json;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Ready,
    Error(String),
    Interact,
    Next,
    Source(usize),
    Quality(String),
    Retry,
    Open(ContentRef),
    Close,
    NextEpisode,
    PreviousEpisode,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid source index: {0}")]
    InvalidIndex(String),
    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = |name: &'static str| {
        if rest.is_empty() {
            Err(ConsoleError::MissingArgument(name))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word {
        "ready" => ConsoleCommand::Ready,
        "error" => ConsoleCommand::Error(if rest.is_empty() {
            "unspecified".to_string()
        } else {
            rest.to_string()
        }),
        "interact" => ConsoleCommand::Interact,
        "next" => ConsoleCommand::Next,
        "source" => {
            let raw = arg("source")?;
            let index = raw.parse().map_err(|_| ConsoleError::InvalidIndex(raw))?;
            ConsoleCommand::Source(index)
        }
        "quality" => ConsoleCommand::Quality(arg("quality")?),
        "retry" => ConsoleCommand::Retry,
        "open" => ConsoleCommand::Open(parse_play_route(&arg("open")?)?),
        "close" => ConsoleCommand::Close,
        "next-episode" => ConsoleCommand::NextEpisode,
        "prev-episode" => ConsoleCommand::PreviousEpisode,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    session: PlaybackSession,
    navigator: EpisodeNavigator,
    current: Option<ContentRef>,
    /// Token of the most recently assigned target.
    token: Option<u64>,
}

impl Console {
    pub fn new(session: PlaybackSession, navigator: EpisodeNavigator) -> Self {
        Self {
            session,
            navigator,
            current: None,
            token: None,
        }
    }

    pub fn open(&mut self, content: ContentRef) -> anyhow::Result<()> {
        info!(content = %content, "opening");
        self.current = Some(content.clone());
        self.token = None;
        self.session.open(content)?;
        Ok(())
    }

    /// Run until `quit` or end of input, then flush remaining updates.
    pub async fn run<R, W>(
        mut self,
        mut updates: UnboundedReceiver<SessionUpdate>,
        input: R,
        mut output: W,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("input closed");
                        break;
                    };
                    if let Flow::Quit = self.handle_line(&line, &mut output).await? {
                        break;
                    }
                }
                Some(update) = updates.recv() => {
                    self.observe(&update);
                    write_update(&mut output, &update).await?;
                }
            }
        }

        self.session.shutdown().await;
        while let Some(update) = updates.recv().await {
            write_update(&mut output, &update).await?;
        }
        output.flush().await?;
        Ok(())
    }

    fn observe(&mut self, update: &SessionUpdate) {
        match update {
            SessionUpdate::TargetAssigned { token, .. } => self.token = Some(*token),
            SessionUpdate::Unavailable { .. } => self.token = None,
            _ => {}
        }
    }

    async fn handle_line<W>(&mut self, line: &str, output: &mut W) -> anyhow::Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                write_json(output, &json!({ "type": "console_error", "message": e.to_string() }))
                    .await?;
                return Ok(Flow::Continue);
            }
        };

        match command {
            ConsoleCommand::Ready | ConsoleCommand::Error(_) | ConsoleCommand::Interact => {
                let Some(token) = self.token else {
                    write_json(
                        output,
                        &json!({ "type": "console_error", "message": "no target assigned" }),
                    )
                    .await?;
                    return Ok(Flow::Continue);
                };
                match command {
                    ConsoleCommand::Ready => self.session.player_ready(token)?,
                    ConsoleCommand::Error(reason) => self.session.player_error(token, reason)?,
                    _ => self.session.user_interacted(token)?,
                }
            }
            ConsoleCommand::Next => self.session.next_source()?,
            ConsoleCommand::Source(index) => match self.session.select_source(index) {
                Err(e @ PlaybackError::UnknownCandidate(_)) => {
                    write_json(output, &json!({ "type": "console_error", "message": e.to_string() }))
                        .await?;
                }
                other => other?,
            },
            ConsoleCommand::Quality(name) => self.session.select_quality(name)?,
            ConsoleCommand::Retry => self.session.retry()?,
            ConsoleCommand::Open(content) => self.open(content)?,
            ConsoleCommand::Close => {
                self.current = None;
                self.token = None;
                self.session.close()?;
            }
            ConsoleCommand::NextEpisode | ConsoleCommand::PreviousEpisode => {
                self.step_episode(matches!(command, ConsoleCommand::NextEpisode), output)
                    .await?;
            }
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn step_episode<W>(&mut self, forward: bool, output: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(current) = self.current.clone().filter(|c| c.episode_key().is_some()) else {
            write_json(
                output,
                &json!({ "type": "console_error", "message": "no episode open" }),
            )
            .await?;
            return Ok(());
        };

        let neighbour = if forward {
            self.navigator.next(&current).await
        } else {
            self.navigator.previous(&current).await
        };
        match neighbour {
            Ok(Some(content)) => self.open(content)?,
            Ok(None) => {
                let kind = if forward { "series_complete" } else { "series_start" };
                write_json(output, &json!({ "type": kind })).await?;
            }
            Err(e) => {
                write_json(
                    output,
                    &json!({ "type": "console_error", "message": e.to_string() }),
                )
                .await?;
            }
        }
        Ok(())
    }
}

async fn write_update<W>(output: &mut W, update: &SessionUpdate) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_json(output, &serde_json::to_value(update)?).await
}

async fn write_json<W>(output: &mut W, value: &serde_json::Value) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_player_signals_and_actions() {
        assert_eq!(parse_line("ready").unwrap(), Some(ConsoleCommand::Ready));
        assert_eq!(
            parse_line("error  refused to connect ").unwrap(),
            Some(ConsoleCommand::Error("refused to connect".into()))
        );
        assert_eq!(
            parse_line("error").unwrap(),
            Some(ConsoleCommand::Error("unspecified".into()))
        );
        assert_eq!(parse_line("source 3").unwrap(), Some(ConsoleCommand::Source(3)));
        assert_eq!(
            parse_line("quality 1280x720").unwrap(),
            Some(ConsoleCommand::Quality("1280x720".into()))
        );
        assert_eq!(parse_line("exit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn parses_open_routes() {
        assert_eq!(
            parse_line("open /play/tv/1399?season=2&episode=3").unwrap(),
            Some(ConsoleCommand::Open(ContentRef::episode("1399", 2, 3).unwrap()))
        );
        assert!(matches!(
            parse_line("open /browse/movie"),
            Err(ConsoleError::Route(_))
        ));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# warm up").unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse_line("source").unwrap_err(),
            ConsoleError::MissingArgument("source")
        );
        assert_eq!(
            parse_line("source two").unwrap_err(),
            ConsoleError::InvalidIndex("two".into())
        );
        assert_eq!(
            parse_line("rewind").unwrap_err(),
            ConsoleError::Unknown("rewind".into())
        );
    }
}
