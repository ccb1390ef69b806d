use std::{io, path::Path, sync::Arc};

use chrono::Local;
use tokio::{
    fs::OpenOptions,
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Timestamped, level-tagged line logger shared across the pipeline.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Mutex<Sink>>,
    color_enable: bool,
}

const RESET: &str = "\x1b[0m";
const BG_BLUE: &str = "\x1b[44m"; // info
const BG_ORANGE: &str = "\x1b[48;5;208m"; // warning
const BG_RED: &str = "\x1b[41m";
const BG_GREEN: &str = "\x1b[42m"; // submitted
const BG_MAGENTA: &str = "\x1b[45m"; // summary
const FG_BOLD_WHITE: &str = "\x1b[97;1m";

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("color_enable", &self.color_enable)
            .finish()
    }
}

impl Logger {
    /// Appends to the file at `path`. Files never get colour codes.
    pub async fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        Ok(Self::from_sink(Box::new(file), false))
    }

    /// Writes to stdout, for cron mail / journald capture.
    pub fn stdout() -> Self {
        let no_color = std::env::var("BENCHWATCH_NO_COLOR").ok().as_deref() == Some("1");
        Self::from_sink(Box::new(tokio::io::stdout()), !no_color)
    }

    /// Discards everything.
    pub fn placeholder() -> Self {
        Self::from_sink(Box::new(tokio::io::sink()), false)
    }

    /// Writes to any async writer, without colour.
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::from_sink(Box::new(writer), false)
    }

    fn from_sink(sink: Sink, color_enable: bool) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            color_enable,
        }
    }

    fn paint_level(&self, level: &str) -> String {
        if !self.color_enable {
            return level.to_string();
        }
        match level {
            "INFO" => format!("{BG_BLUE}{FG_BOLD_WHITE} {level} {RESET}"),
            "WARNING" => format!("{BG_ORANGE}{FG_BOLD_WHITE} {level} {RESET}"),
            "ERROR" => format!("{BG_RED}{FG_BOLD_WHITE} {level} {RESET}"),
            "SUBMIT" => format!("{BG_GREEN}{FG_BOLD_WHITE} {level} {RESET}"),
            "SUMMARY" => format!("{BG_MAGENTA}{FG_BOLD_WHITE} {level} {RESET}"),
            _ => level.to_string(),
        }
    }

    pub async fn log(&self, level: &str, msg: &str) -> io::Result<()> {
        let mut sink = self.sink.lock().await;
        let now = Local::now();
        let line = format!(
            "[{}] {}: {}\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            self.paint_level(level),
            msg
        );
        sink.write_all(line.as_bytes()).await?;
        sink.flush().await?;
        Ok(())
    }

    pub async fn info(&self, msg: &str) -> io::Result<()> {
        self.log("INFO", msg).await
    }

    pub async fn warning(&self, msg: &str) -> io::Result<()> {
        self.log("WARNING", msg).await
    }

    pub async fn error(&self, msg: &str) -> io::Result<()> {
        self.log("ERROR", msg).await
    }

    pub async fn submit(&self, msg: &str) -> io::Result<()> {
        self.log("SUBMIT", msg).await
    }

    pub async fn summary(&self, msg: &str) -> io::Result<()> {
        self.log("SUMMARY", msg).await
    }
}
