use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Deserialize;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::process::Command;

use crate::error::{Error, Result};

pub const DEFAULT_PANDOC: &str = "pandoc";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MediaType {
    #[serde(rename = "text/plain")]
    Plain,
    #[serde(rename = "text/latex")]
    Latex,
    #[default]
    #[serde(rename = "text/markdown")]
    Markdown,
    #[serde(rename = "text/rtf")]
    Rtf,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl MediaType {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Plain => "txt",
            Self::Latex => "latex",
            Self::Markdown => "md",
            Self::Rtf => "rtf",
            Self::Pdf => "pdf",
        }
    }

    /// Content type of the attachment sent back.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            _ => "application/octet-stream",
        }
    }

    /// Pandoc writer for text outputs. PDF is inferred from the output file.
    const fn pandoc_writer(self) -> Option<&'static str> {
        match self {
            Self::Plain => Some("plain"),
            Self::Latex => Some("latex"),
            Self::Rtf => Some("rtf"),
            Self::Markdown | Self::Pdf => None,
        }
    }
}

/// A converted document, either in memory or in a temporary file that is
/// removed once dropped.
#[derive(Debug)]
pub enum Document {
    Bytes(Vec<u8>),
    File(TempPath),
}

#[derive(Debug, Clone)]
pub struct Converter {
    program: String,
    timeout: Duration,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DEFAULT_PANDOC, DEFAULT_TIMEOUT)
    }
}

impl Converter {
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub async fn convert(&self, markdown: String, media_type: MediaType) -> Result<Document> {
        if let Some(writer) = media_type.pandoc_writer() {
            let output = self.run(&["--to", writer], markdown).await?;
            return Ok(Document::Bytes(output));
        }

        if media_type == MediaType::Markdown {
            return Ok(Document::Bytes(markdown.into_bytes()));
        }

        let path = tempfile::Builder::new()
            .prefix("railgen-")
            .suffix(".pdf")
            .tempfile()?
            .into_temp_path();
        let output = path_arg(&path)?;
        self.run(&["--output", output], markdown).await?;

        Ok(Document::File(path))
    }

    async fn run(&self, args: &[&str], input: String) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(["--from", "markdown"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to start {}: {e}", self.program);
                Error::Conversion(format!("failed to start {}: {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::warn!("Failed to write converter input: {e}");
                }
            });
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::error!("{} timed out after {:?}", self.program, self.timeout);
                Error::Conversion("document conversion timed out".to_string())
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("{} failed: {}", self.program, stderr.trim());
            return Err(Error::Conversion(stderr.trim().to_string()));
        }

        Ok(output.stdout)
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::Conversion("temporary path is not valid UTF-8".to_string()))
}

/// Reads a temporary file and deletes it when dropped.
pub struct TempFileReader {
    file: tokio::fs::File,
    _path: TempPath,
}

impl TempFileReader {
    pub async fn open(path: TempPath) -> Result<Self> {
        let file = tokio::fs::File::open(&path).await?;
        Ok(Self { file, _path: path })
    }
}

impl AsyncRead for TempFileReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}
