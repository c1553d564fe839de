//! Document output for assembled results.
//!
//! The writer is a capability boundary: it accepts a title, the assembled
//! body, and a format, and produces a file on disk. DOCX conversion goes
//! through the external `pandoc` tool.

use crate::error::{OmskrivError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Supported output document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Txt,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Txt => "txt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docx" => Ok(OutputFormat::Docx),
            "txt" | "text" => Ok(OutputFormat::Txt),
            _ => Err(format!("Unknown format: {}. Use docx or txt.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Capability for writing assembled documents.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Write `body` under `title` in the given format, returning the file path.
    async fn write(&self, title: &str, body: &str, format: OutputFormat) -> Result<PathBuf>;
}

/// Filesystem-backed document writer.
///
/// TXT files are written directly. DOCX files are produced by staging a
/// Markdown rendition and converting it with `pandoc`.
pub struct FsDocumentWriter {
    output_dir: PathBuf,
    explicit_path: Option<PathBuf>,
    include_title: bool,
}

impl FsDocumentWriter {
    /// Writer that derives the file name from the title inside `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, include_title: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            explicit_path: None,
            include_title,
        }
    }

    /// Write to a fixed path instead of deriving a name from the title.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    fn destination(&self, title: &str, format: OutputFormat) -> PathBuf {
        match &self.explicit_path {
            Some(path) => path.clone(),
            None => self.output_dir.join(format!(
                "{}.{}",
                sanitize_file_stem(title),
                format.extension()
            )),
        }
    }
}

#[async_trait]
impl DocumentWriter for FsDocumentWriter {
    #[instrument(skip(self, body), fields(format = %format))]
    async fn write(&self, title: &str, body: &str, format: OutputFormat) -> Result<PathBuf> {
        let dest = self.destination(title, format);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match format {
            OutputFormat::Txt => {
                tokio::fs::write(&dest, body).await?;
            }
            OutputFormat::Docx => {
                write_docx(title, body, &dest, self.include_title).await?;
            }
        }

        debug!("Wrote document to {}", dest.display());
        Ok(dest)
    }
}

/// Convert the body to DOCX via pandoc.
///
/// The body is staged as a Markdown file with an optional pandoc title block,
/// which pandoc renders as a centered document title.
async fn write_docx(title: &str, body: &str, dest: &Path, include_title: bool) -> Result<()> {
    let mut markdown = String::new();
    if include_title {
        markdown.push_str(&format!("% {}\n\n", title));
    }
    markdown.push_str(body);
    markdown.push('\n');

    let staging = tempfile::Builder::new().suffix(".md").tempfile()?;
    tokio::fs::write(staging.path(), &markdown).await?;

    let result = Command::new("pandoc")
        .arg(staging.path())
        .arg("--from").arg("markdown")
        .arg("--output").arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OmskrivError::ToolNotFound("pandoc".into()));
        }
        Err(e) => {
            return Err(OmskrivError::Write(format!("pandoc execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(OmskrivError::Write(format!("pandoc failed: {stderr}")));
    }

    Ok(())
}

/// Reduce a title to a safe file stem.
fn sanitize_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_parsing() {
        assert_eq!("docx".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert_eq!("TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("My Video: Part 1"), "My_Video__Part_1");
        assert_eq!(sanitize_file_stem("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(sanitize_file_stem("//::!!"), "document");
    }

    #[test]
    fn test_destination_from_title() {
        let writer = FsDocumentWriter::new("/data/out", true);
        let dest = writer.destination("My Title", OutputFormat::Docx);
        assert_eq!(dest, PathBuf::from("/data/out/My_Title.docx"));
    }

    #[test]
    fn test_explicit_path_overrides_title() {
        let writer = FsDocumentWriter::new("/data/out", true).with_path("/elsewhere/custom.txt");
        let dest = writer.destination("ignored", OutputFormat::Txt);
        assert_eq!(dest, PathBuf::from("/elsewhere/custom.txt"));
    }

    #[tokio::test]
    async fn test_txt_write() {
        let dir = TempDir::new().unwrap();
        let writer = FsDocumentWriter::new(dir.path(), true);

        let path = writer
            .write("my doc", "first\n\nsecond", OutputFormat::Txt)
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "my_doc.txt");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\n\nsecond");
    }
}
