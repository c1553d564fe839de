//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting operations
//! that would otherwise fail after minutes of model work.

use crate::error::{OmskrivError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Writing a DOCX document requires pandoc.
    RenderDocx,
    /// Fetching transcripts needs no external tools.
    Fetch,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::RenderDocx => {
            check_tool("pandoc")?;
        }
        Operation::Fetch => {
            // No external requirements for fetching
        }
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(OmskrivError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(OmskrivError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(OmskrivError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_fetch_no_requirements() {
        // Fetch should always pass pre-flight (no external requirements)
        assert!(check(Operation::Fetch).is_ok());
    }
}
