//! Showing decrypted content in an external viewer without touching disk.

use crate::error::{CryptexError, Result};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Runs `command` (split on whitespace) and feeds `content` to its stdin.
///
/// The viewer quitting before reading everything is not an error; a
/// non-zero exit status is only logged.
pub fn page(command: &str, content: &[u8]) -> Result<()> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| CryptexError::Config("pager command is empty".into()))?;

    debug!(pager = command, bytes = content.len(), "spawning pager");

    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(content) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            other => other?,
        }
    }

    let status = child.wait()?;
    if !status.success() {
        warn!(pager = command, %status, "pager exited with failure");
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_config_error() {
        assert!(matches!(page("   ", b"x"), Err(CryptexError::Config(_))));
    }

    #[test]
    fn content_reaches_the_viewer() {
        page("cat", b"hello pager\n").unwrap();
    }

    #[test]
    fn viewer_that_ignores_input_is_fine() {
        page("true", &vec![b'x'; 1 << 20]).unwrap();
    }

    #[test]
    fn missing_viewer_is_io_error() {
        assert!(matches!(
            page("definitely-not-a-real-pager-binary", b"x"),
            Err(CryptexError::Io(_))
        ));
    }
}
