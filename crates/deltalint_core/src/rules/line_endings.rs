//! `CRLF`: every line break must be `\r\n`.

use std::fs;
use std::path::Path;

use crate::rules::FileRule;
use crate::{Finding, LinterError};

/// Source tag of findings from this rule.
const SOURCE: &str = "line-endings";

/// Flags files containing any line break other than CRLF.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEndings;

impl LineEndings {
    pub const ID: &'static str = "CRLF";

    /// Returns `true` when a bare `\r` or `\n` remains once every `\r\n`
    /// pair is removed.
    pub fn has_foreign_line_breaks(bytes: &[u8]) -> bool {
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
                b'\r' | b'\n' => return true,
                _ => i += 1,
            }
        }
        false
    }
}

impl FileRule for LineEndings {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn check(&self, path: &Path) -> Result<Option<Finding>, LinterError> {
        let bytes = fs::read(path)?;
        if !Self::has_foreign_line_breaks(&bytes) {
            return Ok(None);
        }
        Ok(Some(Finding::new(
            Self::ID,
            path,
            "Line breaks other than CRLF found",
            SOURCE,
        )))
    }
}
