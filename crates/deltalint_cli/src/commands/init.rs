//! Init command implementation

use std::path::PathBuf;

use deltalint_core::LinterConfig;
use miette::{IntoDiagnostic, Result};
use tracing::info;

const DEFAULT_CONFIG: &str = r#"{
  // "staged" lints the index, "commit" lints HEAD against its parent
  "gitMode": "staged",
  "targetExtensions": [".cs"],
  "analyzers": {
    "format": {
      "enabled": true,
      "rules": [
        {
          "id": "IDE0290",
          "name": "Use primary constructor",
          "severity": "warning",
          "applyTo": ["new"],
          "filePatterns": ["*.cs"]
        }
      ]
    },
    "custom": {
      "enabled": true,
      "rules": [
        {
          "id": "CRLF",
          "name": "Use CRLF line endings",
          "severity": "error",
          "applyTo": ["new", "modified"],
          "filePatterns": ["*.cs"]
        }
      ]
    },
    "ai": {
      "enabled": false
    }
  }
}
"#;

pub fn run_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(LinterConfig::CONFIG_FILES[0]);

    loop {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NOFOLLOW);
        }

        match options.open(&config_path) {
            Ok(mut file) => {
                use std::io::Write;
                file.write_all(DEFAULT_CONFIG.as_bytes()).into_diagnostic()?;
                info!("Created {}", config_path.display());
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if !force {
                    return Err(miette::miette!(
                        "Config file already exists. Use --force to overwrite."
                    ));
                }

                match std::fs::remove_file(&config_path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_diagnostic(),
                }
            }
            Err(e) => return Err(e).into_diagnostic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltalint_core::{GitMode, Severity};

    #[test]
    fn test_default_config_is_valid() {
        let config = LinterConfig::from_jsonc(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.git_mode, GitMode::Staged);
        assert!(config.analyzers.format.enabled);
        assert_eq!(config.analyzers.custom.rules[0].id, "CRLF");
        assert_eq!(config.analyzers.custom.rules[0].severity, Severity::Error);
        assert!(!config.analyzers.ai.enabled);
    }
}
