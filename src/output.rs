use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::options::{Capability, Language};

/// Directory where generated texts are saved, one file per submission.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_stem<Tz: TimeZone>(
        capability: Capability,
        language: Language,
        generated_at: &DateTime<Tz>,
    ) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{}_{}_{}",
            capability.slug(),
            language,
            generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write `content` to a fresh file and return its path.
    ///
    /// Existing files are never overwritten: a second artifact in the same
    /// second gets a `_2`, `_3`, ... suffix.
    pub fn save<Tz: TimeZone>(
        &self,
        capability: Capability,
        language: Language,
        content: &str,
        generated_at: &DateTime<Tz>,
    ) -> io::Result<PathBuf>
    where
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(&self.dir)?;
        let stem = Self::file_stem(capability, language, generated_at);

        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                format!("{stem}.txt")
            } else {
                format!("{stem}_{attempt}.txt")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content.as_bytes())?;
                    tracing::info!(path = %path.display(), bytes = content.len(), "output saved");
                    return Ok(path);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }
}
