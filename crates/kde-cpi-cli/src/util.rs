use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;

/// Destination of a command's main document: stdout or a file.
#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::create(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    /// Creates the file, along with any missing parent directories.
    pub fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = create_file(&path)?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }

    /// Writes one CSV record per row, with a header taken from the field names.
    pub fn write_csv<I, T>(&mut self, rows: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: serde::Serialize,
    {
        let display_path = self.display_path();
        let mut writer = csv::Writer::from_writer(&mut *self);
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Failed to write CSV row to {display_path}"))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush output to {display_path}"))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

/// Creates `path` for writing, along with any missing parent directories.
pub fn create_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))
}

/// Creates a fresh `analysis_{slug}_{timestamp}` directory under `base`.
///
/// If the name is taken, `_1`, `_2`, ... are appended until creation succeeds.
pub fn create_unique_dir(base: &Path, slug: &str, timestamp: &str) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(base)
        .with_context(|| format!("Failed to create directory: {}", base.display()))?;
    for attempt in 0_u32.. {
        let suffix = if attempt == 0 {
            String::new()
        } else {
            format!("_{attempt}")
        };
        let candidate = base.join(format!("analysis_{slug}_{timestamp}{suffix}"));
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to create directory: {}", candidate.display())
                });
            }
        }
    }
    anyhow::bail!("No free analysis directory name under {}", base.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_unique_dir_appends_suffix() {
        let base = tempfile::tempdir().unwrap();
        let first = create_unique_dir(base.path(), "display_level", "20240615_120000").unwrap();
        let second = create_unique_dir(base.path(), "display_level", "20240615_120000").unwrap();
        assert!(first.ends_with("analysis_display_level_20240615_120000"));
        assert!(second.ends_with("analysis_display_level_20240615_120000_1"));
        assert!(first.is_dir() && second.is_dir());
    }

    #[test]
    fn test_file_output_creates_parents() {
        let base = tempfile::tempdir().unwrap();
        let path = base.path().join("nested/dir/rows.csv");
        let mut output = Output::create(path.clone()).unwrap();
        assert_eq!(output.display_path(), path.display().to_string());
        output.write_csv([("x", 1.5), ("y", 2.0)]).unwrap();
        drop(output);
        assert_eq!(fs::read_to_string(path).unwrap(), "x,1.5\ny,2.0\n");
    }
}
