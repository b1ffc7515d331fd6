//! Utilities for input/output.

use super::OverwriteMode;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Opens the file at the given path for reading, including the path in any error message.
pub fn open_file_and_map_err<P: AsRef<Path>>(file_path: P) -> io::Result<fs::File> {
    let file_path = file_path.as_ref();
    fs::File::open(file_path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Could not open {}: {}", file_path.display(), err),
        )
    })
}

/// Creates the file at the given path for writing, including the path in any error message.
pub fn create_file_and_map_err<P: AsRef<Path>>(file_path: P) -> io::Result<fs::File> {
    let file_path = file_path.as_ref();
    fs::File::create(file_path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Could not create {}: {}", file_path.display(), err),
        )
    })
}

/// Asks the user a yes/no question on stdout and reads the answer from stdin.
pub fn user_says_yes(question: &str, default_to_yes: bool) -> io::Result<bool> {
    print!(
        "{} [{}] ",
        question,
        if default_to_yes { "Y/n" } else { "y/N" }
    );
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default_to_yes,
    })
}

/// Output path that is first written to a temporary location and then
/// moved into place in a single rename.
#[derive(Debug)]
pub struct AtomicOutputPath {
    target_path: PathBuf,
    temporary_path: PathBuf,
    _temporary_dir: TempDir,
}

impl AtomicOutputPath {
    /// Creates a new temporary location next to the given target path.
    pub fn new<P: AsRef<Path>>(target_path: P) -> io::Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();
        let file_name = target_path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("No file name in output path {}", target_path.display()),
            )
        })?;
        let parent_dir = match target_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent_dir)?;

        let temporary_dir = tempfile::Builder::new()
            .prefix(".magfield_")
            .tempdir_in(&parent_dir)?;
        let temporary_path = temporary_dir.path().join(file_name);

        Ok(Self {
            target_path,
            temporary_path,
            _temporary_dir: temporary_dir,
        })
    }

    /// Returns the final output path.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Returns the temporary path that should be written to.
    pub fn temporary_path(&self) -> &Path {
        &self.temporary_path
    }

    /// Whether the target may be written, given the overwrite mode.
    pub fn write_allowed(&self, overwrite_mode: OverwriteMode) -> io::Result<bool> {
        if !self.target_path.exists() {
            return Ok(true);
        }
        match overwrite_mode {
            OverwriteMode::Always => Ok(true),
            OverwriteMode::Never => Ok(false),
            OverwriteMode::Ask => user_says_yes(
                &format!("File {} already exists, overwrite?", self.target_path.display()),
                true,
            ),
        }
    }

    /// Moves the written temporary file to the target path.
    pub fn perform_replace(&self) -> io::Result<()> {
        fs::rename(&self.temporary_path, &self.target_path)
    }
}
