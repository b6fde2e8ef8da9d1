use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

use crate::filename::thumbnail_filename;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create `dir` if needed and make sure files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |err: io::Error| PersistError::OutputDir(format!("{}: {err}", dir.display()));
    if dir.exists() && !dir.is_dir() {
        return Err(PersistError::OutputDir(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    fs::create_dir_all(dir).map_err(unusable)?;
    // Removed again on drop.
    NamedTempFile::new_in(dir).map_err(unusable)?;
    Ok(())
}

/// Writes thumbnails into one item directory.
///
/// Bytes land in a hidden `.part` file next to the target, which is then
/// renamed over it, so readers see either the old image or the new one.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store `image` as `{title} [{video_id}].jpg` and return its path.
    pub fn write_thumbnail(
        &self,
        title: Option<&str>,
        video_id: &str,
        image: &[u8],
    ) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;
        let target = self.dir.join(thumbnail_filename(title, video_id));

        let mut part = Builder::new()
            .prefix(".thumbnail-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        part.write_all(image)?;
        part.as_file_mut().sync_all()?;
        part.persist(&target).map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}
