//! Numbered frame files partitioned by capture date.
//!
//! Layout: `<root>/<YYYY-MM-DD>/frame_<NNNNNN>.png`. The counter is global
//! across dates and never resets while the writer lives.

use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::output::PngEncoder;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one PNG per frame under a root directory.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    root: PathBuf,
    next_index: u64,
}

impl FrameWriter {
    /// Creates the root directory (and parents) if missing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, next_index: 0 })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Index the next written frame will carry.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Path for frame `index` captured at `captured_at`.
    #[must_use]
    pub fn path_for(&self, index: u64, captured_at: DateTime<Utc>) -> PathBuf {
        self.root
            .join(captured_at.format("%Y-%m-%d").to_string())
            .join(format!("frame_{index:06}.png"))
    }

    /// Writes `fb` as the next frame and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the date directory or the file cannot be written.
    /// The counter only advances on success.
    pub fn write(&mut self, fb: &Framebuffer, captured_at: DateTime<Utc>) -> Result<PathBuf> {
        let path = self.path_for(self.next_index, captured_at);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        PngEncoder::write_to_file(fb, &path)?;
        self.next_index += 1;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 23, 59, 30).unwrap()
    }

    #[test]
    fn test_path_layout() {
        let writer = FrameWriter { root: PathBuf::from("/frames"), next_index: 0 };
        assert_eq!(
            writer.path_for(42, day(7)),
            PathBuf::from("/frames/2026-03-07/frame_000042.png")
        );
    }

    #[test]
    fn test_counter_spans_dates() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FrameWriter::create(dir.path().join("out")).unwrap();
        let fb = Framebuffer::new(4, 4).unwrap();

        let first = writer.write(&fb, day(7)).unwrap();
        let second = writer.write(&fb, day(8)).unwrap();

        assert!(first.ends_with("2026-03-07/frame_000000.png"));
        assert!(second.ends_with("2026-03-08/frame_000001.png"));
        assert!(first.is_file() && second.is_file());
        assert_eq!(writer.next_index(), 2);
    }

    #[test]
    fn test_create_fails_under_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        assert!(FrameWriter::create(blocker.join("frames")).is_err());
    }
}
