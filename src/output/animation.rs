//! Animated PNG export.
//!
//! Frames are spooled in memory as compressed PNG and encoded into a single
//! APNG at a fixed frame rate when the sequence is finalized. Dashboard
//! frames are mostly flat color, so the spool stays small.

use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::output::PngEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Accumulates frames of identical size and writes them as an APNG.
#[derive(Debug, Clone)]
pub struct AnimationEncoder {
    width: u32,
    height: u32,
    fps: u16,
    frames: Vec<Vec<u8>>,
}

impl AnimationEncoder {
    /// Creates an encoder for `width` x `height` frames played at `fps`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for zero dimensions.
    pub fn new(width: u32, height: u32, fps: u16) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self { width, height, fps: fps.max(1), frames: Vec::new() })
    }

    /// Appends a frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if the frame size differs from
    /// the encoder's, or a PNG error if it cannot be compressed.
    pub fn push(&mut self, fb: &Framebuffer) -> Result<()> {
        if fb.width() != self.width || fb.height() != self.height {
            return Err(Error::InvalidDimensions { width: fb.width(), height: fb.height() });
        }
        self.frames.push(PngEncoder::to_bytes(fb)?);
        Ok(())
    }

    /// Number of spooled frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frame has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Playback rate.
    #[must_use]
    pub fn fps(&self) -> u16 {
        self.fps
    }

    /// Encodes all spooled frames into an APNG file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyData`] when no frame was pushed, or an I/O or
    /// PNG error.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::EmptyData);
        }
        let file = File::create(path)?;
        self.encode(BufWriter::new(file))
    }

    /// Encodes all spooled frames into APNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyData`] when no frame was pushed, or a PNG error.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.frames.is_empty() {
            return Err(Error::EmptyData);
        }
        let mut buffer = Vec::new();
        self.encode(&mut buffer)?;
        Ok(buffer)
    }

    fn encode<W: Write>(&self, writer: W) -> Result<()> {
        let frame_count = u32::try_from(self.frames.len())
            .map_err(|_| Error::InvalidDimensions { width: self.width, height: self.height })?;

        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        // 0 plays = loop forever
        encoder.set_animated(frame_count, 0)?;
        encoder.set_frame_delay(1, self.fps)?;

        let mut writer = encoder.write_header()?;
        for spooled in &self.frames {
            let frame = PngEncoder::decode(spooled)?;
            writer.write_image_data(&frame.to_compact_pixels())?;
        }
        writer.finish()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    fn solid(color: Rgba) -> Framebuffer {
        let mut fb = Framebuffer::new(8, 6).unwrap();
        fb.clear(color);
        fb
    }

    #[test]
    fn test_rejects_mismatched_frame() {
        let mut encoder = AnimationEncoder::new(8, 6, 10).unwrap();
        let other = Framebuffer::new(6, 8).unwrap();

        assert!(encoder.push(&other).is_err());
        assert!(encoder.is_empty());
    }

    #[test]
    fn test_empty_sequence_is_an_error() {
        let encoder = AnimationEncoder::new(8, 6, 10).unwrap();
        assert!(matches!(encoder.to_bytes(), Err(Error::EmptyData)));
    }

    #[test]
    fn test_zero_fps_is_clamped() {
        assert_eq!(AnimationEncoder::new(8, 6, 0).unwrap().fps(), 1);
    }

    #[test]
    fn test_encodes_animation_control_chunk() {
        let mut encoder = AnimationEncoder::new(8, 6, 10).unwrap();
        encoder.push(&solid(Rgba::RED)).unwrap();
        encoder.push(&solid(Rgba::GREEN)).unwrap();
        encoder.push(&solid(Rgba::BLUE)).unwrap();

        let bytes = encoder.to_bytes().unwrap();

        assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        let actl = bytes.windows(4).position(|w| w == b"acTL").expect("acTL chunk");
        let frames = u32::from_be_bytes(bytes[actl + 4..actl + 8].try_into().unwrap());
        assert_eq!(frames, 3);
        assert_eq!(bytes.windows(4).filter(|w| *w == b"fcTL").count(), 3);
    }

    #[test]
    fn test_first_frame_is_default_image() {
        let mut encoder = AnimationEncoder::new(8, 6, 5).unwrap();
        encoder.push(&solid(Rgba::RED)).unwrap();
        encoder.push(&solid(Rgba::BLUE)).unwrap();

        let decoded = PngEncoder::decode(&encoder.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, solid(Rgba::RED));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.png");
        let mut encoder = AnimationEncoder::new(8, 6, 10).unwrap();
        encoder.push(&solid(Rgba::WHITE)).unwrap();

        encoder.write_to_file(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
