//! Output encoders: single PNG frames, dated frame directories, animated PNG.

mod animation;
mod frames;
mod png_encoder;

pub use animation::AnimationEncoder;
pub use frames::FrameWriter;
pub use png_encoder::PngEncoder;
