//! Rasterization of the primitives that make up a dashboard frame.
//!
//! # Algorithms
//!
//! - **Wu's Anti-aliased Line**: series polylines
//! - **Bresenham's Line**: fast non-antialiased fallback
//! - **Midpoint Circle**: single-point series
//!
//! # References
//!
//! - Wu, X. (1991). "An Efficient Antialiasing Technique." SIGGRAPH '91.
//! - Bresenham, J. E. (1965). "Algorithm for computer control of a digital plotter."

mod primitives;

pub use primitives::{
    draw_circle, draw_line, draw_line_aa, draw_point, draw_rect, draw_rect_outline,
    draw_vline_dashed,
};
