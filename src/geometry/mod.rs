//! Geometry helpers: positions, coherent noise and colors

mod color;
mod noise;
mod vector;

pub use color::Rgb;
pub use noise::Noise2D;
pub use vector::Vec2;
