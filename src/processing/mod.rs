pub mod color_ramp;
pub mod colorizer;
pub mod segments;
