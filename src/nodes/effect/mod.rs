mod gain;
mod merger;

pub use gain::*;
pub use merger::*;
