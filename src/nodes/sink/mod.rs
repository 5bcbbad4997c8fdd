mod destination;
pub use destination::*;

#[cfg(feature = "cpal_sink")]
mod cpal_output;
#[cfg(feature = "cpal_sink")]
pub use cpal_output::*;
