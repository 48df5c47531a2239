pub mod error;
pub mod modules;
pub mod net;
pub mod sim;
pub mod stats;

pub use error::{ConfigError, SimError};

#[cfg(test)]
mod test;
