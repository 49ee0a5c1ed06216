pub mod buffer;
pub mod config;
pub mod error;
pub mod pipeline;

pub use buffer::{BoundedBuffer, BufferStats, Interrupt};
pub use error::{BufferError, BufferResult, PutError, TakeError};

#[cfg(test)]
mod tests;
