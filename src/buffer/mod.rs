mod bounded;
mod interrupt;
mod slots;

pub use bounded::{BoundedBuffer, BufferStats};
pub use interrupt::Interrupt;
pub use slots::SlotRing;
