mod parity;
pub mod registers;
mod sequencer;
mod usart;

pub use parity::{check_parity, compute_parity};
pub use registers::{
    BaudRateFactor, CommandFlags, ModeConfig, Parity, RegisterFile, StatusFlags, StopBits,
    SyncBytes,
};
pub use sequencer::WriteSequencer;
pub use usart::{Variant, I8251};

/// Data register offset in the two-port view (A0 = 0).
pub const DATA_PORT: u8 = 0;
/// Control (write) / status (read) offset in the two-port view (A0 = 1).
pub const CONTROL_PORT: u8 = 1;
/// Interrupt mask register offset on the V5x serial control unit.
pub const INTERRUPT_MASK_PORT: u8 = 3;
/// Interrupt mask value after reset on the V5x serial control unit
/// (both receive and transmit interrupts masked).
pub const INTERRUPT_MASK_RESET: u8 = 0x03;
