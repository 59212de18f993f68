//! Register file of the 8251.
//!
//! The part exposes only two ports to the CPU (data and control/status) but
//! keeps considerably more state behind them: the mode word programmed right
//! after reset, up to two sync characters, the command word, the status
//! latches and the receive/transmit data registers. This module holds that
//! state as plain data; the behaviour lives in [`crate::I8251`].

use bitflags::bitflags;

use crate::parity::{compute_parity, word_mask};
use crate::sequencer::WriteSequencer;

/// Clock multiplier selected by mode bits 1..0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BaudRateFactor {
    /// `00`: synchronous mode, one bit per clock.
    Sync,
    /// `01`: asynchronous, clock = bit rate.
    #[default]
    X1,
    /// `10`: asynchronous, clock = 16 × bit rate.
    X16,
    /// `11`: asynchronous, clock = 64 × bit rate.
    X64,
}

impl BaudRateFactor {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0x00 => BaudRateFactor::Sync,
            0x01 => BaudRateFactor::X1,
            0x02 => BaudRateFactor::X16,
            _ => BaudRateFactor::X64,
        }
    }

    /// External clock ticks per serial bit.
    #[inline]
    pub fn ticks_per_bit(self) -> u32 {
        match self {
            BaudRateFactor::Sync | BaudRateFactor::X1 => 1,
            BaudRateFactor::X16 => 16,
            BaudRateFactor::X64 => 64,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Async stop bit length selected by mode bits 7..6.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum StopBits {
    #[default]
    One,
    OneAndHalf,
    Two,
}

impl StopBits {
    #[inline]
    pub fn half_bits(self) -> u32 {
        match self {
            StopBits::One => 2,
            StopBits::OneAndHalf => 3,
            StopBits::Two => 4,
        }
    }
}

/// Decoded mode word.
///
/// Layout:
/// - bits 1..0: baud rate factor (`00` selects synchronous mode)
/// - bits 3..2: character length, 5 + value
/// - bit 4: parity enable
/// - bit 5: even parity (odd when clear)
/// - async, bits 7..6: stop bits (`01` 1, `10` 1.5, `11` 2)
/// - sync, bit 6: external sync detect
/// - sync, bit 7: single sync character
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ModeConfig {
    pub baud_rate_factor: BaudRateFactor,
    /// Data bits per character, 5..=8.
    pub character_length: u8,
    pub parity: Parity,
    /// Stop bits; `None` in synchronous mode.
    pub stop_bits: Option<StopBits>,
    /// 0 in asynchronous mode, 1 or 2 in synchronous mode.
    pub sync_byte_count: u8,
    /// Sync mode only: SYNDET is an input driven by external logic.
    pub external_sync: bool,
}

impl Default for ModeConfig {
    /// Async ×1, 8 data bits, no parity, one stop bit.
    fn default() -> Self {
        Self {
            baud_rate_factor: BaudRateFactor::X1,
            character_length: 8,
            parity: Parity::None,
            stop_bits: Some(StopBits::One),
            sync_byte_count: 0,
            external_sync: false,
        }
    }
}

impl ModeConfig {
    pub fn decode(byte: u8) -> Self {
        let baud_rate_factor = BaudRateFactor::from_bits(byte);
        let character_length = 5 + ((byte >> 2) & 0x03);
        let parity = match (byte >> 4) & 0x03 {
            0x01 => Parity::Odd,
            0x03 => Parity::Even,
            _ => Parity::None,
        };

        if baud_rate_factor == BaudRateFactor::Sync {
            Self {
                baud_rate_factor,
                character_length,
                parity,
                stop_bits: None,
                sync_byte_count: if byte & 0x80 != 0 { 1 } else { 2 },
                external_sync: byte & 0x40 != 0,
            }
        } else {
            let stop_bits = match byte >> 6 {
                0x01 => StopBits::One,
                0x02 => StopBits::OneAndHalf,
                0x03 => StopBits::Two,
                _ => {
                    log::warn!(
                        "I8251: mode 0x{:02X} selects reserved stop bit encoding, using 1",
                        byte
                    );
                    StopBits::One
                }
            };
            Self {
                baud_rate_factor,
                character_length,
                parity,
                stop_bits: Some(stop_bits),
                sync_byte_count: 0,
                external_sync: false,
            }
        }
    }

    #[inline]
    pub fn is_sync(&self) -> bool {
        self.sync_byte_count != 0
    }

    #[inline]
    pub fn single_sync(&self) -> bool {
        self.sync_byte_count == 1
    }

    #[inline]
    pub fn ticks_per_bit(&self) -> u32 {
        self.baud_rate_factor.ticks_per_bit()
    }

    /// External ticks the stop bit(s) occupy on the line. 1.5 stop bits at
    /// ×1 round up to two whole bit times.
    pub fn stop_ticks(&self) -> u32 {
        match self.stop_bits {
            Some(stop) => (stop.half_bits() * self.ticks_per_bit()).div_ceil(2),
            None => 0,
        }
    }

    /// External ticks needed to shift one complete character.
    pub fn frame_ticks(&self) -> u32 {
        let tpb = self.ticks_per_bit();
        let data = self.character_length as u32 + (self.parity != Parity::None) as u32;
        if self.is_sync() {
            data * tpb
        } else {
            (1 + data) * tpb + self.stop_ticks()
        }
    }
}

bitflags! {
    /// Command word, written to the control port once mode (and sync)
    /// programming is complete.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u8 {
        /// TxEN: transmit enable.
        const TX_ENABLE = 1 << 0;
        /// DTR output (active low on the pin).
        const DTR = 1 << 1;
        /// RxE: receive enable.
        const RX_ENABLE = 1 << 2;
        /// SBRK: hold TxD low.
        const SEND_BREAK = 1 << 3;
        /// ER: clear PE/OE/FE.
        const ERROR_RESET = 1 << 4;
        /// RTS output (active low on the pin).
        const RTS = 1 << 5;
        /// IR: return to mode programming.
        const INTERNAL_RESET = 1 << 6;
        /// EH: enter hunt mode (sync only).
        const ENTER_HUNT = 1 << 7;
    }
}

impl CommandFlags {
    /// One-shot bits that trigger an action and are not retained.
    pub const ACTIONS: Self = Self::ERROR_RESET
        .union(Self::INTERNAL_RESET)
        .union(Self::ENTER_HUNT);
}

bitflags! {
    /// Status register as read from the control port.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const TX_READY = 1 << 0;
        const RX_READY = 1 << 1;
        const TX_EMPTY = 1 << 2;
        const PARITY_ERROR = 1 << 3;
        const OVERRUN_ERROR = 1 << 4;
        const FRAMING_ERROR = 1 << 5;
        const SYNDET = 1 << 6;
        const DSR = 1 << 7;
    }
}

impl StatusFlags {
    /// Sticky error bits cleared by ER or reset.
    pub const ERRORS: Self = Self::PARITY_ERROR
        .union(Self::OVERRUN_ERROR)
        .union(Self::FRAMING_ERROR);

    /// Bits latched in the register file. TxRDY, TxEMPTY and DSR are
    /// computed from live state when the status port is read.
    pub const LATCHED: Self = Self::RX_READY.union(Self::ERRORS).union(Self::SYNDET);
}

/// Sync characters programmed after a synchronous mode word.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SyncBytes {
    pub sync1: u8,
    pub sync2: u8,
}

impl SyncBytes {
    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        if index == 0 {
            self.sync1
        } else {
            self.sync2
        }
    }

    /// Hunt pattern in wire order (first bit on the wire in bit 0) and its
    /// width in bits.
    ///
    /// Each configured sync character contributes `character_length` bits
    /// followed by its parity bit when parity is enabled, so a double sync
    /// pattern spans two full characters.
    pub fn pattern(&self, mode: &ModeConfig) -> (u32, u32) {
        let bits = mode.character_length;
        let mut pattern = 0u32;
        let mut width = 0u32;
        for index in 0..mode.sync_byte_count {
            let ch = self.get(index) & word_mask(bits);
            pattern |= (ch as u32) << width;
            width += bits as u32;
            if let Some(parity) = compute_parity(ch, bits, mode.parity) {
                pattern |= (parity as u32) << width;
                width += 1;
            }
        }
        (pattern, width)
    }
}

/// Chip-internal registers, owned by a single [`crate::I8251`].
#[derive(Debug)]
pub struct RegisterFile {
    pub(crate) mode: ModeConfig,
    pub(crate) mode_byte: u8,
    pub(crate) command: CommandFlags,
    /// Latched status bits (see [`StatusFlags::LATCHED`]).
    pub(crate) status: StatusFlags,
    pub(crate) sync: SyncBytes,
    /// Last character assembled by the receiver.
    pub(crate) rx_data: u8,
    /// Transmit holding register; `None` when empty.
    pub(crate) tx_holding: Option<u8>,
    pub(crate) sequencer: WriteSequencer,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            mode: ModeConfig::default(),
            mode_byte: 0,
            command: CommandFlags::empty(),
            status: StatusFlags::empty(),
            sync: SyncBytes::default(),
            rx_data: 0,
            tx_holding: None,
            sequencer: WriteSequencer::ExpectMode,
        }
    }

    #[inline]
    pub fn mode(&self) -> &ModeConfig {
        &self.mode
    }

    /// Raw mode byte as last written.
    #[inline]
    pub fn mode_byte(&self) -> u8 {
        self.mode_byte
    }

    #[inline]
    pub fn command(&self) -> CommandFlags {
        self.command
    }

    #[inline]
    pub fn latched_status(&self) -> StatusFlags {
        self.status
    }

    #[inline]
    pub fn sync_bytes(&self) -> SyncBytes {
        self.sync
    }

    #[inline]
    pub fn rx_data(&self) -> u8 {
        self.rx_data
    }

    #[inline]
    pub fn tx_holding(&self) -> Option<u8> {
        self.tx_holding
    }

    #[inline]
    pub fn sequencer(&self) -> WriteSequencer {
        self.sequencer
    }
}
