use crate::parity::{compute_parity, word_mask};
use crate::registers::{CommandFlags, ModeConfig, RegisterFile};

use super::I8251;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum TxState {
    /// Shift register empty.
    #[default]
    Idle,
    /// Shift register loaded, start bit goes out on the next bit boundary.
    Start,
    /// Next data bit to shift out.
    Data(u8),
    Parity,
    Stop,
}

/// Transmit shift register and its bit sequencer.
#[derive(Debug)]
pub(super) struct Transmitter {
    state: TxState,
    shift: u8,
    parity: Option<bool>,
    /// External TxC ticks left in the bit currently on the line. Zero or one
    /// means the next tick is a bit boundary.
    remaining: u32,
    /// Level the shifter drives, before SBRK is applied.
    level: bool,
    /// Current character is automatically inserted sync fill.
    filling: bool,
    /// Which sync character the next fill uses.
    fill_index: u8,
    /// Sync mode: at least one character went out since the last reset,
    /// so an empty holding register is filled with sync characters.
    started: bool,
}

impl Default for Transmitter {
    fn default() -> Self {
        Self {
            state: TxState::Idle,
            shift: 0,
            parity: None,
            remaining: 0,
            level: true,
            filling: false,
            fill_index: 0,
            started: false,
        }
    }
}

impl Transmitter {
    pub(super) fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub(super) fn is_idle(&self) -> bool {
        self.state == TxState::Idle
    }

    /// Shift register holds nothing the CPU wrote: it is idle or sending
    /// sync fill.
    #[inline]
    pub(super) fn is_shift_empty(&self) -> bool {
        self.is_idle() || self.filling
    }

    #[inline]
    pub(super) fn level(&self) -> bool {
        self.level
    }

    /// Move a character into the shift register.
    pub(super) fn load(&mut self, data: u8, mode: &ModeConfig, fill: bool) {
        let bits = mode.character_length;
        self.shift = data & word_mask(bits);
        self.parity = compute_parity(self.shift, bits, mode.parity);
        self.filling = fill;
        self.started = true;
        if !fill {
            self.fill_index = 0;
        }
        // Sync characters have no start bit.
        self.state = if mode.is_sync() {
            TxState::Data(0)
        } else {
            TxState::Start
        };
    }

    /// One external TxC tick. Returns the level to drive on TxD when the
    /// tick lands on a bit boundary and the line changes or a bit is
    /// shifted.
    ///
    /// `enabled` gates only the start of a new character; a character
    /// already in the shift register always completes.
    pub(super) fn tick(&mut self, regs: &mut RegisterFile, enabled: bool) -> Option<bool> {
        if self.remaining > 1 {
            self.remaining -= 1;
            return None;
        }
        self.remaining = 0;

        if self.is_idle() && enabled {
            if let Some(data) = regs.tx_holding.take() {
                log::debug!("I8251: start_tx 0x{:02X}", data);
                self.load(data, &regs.mode, false);
            } else if regs.mode.is_sync() && self.started {
                let fill = regs.sync.get(self.fill_index);
                log::trace!("I8251: tx underrun, inserting sync 0x{:02X}", fill);
                self.fill_index = (self.fill_index + 1) % regs.mode.sync_byte_count;
                self.load(fill, &regs.mode, true);
            }
        }

        if self.is_idle() {
            // Nothing to send: return the line to marking.
            if self.level {
                return None;
            }
            self.level = true;
            return Some(true);
        }

        Some(self.shift_bit(&regs.mode))
    }

    fn shift_bit(&mut self, mode: &ModeConfig) -> bool {
        let tpb = mode.ticks_per_bit();
        let (level, next, ticks) = match self.state {
            TxState::Idle => unreachable!("shift_bit called with an empty shift register"),
            TxState::Start => (false, TxState::Data(0), tpb),
            TxState::Data(bit) => {
                let level = (self.shift >> bit) & 1 != 0;
                let next = if bit + 1 < mode.character_length {
                    TxState::Data(bit + 1)
                } else if self.parity.is_some() {
                    TxState::Parity
                } else {
                    Self::end_of_character(mode)
                };
                (level, next, tpb)
            }
            TxState::Parity => (
                self.parity.unwrap_or(false),
                Self::end_of_character(mode),
                tpb,
            ),
            TxState::Stop => (true, TxState::Idle, mode.stop_ticks()),
        };

        self.state = next;
        self.remaining = ticks;
        self.level = level;
        if self.is_idle() {
            self.filling = false;
        }
        level
    }

    fn end_of_character(mode: &ModeConfig) -> TxState {
        if mode.is_sync() {
            TxState::Idle
        } else {
            TxState::Stop
        }
    }
}

impl I8251 {
    /// One transmit clock tick (a falling TxC edge). The baud rate factor
    /// divides these into bit times.
    pub fn transmit_clock(&mut self) {
        let enabled = self.is_tx_enabled();
        if let Some(level) = self.tx.tick(&mut self.regs, enabled) {
            self.drive_txd(level);
        }
        self.update_tx_ready();
        self.update_tx_empty();
    }

    /// Start the transmitter right away if a character is waiting and the
    /// enable conditions hold. The start bit follows on the next bit
    /// boundary.
    pub(super) fn check_for_tx_start(&mut self) {
        if self.tx.is_idle() && self.is_tx_enabled() {
            if let Some(data) = self.regs.tx_holding.take() {
                log::debug!("I8251: start_tx 0x{:02X}", data);
                self.tx.load(data, &self.regs.mode, false);
            }
        }
        self.update_tx_ready();
        self.update_tx_empty();
    }

    /// Drive TxD from the shifter, holding it low while SBRK is set.
    pub(super) fn drive_txd(&mut self, level: bool) {
        let level = level && !self.regs.command.contains(CommandFlags::SEND_BREAK);
        self.lines.txd.write(level);
    }

    /// TxRDY: holding register empty, TxEN set and CTS asserted.
    pub fn txrdy_r(&self) -> bool {
        self.is_tx_enabled() && self.regs.tx_holding.is_none()
    }

    /// TxEMPTY: holding and shift registers both empty.
    pub fn tx_empty(&self) -> bool {
        self.regs.tx_holding.is_none() && self.tx.is_shift_empty()
    }

    pub(super) fn update_tx_ready(&mut self) {
        let ready = self.txrdy_r();
        self.lines.txrdy.update(ready);
    }

    pub(super) fn update_tx_empty(&mut self) {
        let empty = self.tx_empty();
        self.lines.txempty.update(empty);
    }
}
