//! Intel 8251 USART.
//!
//! The chip is a pure state machine driven by three kinds of stimulus:
//! register accesses from the CPU side (`data_r`/`data_w`/`status_r`/
//! `control_w`, or the offset based `read`/`write`), clock edges on TxC and
//! RxC, and level changes on the modem inputs (CTS, DSR, RxD, SYNDET).
//! Every entry point runs to completion and drives the bound output lines
//! before returning.
//!
//! Output lines are plain injected handlers (`with_*_handler`). A freshly
//! constructed chip is in its reset state but has not driven any line yet;
//! call [`I8251::reset`] once the handlers are bound to publish the
//! power-on levels, the same way a host would pulse the RESET pin.
mod control;
mod io;
mod receive;
mod transmit;

use retroserial_common::OutputLine;

use crate::registers::{CommandFlags, RegisterFile};
use crate::sequencer::WriteSequencer;
use crate::INTERRUPT_MASK_RESET;

use receive::Receiver;
use transmit::Transmitter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Variant {
    #[default]
    I8251,
    /// NEC V5x serial control unit: an 8251 core with an extra interrupt
    /// mask register at offset 3.
    V5xScu,
}

#[derive(Debug)]
pub(crate) struct Lines {
    pub(crate) txd: OutputLine,
    pub(crate) dtr: OutputLine,
    pub(crate) rts: OutputLine,
    pub(crate) rxrdy: OutputLine,
    pub(crate) txrdy: OutputLine,
    pub(crate) txempty: OutputLine,
    pub(crate) syndet: OutputLine,
}

impl Default for Lines {
    fn default() -> Self {
        Self {
            txd: OutputLine::new("txd"),
            dtr: OutputLine::new("dtr"),
            rts: OutputLine::new("rts"),
            rxrdy: OutputLine::new("rxrdy"),
            txrdy: OutputLine::new("txrdy"),
            txempty: OutputLine::new("txempty"),
            syndet: OutputLine::new("syndet"),
        }
    }
}

impl Lines {
    fn invalidate(&mut self) {
        self.rxrdy.invalidate();
        self.txrdy.invalidate();
        self.txempty.invalidate();
    }
}

pub struct I8251 {
    variant: Variant,
    regs: RegisterFile,
    tx: Transmitter,
    rx: Receiver,
    lines: Lines,
    /// CTS input asserted (pin low).
    cts: bool,
    /// DSR input asserted (pin low).
    dsr: bool,
    /// RxD pin level.
    rxd: bool,
    /// Last TxC / RxC levels, for edge detection.
    txc: bool,
    rxc: bool,
    /// SYNDET pin level as driven externally.
    syn: bool,
    /// Only present on variants with the interrupt mask register.
    interrupt_mask: Option<u8>,
}

impl Default for I8251 {
    fn default() -> Self {
        Self::new()
    }
}

impl I8251 {
    pub fn new() -> Self {
        Self::with_variant(Variant::I8251)
    }

    pub fn new_v5x_scu() -> Self {
        Self::with_variant(Variant::V5xScu)
    }

    pub fn with_variant(variant: Variant) -> Self {
        let mut chip = Self {
            variant,
            regs: RegisterFile::new(),
            tx: Transmitter::default(),
            rx: Receiver::default(),
            lines: Lines::default(),
            // Modem inputs idle high: CTS/DSR deasserted, RxD marking.
            cts: false,
            dsr: false,
            rxd: true,
            txc: false,
            rxc: false,
            syn: false,
            interrupt_mask: match variant {
                Variant::I8251 => None,
                Variant::V5xScu => Some(INTERRUPT_MASK_RESET),
            },
        };
        chip.reset_state();
        chip
    }

    #[must_use]
    pub fn with_txd_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.txd.bind(handler);
        self
    }

    #[must_use]
    pub fn with_dtr_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.dtr.bind(handler);
        self
    }

    #[must_use]
    pub fn with_rts_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.rts.bind(handler);
        self
    }

    #[must_use]
    pub fn with_rxrdy_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.rxrdy.bind(handler);
        self
    }

    #[must_use]
    pub fn with_txrdy_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.txrdy.bind(handler);
        self
    }

    #[must_use]
    pub fn with_txempty_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.txempty.bind(handler);
        self
    }

    #[must_use]
    pub fn with_syndet_handler(mut self, handler: impl FnMut(bool) + 'static) -> Self {
        self.lines.syndet.bind(handler);
        self
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[inline]
    pub fn has_interrupt_mask(&self) -> bool {
        self.interrupt_mask.is_some()
    }

    /// Interrupt mask register, `None` on the plain 8251.
    #[inline]
    pub fn interrupt_mask(&self) -> Option<u8> {
        self.interrupt_mask
    }

    /// Write the interrupt mask register. Ignored on the plain 8251.
    pub fn set_interrupt_mask(&mut self, value: u8) {
        match self.interrupt_mask.as_mut() {
            Some(mask) => {
                log::debug!("I8251: interrupt mask 0x{:02X}", value);
                *mask = value;
            }
            None => log::debug!(
                "I8251: interrupt mask write 0x{:02X} ignored, not present on {:?}",
                value,
                self.variant
            ),
        }
    }

    #[inline]
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    #[inline]
    pub fn sequencer(&self) -> WriteSequencer {
        self.regs.sequencer
    }

    /// Receiver is searching for the sync pattern.
    #[inline]
    pub fn is_hunting(&self) -> bool {
        self.rx.is_hunting()
    }

    /// Device-level reset: the chip returns to mode programming, all
    /// transfer state is dropped and the outputs are driven to their
    /// inactive levels. Also restores the interrupt mask register.
    pub fn reset(&mut self) {
        log::debug!("I8251: reset");
        self.reset_state();
        if let Some(mask) = self.interrupt_mask.as_mut() {
            *mask = INTERRUPT_MASK_RESET;
        }

        self.lines.invalidate();
        self.lines.txd.write(true);
        self.lines.rts.write(true);
        self.lines.dtr.write(true);
        self.lines.syndet.write(false);
        self.update_tx_empty();
        self.update_rx_ready();
        self.update_tx_ready();
    }

    fn reset_state(&mut self) {
        self.regs = RegisterFile::new();
        self.tx.reset();
        self.rx.reset();
    }

    /// Transmitter may start a new character: TxEN set and CTS asserted.
    #[inline]
    pub(crate) fn is_tx_enabled(&self) -> bool {
        self.regs.command.contains(CommandFlags::TX_ENABLE) && self.cts
    }

    #[inline]
    pub(crate) fn is_rx_enabled(&self) -> bool {
        self.regs.command.contains(CommandFlags::RX_ENABLE)
    }
}

#[cfg(test)]
mod tests;
