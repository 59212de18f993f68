use crate::parity::check_parity;
use crate::registers::{ModeConfig, Parity, RegisterFile, StatusFlags, SyncBytes};

use super::I8251;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum RxState {
    /// Waiting for RxD to go low (async) or for the first bit of the next
    /// character (sync).
    #[default]
    Idle,
    /// Stop bit was low: wait for the line to return to marking before
    /// looking for another start bit.
    WaitMark,
    /// Start bit seen, validate it at its centre.
    Start,
    /// Next data bit to sample.
    Data(u8),
    Parity,
    Stop,
}

/// What a receive clock tick produced.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum RxEvent {
    None,
    Character {
        data: u8,
        parity_error: bool,
        framing_error: bool,
    },
    SyncDetected,
}

/// Receive shift register, bit sampler and sync hunt logic.
#[derive(Debug, Default)]
pub(super) struct Receiver {
    state: RxState,
    shift: u8,
    parity_error: bool,
    /// External RxC ticks until the next sample point.
    countdown: u32,
    hunting: bool,
    /// Trailing bits seen while hunting, oldest bit in bit 0.
    window: u32,
    window_bits: u32,
}

impl Receiver {
    pub(super) fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub(super) fn is_hunting(&self) -> bool {
        self.hunting
    }

    pub(super) fn enter_hunt(&mut self) {
        self.reset();
        self.hunting = true;
    }

    /// Leave hunt mode; the next bit starts a character.
    pub(super) fn exit_hunt(&mut self) {
        self.reset();
    }

    /// One external RxC tick with the current RxD level.
    pub(super) fn tick(&mut self, regs: &RegisterFile, rxd: bool) -> RxEvent {
        if regs.mode.is_sync() {
            self.tick_sync(&regs.mode, &regs.sync, rxd)
        } else {
            self.tick_async(&regs.mode, rxd)
        }
    }

    fn tick_async(&mut self, mode: &ModeConfig, rxd: bool) -> RxEvent {
        match self.state {
            RxState::WaitMark => {
                if rxd {
                    self.state = RxState::Idle;
                }
                return RxEvent::None;
            }
            RxState::Idle => {
                if rxd {
                    return RxEvent::None;
                }
                // Falling edge: sample again half a bit later. At ×1 the
                // detecting tick is already the centre of the start bit.
                self.state = RxState::Start;
                self.countdown = mode.ticks_per_bit() / 2;
                if self.countdown > 0 {
                    return RxEvent::None;
                }
            }
            _ => {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown > 0 {
                    return RxEvent::None;
                }
            }
        }

        self.countdown = mode.ticks_per_bit();
        match self.state {
            RxState::Start => {
                if rxd {
                    log::trace!("I8251: false start bit");
                    self.state = RxState::Idle;
                } else {
                    self.begin_character();
                }
                RxEvent::None
            }
            RxState::Data(bit) => {
                self.sample_data(mode, bit, rxd);
                RxEvent::None
            }
            RxState::Parity => {
                self.check_parity_bit(mode, rxd);
                self.state = RxState::Stop;
                RxEvent::None
            }
            RxState::Stop => {
                // Only the first stop bit is checked.
                self.state = if rxd { RxState::Idle } else { RxState::WaitMark };
                RxEvent::Character {
                    data: self.shift,
                    parity_error: self.parity_error,
                    framing_error: !rxd,
                }
            }
            RxState::Idle | RxState::WaitMark => RxEvent::None,
        }
    }

    fn tick_sync(&mut self, mode: &ModeConfig, sync: &SyncBytes, rxd: bool) -> RxEvent {
        if self.hunting {
            if mode.external_sync {
                // Alignment comes from the SYNDET input instead.
                return RxEvent::None;
            }
            return self.hunt(mode, sync, rxd);
        }

        match self.state {
            RxState::Data(bit) => self.sample_data(mode, bit, rxd),
            RxState::Parity => {
                self.check_parity_bit(mode, rxd);
                self.state = RxState::Idle;
            }
            _ => {
                self.begin_character();
                self.sample_data(mode, 0, rxd);
            }
        }

        if self.state == RxState::Idle {
            RxEvent::Character {
                data: self.shift,
                parity_error: self.parity_error,
                framing_error: false,
            }
        } else {
            RxEvent::None
        }
    }

    fn hunt(&mut self, mode: &ModeConfig, sync: &SyncBytes, rxd: bool) -> RxEvent {
        let (pattern, width) = sync.pattern(mode);
        self.window = (self.window >> 1) | ((rxd as u32) << (width - 1));
        self.window_bits = (self.window_bits + 1).min(width);
        if self.window_bits == width && self.window == pattern {
            self.exit_hunt();
            return RxEvent::SyncDetected;
        }
        RxEvent::None
    }

    fn check_parity_bit(&mut self, mode: &ModeConfig, rxd: bool) {
        let bits = mode.character_length;
        self.parity_error = !check_parity(self.shift, bits, mode.parity, rxd);
    }

    fn begin_character(&mut self) {
        self.shift = 0;
        self.parity_error = false;
        self.state = RxState::Data(0);
    }

    fn sample_data(&mut self, mode: &ModeConfig, bit: u8, rxd: bool) {
        self.shift |= (rxd as u8) << bit;
        self.state = if bit + 1 < mode.character_length {
            RxState::Data(bit + 1)
        } else if mode.parity != Parity::None {
            RxState::Parity
        } else if mode.is_sync() {
            RxState::Idle
        } else {
            RxState::Stop
        };
    }
}

impl I8251 {
    /// One receive clock tick (a rising RxC edge). Ignored while RxE is
    /// clear.
    pub fn receive_clock(&mut self) {
        if !self.is_rx_enabled() {
            return;
        }
        match self.rx.tick(&self.regs, self.rxd) {
            RxEvent::None => {}
            RxEvent::Character {
                data,
                parity_error,
                framing_error,
            } => self.receive_character(data, parity_error, framing_error),
            RxEvent::SyncDetected => {
                log::debug!("I8251: sync detected, leaving hunt mode");
                self.regs.status.insert(StatusFlags::SYNDET);
                self.lines.syndet.write(true);
            }
        }
    }

    /// Latch a completed character. An unread character is never
    /// overwritten: the new one is dropped and OE is set instead, without
    /// latching PE/FE for the dropped character.
    fn receive_character(&mut self, data: u8, parity_error: bool, framing_error: bool) {
        log::debug!(
            "I8251: received 0x{:02X}{}{}",
            data,
            if parity_error { " (parity error)" } else { "" },
            if framing_error { " (framing error)" } else { "" },
        );
        if self.regs.status.contains(StatusFlags::RX_READY) {
            log::debug!(
                "I8251: overrun, 0x{:02X} dropped, 0x{:02X} unread",
                data,
                self.regs.rx_data
            );
            self.regs.status.insert(StatusFlags::OVERRUN_ERROR);
            return;
        }
        if parity_error {
            self.regs.status.insert(StatusFlags::PARITY_ERROR);
        }
        if framing_error {
            self.regs.status.insert(StatusFlags::FRAMING_ERROR);
        }
        self.regs.rx_data = data;
        self.regs.status.insert(StatusFlags::RX_READY);
        self.update_rx_ready();
    }

    pub(super) fn update_rx_ready(&mut self) {
        let ready = self.regs.status.contains(StatusFlags::RX_READY);
        self.lines.rxrdy.update(ready);
    }

    /// Enter hunt mode: drop SYNDET and search for the sync pattern again.
    pub(super) fn enter_hunt(&mut self) {
        log::debug!("I8251: entering hunt mode");
        self.rx.enter_hunt();
        self.regs.status.remove(StatusFlags::SYNDET);
        if !self.regs.mode.external_sync {
            self.lines.syndet.write(false);
        }
    }
}
