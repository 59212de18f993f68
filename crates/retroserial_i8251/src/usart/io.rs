use crate::registers::StatusFlags;

use super::I8251;

impl I8251 {
    /// Receive data register. Reading it this way has no side effects;
    /// RxRDY stays set until [`I8251::acknowledge_rx`] (or a bus `read` of
    /// the data port, which does both).
    pub fn data_r(&self) -> u8 {
        if !self.regs.status.contains(StatusFlags::RX_READY) {
            log::debug!("I8251: data_r 0x{:02X} while not ready", self.regs.rx_data);
        }
        self.regs.rx_data
    }

    /// Clear RxRDY after the host has consumed the receive data register.
    pub fn acknowledge_rx(&mut self) {
        self.regs.status.remove(StatusFlags::RX_READY);
        self.update_rx_ready();
    }

    /// Load the transmit holding register. Ignored while it is still full.
    pub fn data_w(&mut self, data: u8) {
        if let Some(pending) = self.regs.tx_holding {
            log::debug!(
                "I8251: data_w 0x{:02X} ignored, 0x{:02X} still pending",
                data,
                pending
            );
            return;
        }
        log::debug!("I8251: data_w 0x{:02X}", data);
        self.regs.tx_holding = Some(data);
        self.update_tx_ready();
        self.update_tx_empty();
    }

    pub fn status(&self) -> StatusFlags {
        let mut status = self.regs.status & StatusFlags::LATCHED;
        status.set(StatusFlags::TX_READY, self.txrdy_r());
        status.set(StatusFlags::TX_EMPTY, self.tx_empty());
        status.set(StatusFlags::DSR, self.dsr);
        status
    }

    /// Status register read. Side-effect free.
    pub fn status_r(&self) -> u8 {
        self.status().bits()
    }

    /// CPU read at `offset`.
    ///
    /// The 8251 decodes only A0. The V5x SCU decodes two address bits and
    /// maps its interrupt mask register at offset 3.
    pub fn read(&mut self, offset: u8) -> u8 {
        match self.interrupt_mask {
            Some(mask) => match offset & 0x03 {
                0 => self.read_data(),
                1 => self.status_r(),
                2 => 0,
                _ => mask,
            },
            None => {
                if offset & 0x01 == 0 {
                    self.read_data()
                } else {
                    self.status_r()
                }
            }
        }
    }

    /// CPU write at `offset`. See [`I8251::read`] for the decoding.
    pub fn write(&mut self, offset: u8, data: u8) {
        if self.has_interrupt_mask() {
            match offset & 0x03 {
                0 => self.data_w(data),
                1 => self.control_w(data),
                2 => log::debug!("I8251: write 0x{:02X} to reserved offset 2", data),
                _ => self.set_interrupt_mask(data),
            }
        } else if offset & 0x01 == 0 {
            self.data_w(data);
        } else {
            self.control_w(data);
        }
    }

    /// Data port read strobe: the CPU takes the character and RxRDY drops.
    fn read_data(&mut self) -> u8 {
        let data = self.data_r();
        self.acknowledge_rx();
        data
    }

    pub fn write_rxd(&mut self, state: bool) {
        self.rxd = state;
    }

    /// CTS input, active low. Only gates the start of a character.
    pub fn write_cts(&mut self, state: bool) {
        self.cts = !state;
        if self.cts {
            self.check_for_tx_start();
        } else {
            self.update_tx_ready();
            self.update_tx_empty();
        }
    }

    /// DSR input, active low. Reported in status bit 7 only.
    pub fn write_dsr(&mut self, state: bool) {
        self.dsr = !state;
    }

    /// Transmit clock. The transmitter advances on falling edges.
    pub fn write_txc(&mut self, state: bool) {
        if self.txc != state {
            self.txc = state;
            if !state {
                self.transmit_clock();
            }
        }
    }

    /// Receive clock. The receiver samples on rising edges.
    pub fn write_rxc(&mut self, state: bool) {
        if self.rxc != state {
            self.rxc = state;
            if state {
                self.receive_clock();
            }
        }
    }

    /// SYNDET pin driven by external logic. With external sync detect
    /// programmed, a rising level ends hunt mode.
    pub fn write_syn(&mut self, state: bool) {
        let rising = state && !self.syn;
        self.syn = state;
        let mode = &self.regs.mode;
        if !(rising && mode.is_sync() && mode.external_sync && self.rx.is_hunting()) {
            return;
        }
        log::debug!("I8251: external sync detect, leaving hunt mode");
        self.rx.exit_hunt();
        self.regs.status.insert(StatusFlags::SYNDET);
    }
}
