use crate::registers::{CommandFlags, ModeConfig, StatusFlags};
use crate::sequencer::WriteSequencer;

use super::I8251;

impl I8251 {
    /// Control port write. What the byte means depends on where the chip is
    /// in its programming sequence.
    pub fn control_w(&mut self, data: u8) {
        match self.regs.sequencer {
            WriteSequencer::ExpectMode => self.mode_w(data),
            WriteSequencer::ExpectSync1 => self.sync1_w(data),
            WriteSequencer::ExpectSync2 => self.sync2_w(data),
            WriteSequencer::ExpectCommand => self.command_w(data),
        }
    }

    /// Mode word. The new framing applies from the next clock tick; any
    /// character in flight is dropped.
    fn mode_w(&mut self, data: u8) {
        let mode = ModeConfig::decode(data);
        log::debug!("I8251: mode 0x{:02X} {:?}", data, mode);

        self.regs.mode_byte = data;
        self.regs.mode = mode;
        self.regs.sequencer = WriteSequencer::after_mode(&mode);

        self.tx.reset();
        self.rx.reset();
        let level = self.tx.level();
        self.drive_txd(level);
        self.update_tx_ready();
        self.update_tx_empty();
    }

    fn sync1_w(&mut self, data: u8) {
        log::debug!("I8251: sync1 0x{:02X}", data);
        self.regs.sync.sync1 = data;
        self.regs.sequencer = WriteSequencer::after_sync1(&self.regs.mode);
    }

    fn sync2_w(&mut self, data: u8) {
        log::debug!("I8251: sync2 0x{:02X}", data);
        self.regs.sync.sync2 = data;
        self.regs.sequencer = WriteSequencer::after_sync2();
    }

    /// Command word.
    ///
    /// DTR and RTS are re-driven on every command (the pins are active
    /// low), including one that sets IR. Otherwise IR wins: the chip goes
    /// back to mode programming and the rest of the byte is ignored. ER, IR
    /// and EH are one-shot actions and are not retained in the command
    /// register.
    fn command_w(&mut self, data: u8) {
        let command = CommandFlags::from_bits_retain(data);
        log::debug!("I8251: command 0x{:02X} {:?}", data, command);

        self.lines.rts.write(!command.contains(CommandFlags::RTS));
        self.lines.dtr.write(!command.contains(CommandFlags::DTR));

        if WriteSequencer::after_command(command) == WriteSequencer::ExpectMode {
            self.internal_reset();
            return;
        }

        let previous = self.regs.command;
        self.regs.command = command.difference(CommandFlags::ACTIONS);

        if command.contains(CommandFlags::ERROR_RESET) {
            self.regs.status.remove(StatusFlags::ERRORS);
        }

        if !command.contains(CommandFlags::RX_ENABLE) {
            self.rx.reset();
        } else if command.contains(CommandFlags::ENTER_HUNT) && self.regs.mode.is_sync() {
            self.enter_hunt();
        }

        if previous.contains(CommandFlags::SEND_BREAK) != command.contains(CommandFlags::SEND_BREAK)
        {
            let level = self.tx.level();
            self.drive_txd(level);
        }

        if command.contains(CommandFlags::TX_ENABLE) && !previous.contains(CommandFlags::TX_ENABLE) {
            self.check_for_tx_start();
        }

        self.update_rx_ready();
        self.update_tx_ready();
        self.update_tx_empty();
    }

    /// IR: drop all transfer state, errors and the command register and
    /// return to mode programming. Unlike [`I8251::reset`] the modem
    /// outputs and the interrupt mask register are left alone.
    fn internal_reset(&mut self) {
        log::debug!("I8251: internal reset");
        let had_syndet = self.regs.status.contains(StatusFlags::SYNDET);
        let txd_low = self.regs.command.contains(CommandFlags::SEND_BREAK) || !self.tx.level();

        self.reset_state();

        if txd_low {
            self.drive_txd(true);
        }
        if had_syndet {
            self.lines.syndet.write(false);
        }
        self.update_tx_empty();
        self.update_rx_ready();
        self.update_tx_ready();
    }
}
