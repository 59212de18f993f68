use retroserial_common::LineProbe;

use super::I8251;
use crate::registers::StatusFlags;
use crate::sequencer::WriteSequencer;
use crate::{CONTROL_PORT, DATA_PORT, INTERRUPT_MASK_PORT, INTERRUPT_MASK_RESET};

const MODE_8N1_X1: u8 = 0x4D;
const MODE_8N1_X16: u8 = 0x4E;
const MODE_7E1_X1: u8 = 0x79;
const MODE_SYNC_SINGLE: u8 = 0x8C;
const MODE_SYNC_DOUBLE: u8 = 0x0C;
const MODE_SYNC_EXTERNAL: u8 = 0xCC;

const CMD_TXEN: u8 = 0x01;
const CMD_DTR: u8 = 0x02;
const CMD_RXE: u8 = 0x04;
const CMD_SBRK: u8 = 0x08;
const CMD_ER: u8 = 0x10;
const CMD_RTS: u8 = 0x20;
const CMD_IR: u8 = 0x40;
const CMD_EH: u8 = 0x80;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A chip with a probe on every output line, already reset.
struct Bench {
    chip: I8251,
    txd: LineProbe,
    dtr: LineProbe,
    rts: LineProbe,
    rxrdy: LineProbe,
    txrdy: LineProbe,
    txempty: LineProbe,
    syndet: LineProbe,
}

impl Bench {
    fn new() -> Self {
        Self::with_chip(I8251::new())
    }

    fn with_chip(chip: I8251) -> Self {
        init_logger();
        let txd = LineProbe::new();
        let dtr = LineProbe::new();
        let rts = LineProbe::new();
        let rxrdy = LineProbe::new();
        let txrdy = LineProbe::new();
        let txempty = LineProbe::new();
        let syndet = LineProbe::new();
        let mut chip = chip
            .with_txd_handler(txd.handler())
            .with_dtr_handler(dtr.handler())
            .with_rts_handler(rts.handler())
            .with_rxrdy_handler(rxrdy.handler())
            .with_txrdy_handler(txrdy.handler())
            .with_txempty_handler(txempty.handler())
            .with_syndet_handler(syndet.handler());
        chip.reset();
        Self {
            chip,
            txd,
            dtr,
            rts,
            rxrdy,
            txrdy,
            txempty,
            syndet,
        }
    }

    fn clear_probes(&self) {
        for probe in [
            &self.txd,
            &self.dtr,
            &self.rts,
            &self.rxrdy,
            &self.txrdy,
            &self.txempty,
            &self.syndet,
        ] {
            probe.clear();
        }
    }

    fn program(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.chip.control_w(byte);
        }
    }

    /// Async mode with the transmitter cleared to send.
    fn program_async(&mut self, mode: u8, command: u8) {
        self.program(&[mode, command]);
        self.chip.write_cts(false);
        self.clear_probes();
    }

    fn transmit_ticks(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.chip.transmit_clock();
        }
    }

    /// Hold each bit on RxD for `ticks_per_bit` receive clocks.
    fn receive_bits(&mut self, bits: &[bool], ticks_per_bit: u32) {
        for &bit in bits {
            self.chip.write_rxd(bit);
            for _ in 0..ticks_per_bit {
                self.chip.receive_clock();
            }
        }
    }

    fn status(&self) -> StatusFlags {
        StatusFlags::from_bits_retain(self.chip.status_r())
    }
}

fn bits_of(data: u8, width: u8) -> Vec<bool> {
    (0..width).map(|bit| (data >> bit) & 1 != 0).collect()
}

fn async_frame(data: u8, width: u8, parity: Option<bool>, stop_bits: usize) -> Vec<bool> {
    let mut frame = vec![false];
    frame.extend(bits_of(data, width));
    frame.extend(parity);
    frame.extend(std::iter::repeat(true).take(stop_bits));
    frame
}

#[test]
fn construction_drives_nothing_until_reset() {
    init_logger();
    let txd = LineProbe::new();
    let txempty = LineProbe::new();
    let mut chip = I8251::new()
        .with_txd_handler(txd.handler())
        .with_txempty_handler(txempty.handler());
    assert!(txd.is_empty());
    assert!(txempty.is_empty());
    assert_eq!(chip.sequencer(), WriteSequencer::ExpectMode);

    chip.reset();
    assert_eq!(txd.history(), vec![true]);
    assert_eq!(txempty.history(), vec![true]);
}

#[test]
fn reset_publishes_inactive_levels() {
    let bench = Bench::new();
    assert_eq!(bench.txd.history(), vec![true]);
    assert_eq!(bench.rts.history(), vec![true]);
    assert_eq!(bench.dtr.history(), vec![true]);
    assert_eq!(bench.syndet.history(), vec![false]);
    assert_eq!(bench.txempty.history(), vec![true]);
    assert_eq!(bench.rxrdy.history(), vec![false]);
    assert_eq!(bench.txrdy.history(), vec![false]);
    assert_eq!(bench.chip.status_r(), StatusFlags::TX_EMPTY.bits());
}

#[test]
fn async_mode_goes_straight_to_command() {
    let mut bench = Bench::new();
    bench.chip.control_w(MODE_8N1_X1);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectCommand);
    assert_eq!(bench.chip.registers().mode_byte(), MODE_8N1_X1);
    assert_eq!(bench.chip.registers().mode().character_length, 8);
}

#[test]
fn sync_mode_consumes_sync_characters() {
    let mut bench = Bench::new();
    bench.chip.control_w(MODE_SYNC_DOUBLE);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectSync1);
    bench.chip.control_w(0x16);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectSync2);
    bench.chip.control_w(0x96);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectCommand);

    let sync = bench.chip.registers().sync_bytes();
    assert_eq!((sync.sync1, sync.sync2), (0x16, 0x96));
}

#[test]
fn transmit_8n1_frame() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN | CMD_RXE);
    assert!(bench.chip.txrdy_r());

    bench.chip.data_w(0x41);
    assert!(!bench.chip.txrdy_r());
    assert_eq!(bench.txempty.last(), Some(false));

    // First tick moves the character into the shifter and emits the start bit.
    bench.transmit_ticks(1);
    assert!(bench.chip.txrdy_r());
    assert_eq!(bench.txrdy.last(), Some(true));
    assert!(!bench.chip.tx_empty());

    bench.transmit_ticks(8);
    assert!(!bench.chip.tx_empty());
    bench.transmit_ticks(1);
    assert!(bench.chip.tx_empty());
    assert_eq!(bench.txempty.last(), Some(true));

    let expected = [
        false, true, false, false, false, false, false, true, false, true,
    ];
    assert_eq!(bench.txd.history(), expected);
    assert_eq!(bench.txd.history(), async_frame(0x41, 8, None, 1));

    // Idle line stays marking without further writes.
    bench.transmit_ticks(5);
    assert_eq!(bench.txd.len(), 10);
}

#[test]
fn loopback_8n1_round_trip() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN | CMD_RXE);
    bench.chip.data_w(0x41);
    bench.transmit_ticks(10);

    let line = bench.txd.history();
    bench.receive_bits(&line, 1);

    assert_eq!(bench.rxrdy.history(), vec![true]);
    let status = bench.status();
    assert!(status.contains(StatusFlags::RX_READY));
    assert!(!status.intersects(StatusFlags::ERRORS));
    assert_eq!(bench.chip.data_r(), 0x41);
    // data_r alone does not acknowledge.
    assert!(bench.status().contains(StatusFlags::RX_READY));

    bench.chip.acknowledge_rx();
    assert!(!bench.status().contains(StatusFlags::RX_READY));
    assert_eq!(bench.rxrdy.last(), Some(false));
}

#[test]
fn transmit_7e1_frame_carries_parity() {
    let mut bench = Bench::new();
    bench.program_async(MODE_7E1_X1, CMD_TXEN);
    bench.chip.data_w(0x43);
    bench.transmit_ticks(10);
    // 0x43 has three ones in its low seven bits, so even parity sends a 1.
    assert_eq!(bench.txd.history(), async_frame(0x43, 7, Some(true), 1));
}

#[test]
fn transmit_x16_shifts_on_bit_boundaries() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X16, CMD_TXEN);
    bench.chip.data_w(0x5A);

    bench.transmit_ticks(144);
    assert_eq!(bench.txd.len(), 9);
    assert!(!bench.chip.tx_empty());

    bench.transmit_ticks(1);
    assert_eq!(bench.txd.history(), async_frame(0x5A, 8, None, 1));
    assert!(bench.chip.tx_empty());
}

#[test]
fn back_to_back_characters_have_no_gap() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN);
    bench.chip.data_w(0x41);
    bench.transmit_ticks(1);
    bench.chip.data_w(0x42);
    bench.transmit_ticks(19);

    let mut expected = async_frame(0x41, 8, None, 1);
    expected.extend(async_frame(0x42, 8, None, 1));
    assert_eq!(bench.txd.history(), expected);
    // TxEMPTY only rises once the second stop bit is out.
    assert_eq!(bench.txempty.history(), vec![false, true]);
}

#[test]
fn data_write_ignored_while_holding_full() {
    let mut bench = Bench::new();
    bench.program(&[MODE_8N1_X1, CMD_RXE]);
    bench.chip.data_w(0x41);
    bench.chip.data_w(0x42);
    assert_eq!(bench.chip.registers().tx_holding(), Some(0x41));
}

#[test]
fn cts_gates_only_character_start() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN);
    bench.chip.data_w(0x41);
    bench.transmit_ticks(3);

    bench.chip.write_cts(true);
    assert!(!bench.chip.txrdy_r());
    bench.chip.data_w(0x42);
    bench.transmit_ticks(20);

    // The character in flight completed; the next one waits for CTS.
    assert_eq!(bench.txd.history(), async_frame(0x41, 8, None, 1));
    assert_eq!(bench.chip.registers().tx_holding(), Some(0x42));
    assert!(!bench.chip.tx_empty());

    bench.chip.write_cts(false);
    assert_eq!(bench.chip.registers().tx_holding(), None);
    assert!(bench.chip.txrdy_r());
    bench.transmit_ticks(10);
    let mut expected = async_frame(0x41, 8, None, 1);
    expected.extend(async_frame(0x42, 8, None, 1));
    assert_eq!(bench.txd.history(), expected);
}

#[test]
fn txrdy_pin_matches_status_bit() {
    let mut bench = Bench::new();
    bench.program(&[MODE_8N1_X1, CMD_TXEN]);
    let consistent = |bench: &Bench| {
        let bit = bench.status().contains(StatusFlags::TX_READY);
        bit == bench.chip.txrdy_r() && Some(bit) == bench.txrdy.last()
    };
    assert!(consistent(&bench));
    bench.chip.write_cts(false);
    assert!(consistent(&bench));
    bench.chip.data_w(0x41);
    assert!(consistent(&bench));
    bench.transmit_ticks(1);
    assert!(consistent(&bench));
    bench.chip.control_w(CMD_RXE);
    assert!(consistent(&bench));
    assert!(!bench.chip.txrdy_r());
}

#[test]
fn status_read_is_side_effect_free() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN | CMD_RXE);
    bench.receive_bits(&async_frame(0x30, 8, None, 1), 1);
    bench.receive_bits(&async_frame(0x31, 8, None, 1), 1);

    let first = bench.chip.status_r();
    let second = bench.chip.status_r();
    assert_eq!(first, second);
    assert_ne!(first & StatusFlags::OVERRUN_ERROR.bits(), 0);
    assert_eq!(bench.chip.read(CONTROL_PORT), first);
}

#[test]
fn overrun_keeps_unread_character() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_RXE);
    bench.receive_bits(&async_frame(0x41, 8, None, 1), 1);
    bench.receive_bits(&async_frame(0x42, 8, None, 1), 1);

    let status = bench.status();
    assert!(status.contains(StatusFlags::RX_READY | StatusFlags::OVERRUN_ERROR));
    assert_eq!(bench.chip.data_r(), 0x41);
}

#[test]
fn error_reset_clears_only_error_bits() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_RXE);
    bench.receive_bits(&async_frame(0x41, 8, None, 1), 1);
    bench.receive_bits(&async_frame(0x42, 8, None, 1), 1);

    bench.chip.control_w(CMD_RXE | CMD_ER);
    let status = bench.status();
    assert!(!status.intersects(StatusFlags::ERRORS));
    assert!(status.contains(StatusFlags::RX_READY));
    // ER is an action, not a retained command bit.
    assert_eq!(bench.chip.registers().command().bits(), CMD_RXE);
}

#[test]
fn bus_read_of_data_port_acknowledges() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_RXE);
    bench.receive_bits(&async_frame(0x7E, 8, None, 1), 1);

    assert_eq!(bench.chip.read(DATA_PORT), 0x7E);
    assert!(!bench.status().contains(StatusFlags::RX_READY));
    assert_eq!(bench.rxrdy.history(), vec![true, false]);

    // Next character is accepted without an overrun.
    bench.receive_bits(&async_frame(0x7F, 8, None, 1), 1);
    assert_eq!(bench.chip.read(DATA_PORT), 0x7F);
    assert!(!bench.status().intersects(StatusFlags::ERRORS));
}

#[test]
fn parity_error_is_latched() {
    let mut bench = Bench::new();
    bench.program_async(MODE_7E1_X1, CMD_RXE);
    // 0x41 has even parity 0; send 1.
    bench.receive_bits(&async_frame(0x41, 7, Some(true), 1), 1);

    let status = bench.status();
    assert!(status.contains(StatusFlags::RX_READY | StatusFlags::PARITY_ERROR));
    assert_eq!(bench.chip.data_r(), 0x41);
}

#[test]
fn framing_error_waits_for_marking() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_RXE);
    let mut broken = async_frame(0x55, 8, None, 0);
    broken.extend([false, false, false]);
    bench.receive_bits(&broken, 1);

    assert!(bench.status().contains(StatusFlags::FRAMING_ERROR));
    assert_eq!(bench.chip.read(DATA_PORT), 0x55);

    // The low line after the bad stop bit is not taken as a start bit.
    assert!(!bench.status().contains(StatusFlags::RX_READY));
    bench.receive_bits(&[true, true], 1);
    bench.receive_bits(&async_frame(0x2A, 8, None, 1), 1);
    assert_eq!(bench.chip.read(DATA_PORT), 0x2A);
}

#[test]
fn x16_receiver_samples_bit_centres() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X16, CMD_TXEN | CMD_RXE);
    bench.chip.data_w(0xC3);
    bench.transmit_ticks(160);

    // Replay the recorded line at the same clock.
    let line = bench.txd.history();
    bench.receive_bits(&line, 16);
    assert_eq!(bench.chip.read(DATA_PORT), 0xC3);
    assert!(!bench.status().intersects(StatusFlags::ERRORS));
}

#[test]
fn x16_receiver_rejects_glitch() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X16, CMD_RXE);

    bench.chip.write_rxd(false);
    for _ in 0..4 {
        bench.chip.receive_clock();
    }
    bench.chip.write_rxd(true);
    for _ in 0..32 {
        bench.chip.receive_clock();
    }
    assert!(bench.rxrdy.is_empty());

    bench.receive_bits(&async_frame(0x11, 8, None, 1), 16);
    assert_eq!(bench.chip.read(DATA_PORT), 0x11);
}

#[test]
fn receiver_disabled_ignores_line() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN);
    bench.receive_bits(&async_frame(0x41, 8, None, 1), 1);
    assert!(!bench.status().contains(StatusFlags::RX_READY));
}

#[test]
fn internal_reset_mid_receive() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_RXE);
    bench.receive_bits(&async_frame(0x41, 8, None, 1), 1);
    bench.receive_bits(&async_frame(0x42, 8, None, 1), 1);
    bench.receive_bits(&[false, true, false], 1);

    bench.chip.control_w(CMD_IR);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectMode);
    assert_eq!(bench.chip.status_r(), StatusFlags::TX_EMPTY.bits());
    assert_eq!(bench.rxrdy.last(), Some(false));
    assert_eq!(bench.rts.last(), Some(true));

    // The half-received character is gone.
    bench.program(&[MODE_8N1_X1, CMD_RXE]);
    bench.receive_bits(&[true], 1);
    bench.receive_bits(&async_frame(0x43, 8, None, 1), 1);
    assert_eq!(bench.chip.read(DATA_PORT), 0x43);
    assert!(!bench.status().intersects(StatusFlags::ERRORS));
}

#[test]
fn modem_outputs_are_active_low() {
    let mut bench = Bench::new();
    bench.program(&[MODE_8N1_X1, CMD_DTR | CMD_RTS]);
    assert_eq!(bench.dtr.last(), Some(false));
    assert_eq!(bench.rts.last(), Some(false));

    bench.chip.control_w(CMD_RTS);
    assert_eq!(bench.dtr.last(), Some(true));
    assert_eq!(bench.rts.last(), Some(false));
}

#[test]
fn dsr_input_reported_in_status() {
    let mut bench = Bench::new();
    assert!(!bench.status().contains(StatusFlags::DSR));
    bench.chip.write_dsr(false);
    assert!(bench.status().contains(StatusFlags::DSR));
    bench.chip.write_dsr(true);
    assert!(!bench.status().contains(StatusFlags::DSR));
}

#[test]
fn send_break_holds_txd_low() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN);
    bench.chip.control_w(CMD_TXEN | CMD_SBRK);
    assert_eq!(bench.txd.last(), Some(false));
    bench.chip.control_w(CMD_TXEN);
    assert_eq!(bench.txd.last(), Some(true));
}

#[test]
fn clock_pins_use_opposite_edges() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN | CMD_RXE);
    bench.chip.data_w(0x41);

    bench.chip.write_txc(true);
    assert!(bench.txd.is_empty());
    bench.chip.write_txc(false);
    assert_eq!(bench.txd.history(), vec![false]);
    // Repeated levels are not edges.
    bench.chip.write_txc(false);
    assert_eq!(bench.txd.len(), 1);

    for &bit in &async_frame(0x24, 8, None, 1) {
        bench.chip.write_rxd(bit);
        bench.chip.write_rxc(true);
        bench.chip.write_rxc(false);
    }
    assert_eq!(bench.chip.read(DATA_PORT), 0x24);
}

#[test]
fn sync_transmit_fills_underrun_with_sync() {
    let mut bench = Bench::new();
    bench.program(&[MODE_SYNC_SINGLE, 0x16, CMD_TXEN]);
    bench.chip.write_cts(false);
    bench.clear_probes();

    bench.chip.data_w(0xA5);
    bench.transmit_ticks(8);
    assert!(bench.chip.tx_empty());
    bench.transmit_ticks(8);

    let mut expected = bits_of(0xA5, 8);
    expected.extend(bits_of(0x16, 8));
    assert_eq!(bench.txd.history(), expected);
    assert!(bench.chip.tx_empty());
}

#[test]
fn sync_hunt_single_character() {
    let mut bench = Bench::new();
    bench.program(&[MODE_SYNC_SINGLE, 0x16, CMD_RXE | CMD_EH]);
    assert!(bench.chip.is_hunting());
    bench.clear_probes();

    bench.receive_bits(&[true, true, true], 1);
    let sync = bits_of(0x16, 8);
    bench.receive_bits(&sync[..7], 1);
    assert!(bench.chip.is_hunting());
    bench.receive_bits(&sync[7..], 1);
    assert!(!bench.chip.is_hunting());
    assert_eq!(bench.syndet.history(), vec![true]);

    bench.receive_bits(&bits_of(0x41, 8), 1);
    assert_eq!(bench.chip.data_r(), 0x41);

    // SYNDET survives status reads.
    let status = bench.status();
    assert!(status.contains(StatusFlags::SYNDET | StatusFlags::RX_READY));
    assert!(bench.status().contains(StatusFlags::SYNDET));
    assert_eq!(bench.syndet.count(true), 1);
}

#[test]
fn sync_hunt_needs_both_characters() {
    let mut bench = Bench::new();
    bench.program(&[MODE_SYNC_DOUBLE, 0x16, 0x96, CMD_RXE | CMD_EH]);
    bench.clear_probes();

    bench.receive_bits(&[true, true, true, true], 1);
    bench.receive_bits(&bits_of(0x16, 8), 1);
    assert!(bench.chip.is_hunting());
    bench.receive_bits(&bits_of(0x96, 8), 1);
    assert!(!bench.chip.is_hunting());
    assert!(bench.status().contains(StatusFlags::SYNDET));

    // Entering hunt again drops SYNDET.
    bench.chip.control_w(CMD_RXE | CMD_EH);
    assert!(bench.chip.is_hunting());
    assert!(!bench.status().contains(StatusFlags::SYNDET));
    assert_eq!(bench.syndet.history(), vec![true, false]);
}

#[test]
fn external_sync_detect() {
    let mut bench = Bench::new();
    bench.program(&[MODE_SYNC_EXTERNAL, 0x16, CMD_RXE | CMD_EH]);
    bench.clear_probes();

    // The internal matcher is off: the sync pattern alone does nothing.
    bench.receive_bits(&bits_of(0x16, 8), 1);
    assert!(bench.chip.is_hunting());

    bench.chip.write_syn(true);
    assert!(!bench.chip.is_hunting());
    assert!(bench.status().contains(StatusFlags::SYNDET));
    assert!(bench.syndet.is_empty());

    bench.receive_bits(&bits_of(0x41, 8), 1);
    assert_eq!(bench.chip.data_r(), 0x41);
}

#[test]
fn scu_interrupt_mask_register() {
    let mut bench = Bench::with_chip(I8251::new_v5x_scu());
    assert_eq!(bench.chip.read(INTERRUPT_MASK_PORT), INTERRUPT_MASK_RESET);
    bench.chip.write(INTERRUPT_MASK_PORT, 0x01);
    assert_eq!(bench.chip.interrupt_mask(), Some(0x01));
    assert_eq!(bench.chip.read(INTERRUPT_MASK_PORT), 0x01);
    assert_eq!(bench.chip.read(2), 0);

    // The two low offsets still behave like the 8251.
    bench.chip.write(CONTROL_PORT, MODE_8N1_X1);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectCommand);
    assert_eq!(bench.chip.read(CONTROL_PORT), bench.chip.status_r());

    bench.chip.reset();
    assert_eq!(bench.chip.interrupt_mask(), Some(INTERRUPT_MASK_RESET));
}

#[test]
fn plain_chip_has_no_interrupt_mask() {
    let mut bench = Bench::new();
    assert!(!bench.chip.has_interrupt_mask());
    bench.chip.set_interrupt_mask(0x01);
    assert_eq!(bench.chip.interrupt_mask(), None);

    // Only A0 is decoded.
    assert_eq!(bench.chip.read(INTERRUPT_MASK_PORT), bench.chip.status_r());
    bench.chip.write(2, 0x42);
    assert_eq!(bench.chip.registers().tx_holding(), Some(0x42));
}

#[test]
fn internal_reset_still_drives_modem_outputs() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN);
    bench.chip.control_w(CMD_TXEN | CMD_SBRK);
    assert_eq!(bench.txd.last(), Some(false));

    bench.chip.control_w(CMD_IR | CMD_RTS | CMD_DTR);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectMode);
    assert_eq!(bench.rts.last(), Some(false));
    assert_eq!(bench.dtr.last(), Some(false));
    // Break is released along with the rest of the command register.
    assert_eq!(bench.txd.last(), Some(true));
    assert_eq!(bench.chip.status_r(), StatusFlags::TX_EMPTY.bits());
    assert_eq!(bench.chip.registers().command().bits(), 0);
}

#[test]
fn scu_internal_reset_keeps_interrupt_mask() {
    let mut bench = Bench::with_chip(I8251::new_v5x_scu());
    bench.chip.write(INTERRUPT_MASK_PORT, 0x00);
    bench.chip.write(CONTROL_PORT, MODE_8N1_X1);
    bench.chip.write(CONTROL_PORT, CMD_IR);
    assert_eq!(bench.chip.sequencer(), WriteSequencer::ExpectMode);
    assert_eq!(bench.chip.interrupt_mask(), Some(0x00));

    bench.chip.reset();
    assert_eq!(bench.chip.interrupt_mask(), Some(INTERRUPT_MASK_RESET));
}

#[test]
fn enabling_transmitter_starts_pending_character() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_RXE);
    bench.chip.data_w(0x41);
    bench.transmit_ticks(5);
    assert!(bench.txd.is_empty());
    assert_eq!(bench.chip.registers().tx_holding(), Some(0x41));

    // The holding register moves into the shifter as soon as TxEN is set.
    bench.chip.control_w(CMD_RXE | CMD_TXEN);
    assert_eq!(bench.chip.registers().tx_holding(), None);
    assert!(bench.chip.txrdy_r());
    assert!(!bench.chip.tx_empty());

    bench.transmit_ticks(10);
    assert_eq!(bench.txd.history(), async_frame(0x41, 8, None, 1));
    assert!(bench.chip.tx_empty());
}

#[test]
fn disabling_transmitter_finishes_current_character() {
    let mut bench = Bench::new();
    bench.program_async(MODE_8N1_X1, CMD_TXEN);
    bench.chip.data_w(0x41);
    bench.transmit_ticks(1);
    bench.chip.data_w(0x42);
    bench.transmit_ticks(3);

    bench.chip.control_w(CMD_RXE);
    assert!(!bench.chip.txrdy_r());
    bench.transmit_ticks(20);
    assert_eq!(bench.txd.history(), async_frame(0x41, 8, None, 1));
    assert_eq!(bench.chip.registers().tx_holding(), Some(0x42));

    bench.chip.control_w(CMD_TXEN);
    bench.transmit_ticks(10);
    let mut expected = async_frame(0x41, 8, None, 1);
    expected.extend(async_frame(0x42, 8, None, 1));
    assert_eq!(bench.txd.history(), expected);
}

#[test]
fn overrun_character_latches_no_line_errors() {
    let mut bench = Bench::new();
    bench.program_async(MODE_7E1_X1, CMD_RXE);
    bench.receive_bits(&async_frame(0x41, 7, Some(false), 1), 1);
    // Bad parity on a character that is dropped anyway.
    bench.receive_bits(&async_frame(0x42, 7, Some(true), 1), 1);
    // Low stop bit on another dropped character.
    let mut broken = async_frame(0x43, 7, Some(true), 0);
    broken.extend([false, true]);
    bench.receive_bits(&broken, 1);

    let status = bench.status();
    assert!(status.contains(StatusFlags::RX_READY | StatusFlags::OVERRUN_ERROR));
    assert!(!status.intersects(StatusFlags::PARITY_ERROR | StatusFlags::FRAMING_ERROR));
    assert_eq!(bench.chip.data_r(), 0x41);
}

/// Transmit two characters back to back and return the tick on which the
/// second start bit goes out.
fn second_start_tick(mode: u8) -> usize {
    let mut bench = Bench::new();
    bench.program_async(mode, CMD_TXEN);
    bench.chip.data_w(0x00);
    bench.transmit_ticks(1);
    bench.chip.data_w(0x00);
    let mut ticks = 1;
    while bench.txd.len() < 11 {
        bench.transmit_ticks(1);
        ticks += 1;
        assert!(ticks < 1000, "second character never started");
    }
    assert_eq!(bench.txd.last(), Some(false));
    ticks
}

#[test]
fn stop_bit_lengths_on_the_line() {
    // Stop bit goes out on tick 145 at x16 (after start and eight data bits).
    assert_eq!(second_start_tick(0x4E) - 145, 16);
    assert_eq!(second_start_tick(0x8E) - 145, 24);
    assert_eq!(second_start_tick(0xCE) - 145, 32);

    // At x1 one and a half stop bits take two whole bit times.
    assert_eq!(second_start_tick(0x4D), 11);
    assert_eq!(second_start_tick(0x8D), 12);
    assert_eq!(second_start_tick(0xCD), 12);
}
