use anyhow::{bail, Result};
use typed_builder::TypedBuilder;

use retroserial_common::Wire;
use retroserial_i8251::{CommandFlags, StatusFlags, CONTROL_PORT, DATA_PORT, I8251};

use crate::Profile;

#[derive(Debug, Clone, TypedBuilder)]
pub struct LinkConfig {
    #[builder(default)]
    pub profile: Profile,
    pub payload: Vec<u8>,
    /// Gate the sender's CTS with the receiver's RTS. The receiving host
    /// drops RTS while it holds an unread character.
    #[builder(default)]
    pub flow_control: bool,
    /// Clock ticks the receiving host waits between RxRDY and reading the
    /// data port.
    #[builder(default)]
    pub read_delay: u32,
    /// Give up after this many clock ticks. Derived from the profile and
    /// payload when not set.
    #[builder(default, setter(strip_option))]
    pub max_ticks: Option<u64>,
}

impl LinkConfig {
    fn tick_budget(&self) -> u64 {
        if let Some(ticks) = self.max_ticks {
            return ticks;
        }
        let characters = (self.payload.len() + self.profile.sync_bytes().len() + 2) as u64;
        let per_character = self.profile.mode().frame_ticks() as u64 + self.read_delay as u64;
        characters * per_character * 2 + 64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub profile: Profile,
    /// Payload as it goes on the wire, masked to the character length.
    pub sent: Vec<u8>,
    pub received: Vec<u8>,
    pub ticks: u64,
    /// Ticks the sender spent held off by CTS.
    pub held_ticks: u64,
    /// Receiver status after the last character was read.
    pub receiver_status: u8,
}

/// Two chips wired back to back: sender TxD drives receiver RxD and the
/// receiver's RTS drives the sender's CTS. One shared clock feeds the
/// sender's TxC and the receiver's RxC.
struct Link {
    sender: I8251,
    receiver: I8251,
    line: Wire,
    rts: Wire,
    rx_command: CommandFlags,
}

impl Link {
    fn new(config: &LinkConfig) -> Self {
        let line = Wire::new(true);
        let rts = Wire::new(true);
        let mut sender = I8251::new().with_txd_handler(line.driver());
        let mut receiver = I8251::new().with_rts_handler(rts.driver());
        sender.reset();
        receiver.reset();

        let profile = config.profile;
        for chip in [&mut sender, &mut receiver] {
            chip.write(CONTROL_PORT, profile.mode_byte());
            for &sync in profile.sync_bytes() {
                chip.write(CONTROL_PORT, sync);
            }
        }

        let tx_command = CommandFlags::TX_ENABLE | CommandFlags::DTR | CommandFlags::RTS;
        let rx_command = CommandFlags::RX_ENABLE | CommandFlags::DTR | CommandFlags::RTS;
        sender.write(CONTROL_PORT, tx_command.bits());
        let first = if profile.mode().is_sync() {
            rx_command | CommandFlags::ENTER_HUNT
        } else {
            rx_command
        };
        receiver.write(CONTROL_PORT, first.bits());

        // TxC idles high so the first clock is a falling edge.
        sender.write_txc(true);
        if !config.flow_control {
            sender.write_cts(false);
        }

        Self {
            sender,
            receiver,
            line,
            rts,
            rx_command,
        }
    }

    fn sender_status(&mut self) -> StatusFlags {
        StatusFlags::from_bits_retain(self.sender.read(CONTROL_PORT))
    }

    fn receiver_status(&mut self) -> StatusFlags {
        StatusFlags::from_bits_retain(self.receiver.read(CONTROL_PORT))
    }

    fn clock(&mut self) {
        self.sender.write_txc(false);
        self.receiver.write_rxd(self.line.get());
        self.receiver.write_rxc(true);
        self.sender.write_txc(true);
        self.receiver.write_rxc(false);
    }

    /// Raise or drop the receiver's RTS, keeping the rest of its command.
    fn set_receiver_rts(&mut self, asserted: bool) {
        let mut command = self.rx_command;
        command.set(CommandFlags::RTS, asserted);
        self.receiver.write(CONTROL_PORT, command.bits());
    }
}

/// Push `config.payload` from one chip to the other and collect what the
/// receiving host reads back.
pub fn run(config: &LinkConfig) -> Result<LinkReport> {
    let profile = config.profile;
    let sync = profile.mode().is_sync();
    if sync && config.flow_control {
        bail!("Flow control needs an asynchronous profile, got '{}'", profile);
    }

    let sent: Vec<u8> = config.payload.iter().map(|&b| profile.mask(b)).collect();
    // Sync links lead with the sync characters so the receiver can leave
    // hunt mode; they are not part of the received payload.
    let mut outgoing = profile.sync_bytes().iter().chain(sent.iter()).copied();
    let mut next = outgoing.next();

    let mut link = Link::new(config);
    let budget = config.tick_budget();
    log::info!(
        "Link: profile {} (mode 0x{:02X}), {} bytes, budget {} ticks",
        profile,
        profile.mode_byte(),
        sent.len(),
        budget
    );

    let mut received = Vec::with_capacity(sent.len());
    let mut pending_read: Option<u32> = None;
    let mut ticks = 0u64;
    let mut held_ticks = 0u64;

    while received.len() < sent.len() {
        if ticks >= budget {
            bail!(
                "Link stalled after {} ticks: {} of {} bytes received",
                ticks,
                received.len(),
                sent.len()
            );
        }
        ticks += 1;

        if config.flow_control {
            let rts = link.rts.get();
            link.sender.write_cts(rts);
            if rts {
                held_ticks += 1;
            }
        }

        if let Some(byte) = next {
            if link.sender_status().contains(StatusFlags::TX_READY) {
                link.sender.write(DATA_PORT, byte);
                next = outgoing.next();
            }
        }

        link.clock();

        if sync && link.receiver.is_hunting() {
            continue;
        }

        let status = link.receiver_status();
        if status.contains(StatusFlags::OVERRUN_ERROR) {
            bail!(
                "Receiver overrun after {} of {} bytes (status 0x{:02X})",
                received.len(),
                sent.len(),
                status.bits()
            );
        }
        if status.intersects(StatusFlags::PARITY_ERROR | StatusFlags::FRAMING_ERROR) {
            bail!(
                "Receiver reported a line error at byte {} (status 0x{:02X})",
                received.len(),
                status.bits()
            );
        }

        if pending_read.is_none() && status.contains(StatusFlags::RX_READY) {
            if config.flow_control {
                link.set_receiver_rts(false);
            }
            pending_read = Some(config.read_delay);
        }

        match pending_read {
            Some(0) => {
                let byte = link.receiver.read(DATA_PORT);
                log::debug!("Link: received 0x{:02X}", byte);
                received.push(byte);
                pending_read = None;
                if config.flow_control {
                    link.set_receiver_rts(true);
                }
            }
            Some(wait) => pending_read = Some(wait - 1),
            None => {}
        }
    }

    let receiver_status = link.receiver.status_r();
    if received != sent {
        bail!(
            "Payload mismatch: sent {:02X?}, received {:02X?}",
            sent,
            received
        );
    }
    log::info!(
        "Link: {} bytes in {} ticks ({} held by CTS)",
        received.len(),
        ticks,
        held_ticks
    );

    Ok(LinkReport {
        profile,
        sent,
        received,
        ticks,
        held_ticks,
        receiver_status,
    })
}
