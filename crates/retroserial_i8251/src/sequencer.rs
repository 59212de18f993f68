use crate::registers::{CommandFlags, ModeConfig};

/// Meaning of the next byte written to the control port.
///
/// After reset the 8251 expects a mode word. A synchronous mode word is
/// followed by one or two sync characters; everything after that is a
/// command word until a command sets IR, which returns the chip to mode
/// programming.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum WriteSequencer {
    ExpectCommand,
    #[default]
    ExpectMode,
    ExpectSync1,
    ExpectSync2,
}

impl WriteSequencer {
    pub fn after_mode(mode: &ModeConfig) -> Self {
        if mode.is_sync() {
            WriteSequencer::ExpectSync1
        } else {
            WriteSequencer::ExpectCommand
        }
    }

    pub fn after_sync1(mode: &ModeConfig) -> Self {
        if mode.sync_byte_count == 2 {
            WriteSequencer::ExpectSync2
        } else {
            WriteSequencer::ExpectCommand
        }
    }

    pub fn after_sync2() -> Self {
        WriteSequencer::ExpectCommand
    }

    pub fn after_command(command: CommandFlags) -> Self {
        if command.contains(CommandFlags::INTERNAL_RESET) {
            WriteSequencer::ExpectMode
        } else {
            WriteSequencer::ExpectCommand
        }
    }
}
