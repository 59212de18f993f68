use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use retroserial_i8251::ModeConfig;

/// Named line configurations the link harness knows how to program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Async ×1, 8 data bits, no parity, 1 stop bit.
    #[default]
    Async8N1,
    /// Async ×1, 7 data bits, even parity, 1 stop bit.
    Async7E1,
    /// Async ×16, 8 data bits, odd parity, 2 stop bits.
    Async8O2X16,
    /// Async ×64, 5 data bits, no parity, 1.5 stop bits.
    Async5N15X64,
    /// Sync, 8 data bits, one SYN character.
    Sync1,
    /// Sync, 8 data bits, two SYN characters.
    Sync2,
}

const SYN: u8 = 0x16;

impl Profile {
    pub const ALL: [Profile; 6] = [
        Profile::Async8N1,
        Profile::Async7E1,
        Profile::Async8O2X16,
        Profile::Async5N15X64,
        Profile::Sync1,
        Profile::Sync2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Async8N1 => "8n1",
            Profile::Async7E1 => "7e1",
            Profile::Async8O2X16 => "8o2x16",
            Profile::Async5N15X64 => "5n15x64",
            Profile::Sync1 => "sync1",
            Profile::Sync2 => "sync2",
        }
    }

    pub fn mode_byte(self) -> u8 {
        match self {
            Profile::Async8N1 => 0x4D,
            Profile::Async7E1 => 0x79,
            Profile::Async8O2X16 => 0xDE,
            Profile::Async5N15X64 => 0x83,
            Profile::Sync1 => 0x8C,
            Profile::Sync2 => 0x0C,
        }
    }

    /// Sync characters written after the mode byte, and sent ahead of the
    /// payload so the receiver can find character alignment.
    pub fn sync_bytes(self) -> &'static [u8] {
        match self {
            Profile::Sync1 => &[SYN],
            Profile::Sync2 => &[SYN, SYN],
            _ => &[],
        }
    }

    pub fn mode(self) -> ModeConfig {
        ModeConfig::decode(self.mode_byte())
    }

    /// Keep only the bits a character of this profile carries.
    pub fn mask(self, byte: u8) -> u8 {
        byte & (u8::MAX >> (8 - self.mode().character_length))
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match Profile::ALL.iter().find(|profile| profile.name() == lower) {
            Some(&profile) => Ok(profile),
            None => {
                let names: Vec<_> = Profile::ALL.iter().map(|p| p.name()).collect();
                bail!("Unknown profile '{}'. Supported: {}", s, names.join(", "))
            }
        }
    }
}
