use crate::registers::Parity;

/// Mask selecting the low `bits` bits of a character.
#[inline]
pub(crate) fn word_mask(bits: u8) -> u8 {
    if bits >= 8 {
        0xFF
    } else {
        (1u8 << bits) - 1
    }
}

/// Parity bit for the low `bit_width` bits of `data`.
///
/// The returned bit makes the total number of ones (data + parity) even for
/// [`Parity::Even`] and odd for [`Parity::Odd`]. `None` means no parity bit is
/// sent or expected. Framing bits never take part in the count.
pub fn compute_parity(data: u8, bit_width: u8, mode: Parity) -> Option<bool> {
    let odd_ones = (data & word_mask(bit_width)).count_ones() % 2 == 1;
    match mode {
        Parity::None => None,
        Parity::Even => Some(odd_ones),
        Parity::Odd => Some(!odd_ones),
    }
}

/// Whether a received parity bit is consistent with `data`. Always true
/// when parity is disabled.
pub fn check_parity(data: u8, bit_width: u8, mode: Parity, received: bool) -> bool {
    compute_parity(data, bit_width, mode).map_or(true, |expected| expected == received)
}
