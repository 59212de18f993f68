use std::fmt;

/// Host-side observer for a single output pin.
pub type LineHandler = Box<dyn FnMut(bool)>;

/// An output pin of an emulated chip.
///
/// The chip drives the pin with a logic level and the host observes it
/// through an injected handler. Pins without a bound handler still track
/// their level, so a chip can be exercised without any wiring at all.
///
/// Two driving styles are supported:
/// - `write` always forwards the level to the handler (used for pins the
///   hardware re-drives on every evaluation, such as DTR/RTS or TxD).
/// - `update` forwards only when the level differs from the last one
///   driven (used for the status pins RxRDY/TxRDY/TxEMPTY).
pub struct OutputLine {
    name: &'static str,
    handler: Option<LineHandler>,
    level: Option<bool>,
}

impl OutputLine {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            handler: None,
            level: None,
        }
    }

    pub fn bind(&mut self, handler: impl FnMut(bool) + 'static) {
        self.handler = Some(Box::new(handler));
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last level driven onto the pin, `None` before the first drive.
    #[inline]
    pub fn level(&self) -> Option<bool> {
        self.level
    }

    pub fn write(&mut self, level: bool) {
        self.level = Some(level);
        log::trace!("{}: {}", self.name, level as u8);
        if let Some(handler) = self.handler.as_mut() {
            handler(level);
        }
    }

    pub fn update(&mut self, level: bool) {
        if self.level != Some(level) {
            self.write(level);
        }
    }

    /// Forget the last driven level so that the next `update` is always
    /// forwarded. Chips call this on reset.
    pub fn invalidate(&mut self) {
        self.level = None;
    }
}

impl fmt::Debug for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputLine")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .field("level", &self.level)
            .finish()
    }
}
