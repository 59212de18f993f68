use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Records every level a handler receives.
///
/// Clones share the same history, so a probe can hand out a handler to a
/// chip and still be inspected afterwards.
#[derive(Clone, Debug, Default)]
pub struct LineProbe {
    history: Rc<RefCell<Vec<bool>>>,
}

impl LineProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> impl FnMut(bool) + 'static {
        let history = Rc::clone(&self.history);
        move |level| history.borrow_mut().push(level)
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    pub fn last(&self) -> Option<bool> {
        self.history.borrow().last().copied()
    }

    /// Number of times `level` was driven.
    pub fn count(&self, level: bool) -> usize {
        self.history.borrow().iter().filter(|&&l| l == level).count()
    }

    pub fn len(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.history.borrow_mut().clear();
    }
}

/// A single-bit net shared between a driver and any number of readers.
///
/// Used to connect the output pin of one chip to the input pin of another:
/// the driver side is bound as an output handler and the reader polls the
/// current level before delivering it to the receiving chip.
#[derive(Clone, Debug)]
pub struct Wire {
    level: Rc<Cell<bool>>,
}

impl Wire {
    pub fn new(level: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.level.get()
    }

    #[inline]
    pub fn set(&self, level: bool) {
        self.level.set(level);
    }

    pub fn driver(&self) -> impl FnMut(bool) + 'static {
        let level = Rc::clone(&self.level);
        move |l| level.set(l)
    }
}
