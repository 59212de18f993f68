pub mod line;
pub mod probe;

pub use line::{LineHandler, OutputLine};
pub use probe::{LineProbe, Wire};
