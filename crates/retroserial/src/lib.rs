mod link;
mod profile;

pub use link::{run, LinkConfig, LinkReport};
pub use profile::Profile;
