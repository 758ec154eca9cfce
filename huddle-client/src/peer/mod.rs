mod link;
mod manager;

pub use link::{LinkInfo, LinkRole, LinkState};
pub use manager::*;
