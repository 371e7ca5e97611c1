//! Plumbing shared by both renderers: which surface is which, frame
//! scheduling, and exclusive access to a drawing region.

mod container;
mod frame;

use std::fmt;

pub use container::{Container, ContainerLease};
pub use frame::{Frame, FrameHandle, FrameScheduler};

/// One of the two render surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Globe,
    Map,
}

impl Surface {
    pub fn other(self) -> Self {
        match self {
            Surface::Globe => Surface::Map,
            Surface::Map => Surface::Globe,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Surface::Globe => "globe",
            Surface::Map => "map",
        })
    }
}
