//! Error type for ember-tui.

use std::io;

use thiserror::Error;

use crate::tree::ComponentId;

pub type Result<T> = std::result::Result<T, TuiError>;

#[derive(Debug, Error)]
pub enum TuiError {
    /// Attaching `child` under `parent` would make a component its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle {
        child: ComponentId,
        parent: ComponentId,
    },

    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("the root component cannot be detached or removed")]
    RootImmovable,

    #[error("terminal I/O error: {0}")]
    Terminal(#[from] io::Error),

    #[error("failed to spawn {name} thread: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}
