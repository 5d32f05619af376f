//! Input - raw terminal bytes to routed events.
//!
//! - [`reader`] - stdin thread feeding a bounded byte queue
//! - [`decoder`] - byte state machine with escape timeout
//! - [`router`] - focus, hit-testing and delivery to components

pub mod decoder;
pub mod event;
pub mod reader;
pub mod router;

pub use decoder::{Decoder, DEFAULT_ESCAPE_TIMEOUT};
pub use event::{
    Event, EventKind, Key, KeyPress, Modifiers, MouseButton, MouseButtons, MouseEvent, MouseKind,
};
pub use reader::{InputMessage, StdinReader};
pub use router::{Dispatch, InputRouter};
