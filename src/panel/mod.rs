//! # Panel I/O
//!
//! Everything that touches the wire. `channel` is the byte-transport
//! seam (a trait plus the serial-port implementation); `protocol` speaks
//! the panel's line-based command language over it. The rest of the crate
//! only ever talks to [`PanelLink`].

pub mod channel;
pub mod protocol;

pub use channel::{ChannelError, LineChannel, SerialChannel};
pub use protocol::PanelLink;
