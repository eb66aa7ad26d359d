//! Vantage real-time collaboration fan-out.
//!
//! - [`RoomHub`]: per-project rooms of connections; broadcast is a
//!   best-effort fan-out over bounded per-member queues.
//! - [`CollabSession`]: the per-connection protocol state machine
//!   (join / camera / annotation focus / disconnect).

pub mod rooms;
pub mod session;

pub use rooms::{member_channel, ConnId, EventReceiver, EventSender, RoomHub};
pub use session::CollabSession;
