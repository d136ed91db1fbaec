//! Realtime Updates
//!
//! Persistent push connection to the fleet server.
//!
//! - **channel**: `RealtimeChannel` connect / subscribe / disconnect
//! - **listeners**: ordered callback registry
//! - **messages**: `{"event", "data"}` frame types
//!
//! ```text
//! client → {"event":"subscribeBike","data":"BIKE123"}
//! server → {"event":"status","data":{"helmetState":"worn",...}}
//! server → {"event":"alert","data":{"type":"alcoholAttempt",...}}
//! ```

mod channel;
mod listeners;
mod messages;

pub use channel::{ConnectionState, RealtimeChannel, RealtimeError};
pub use listeners::ListenerRegistry;
pub use messages::{
    AlcoholState, AlertEvent, ClientEvent, FrameError, HelmetState, ServerEvent, StatusEvent,
};
