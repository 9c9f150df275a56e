//! # Panel Core
//!
//! Everything between the bus and the window:
//!
//! - [`color`]: the colors the device can show and the indicator state
//! - [`compose`]: validation and publishing of the device configuration
//! - [`session`]: the session task that owns the connection and the view
//!
//! The UI never touches the connection directly. It reads [`session::PanelView`]
//! snapshots and sends [`session::SessionEvent`]s.

pub mod color;
pub mod compose;
pub mod session;
