//! Channel adapter management for Ferrobot.
//!
//! Concrete adapters (Telegram, WhatsApp, ...) live behind the
//! [`ferrobot_core::Channel`] trait; this crate holds the registry that
//! starts and stops them and wires their delivery into the message bus.

pub mod local;
pub mod registry;

pub use local::LocalChannel;
pub use registry::ChannelRegistry;
