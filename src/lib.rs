//! League RSVP — WhatsApp invitation replies for an amateur sports league.

pub mod channels;
pub mod config;
pub mod error;
pub mod league;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod templates;
