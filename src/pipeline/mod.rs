//! RSVP message pipeline.
//!
//! Inbound replies flow through:
//! 1. `RsvpIntake::handle()` — sender lookup by phone number
//! 2. `classify()` — fixed-vocabulary reply matching
//! 3. `apply_response()` — transactional invitation update + audit row
//! 4. `ConfirmationDispatcher::dispatch()` — localized acknowledgment, always live
//!
//! Outbound staff messages go through `Outreach`, which honours the test flag.

pub mod classifier;
pub mod confirm;
pub mod intake;
pub mod outreach;
pub mod updater;

pub use classifier::classify;
pub use confirm::ConfirmationDispatcher;
pub use intake::{InboundReply, IntakeOutcome, RsvpIntake};
pub use outreach::{Outreach, OutreachReport};
pub use updater::apply_response;
