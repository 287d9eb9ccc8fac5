//! League domain: players, events, and the invitations between them.

pub mod model;

pub use model::{
    Category, DashboardCounts, DeliveryStatus, Event, Invitation, Language, NewEvent,
    NewOutboundMessage, NewPlayer, OutboundMessage, Player, ResponseLog, ResponseStats,
    ResponseStatus,
};
