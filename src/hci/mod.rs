//! HCI transport demultiplexing
//!
//! [`demux`] classifies each capture payload by its transport type byte and
//! opens single-fragment ACL frames far enough to route them by channel
//! identifier. [`names`] maps common commands, events and channels to
//! readable names for reports.

pub mod demux;
pub mod names;

pub use demux::{
    ATT_CID, AclHeader, ChannelFrame, CommandHeader, EventHeader, Routed, TransportFrame,
    TransportType, demux,
};
