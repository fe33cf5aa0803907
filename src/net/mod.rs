//! Backend communication: wire types, error normalization, the transport
//! seam, the authenticated REST client, and typed endpoint wrappers.

pub mod api;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;
