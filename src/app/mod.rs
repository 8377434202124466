//! Application core — pure domain logic, zero I/O.
//!
//! The event loop ([`service::Node`]), the outbound message model and its
//! JSON encoding.  All interaction with hardware and the network happens
//! through the **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod events;
pub mod payload;
pub mod ports;
pub mod service;
