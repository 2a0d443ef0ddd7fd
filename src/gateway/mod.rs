//! Data-acquisition gateway boundary.
//!
//! The rig's sensors are read by a Node-RED style gateway that exposes a
//! live-data endpoint and a command write endpoint over HTTP. This module
//! owns both directions of that boundary: [`client::GatewayClient`] performs
//! the requests, [`normalize`] collapses the gateway's loosely-shaped live
//! payloads into a fixed [`normalize::Reading`].

pub mod client;
pub mod normalize;

pub use client::{GatewayClient, GatewayError};
pub use normalize::Reading;
