//! Reconstructs application-layer bundles from raw captured network
//! traffic: TCP stream reassembly, bundle re-framing, and optional
//! decompression.

#[cfg(feature = "capture")]
pub mod capture;
pub mod reassembler;
pub mod reframer;
pub mod segment;

pub use reassembler::{ConnectionKey, Emission, Reassembler};
pub use reframer::{Framed, Reframer};
pub use segment::{parse_ipv4_tcp, Endpoint, TcpSegment};
