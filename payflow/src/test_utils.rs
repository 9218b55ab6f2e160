//! Shared fixtures for unit tests.

use crate::channel::{Channel, ChannelRef, NodeId, ShortChannelId};
use crate::graph::ChannelGraph;

/// A short channel id with the test's small integer in the block part.
pub fn scid(n: u32) -> ShortChannelId {
    ShortChannelId::new(n, 0, 0).expect("test scids are small")
}

/// A zero-fee, active, announced channel.
pub fn channel(
    src: &str,
    dst: &str,
    scid_n: u32,
    capacity_sat: u64,
) -> Channel {
    channel_with_fees(src, dst, scid_n, capacity_sat, 0, 0)
}

/// An active, announced channel with the given fee schedule.
pub fn channel_with_fees(
    src: &str,
    dst: &str,
    scid_n: u32,
    capacity_sat: u64,
    fee_ppm: u64,
    base_fee_msat: u64,
) -> Channel {
    Channel {
        src: NodeId::from(src),
        dst: NodeId::from(dst),
        scid: scid(scid_n),
        capacity_sat,
        base_fee_msat,
        fee_ppm,
        htlc_minimum_msat: 0,
        htlc_maximum_msat: None,
        cltv_delta: 40,
        active: true,
        announced: true,
        features: String::new(),
    }
}

/// Shorthand for the key of a test channel.
pub fn chan_ref(src: &str, dst: &str, scid_n: u32) -> ChannelRef {
    ChannelRef::new(src, dst, scid(scid_n))
}

/// A graph with one channel per spec tuple `(src, dst, scid, cap, ppm)`.
pub fn graph_of(specs: &[(&str, &str, u32, u64, u64)]) -> ChannelGraph {
    ChannelGraph::from_channels(specs.iter().map(
        |&(src, dst, scid_n, cap, ppm)| {
            channel_with_fees(src, dst, scid_n, cap, ppm, 0)
        },
    ))
}
