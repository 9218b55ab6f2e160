//! The static channel graph parsed from gossip.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::channel::{Channel, ChannelRef, NodeId, ShortChannelId};
use crate::gossip;

/// The public channel graph: a directed multigraph whose edges are keyed by
/// `(source, destination, short_channel_id)`, allowing parallel channels
/// between the same ordered node pair.
///
/// Only announced, active channels enter the graph; everything else the
/// liquidity-dependent layers need is derived from it. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct ChannelGraph {
    channels: BTreeMap<ChannelRef, Channel>,
}

impl ChannelGraph {
    /// Build a graph from parsed channel records, dropping inactive and
    /// unannounced channels.
    pub fn from_channels(
        channels: impl IntoIterator<Item = Channel>,
    ) -> Self {
        let mut kept = BTreeMap::new();
        let mut dropped = 0usize;
        for channel in channels {
            if !channel.active || !channel.announced {
                dropped += 1;
                continue;
            }
            kept.insert(channel.reference(), channel);
        }
        if dropped > 0 {
            debug!("Dropped {dropped} inactive or unannounced channels");
        }
        Self { channels: kept }
    }

    /// Build a graph from a CLN `listchannels` JSON dump.
    pub fn from_cln_json(json: &str) -> anyhow::Result<Self> {
        Ok(Self::from_channels(gossip::from_cln_json(json)?))
    }

    /// Build a graph from an LND `describegraph` JSON dump.
    pub fn from_lnd_json(json: &str) -> anyhow::Result<Self> {
        Ok(Self::from_channels(gossip::from_lnd_json(json)?))
    }

    pub fn get(&self, chan_ref: &ChannelRef) -> Option<&Channel> {
        self.channels.get(chan_ref)
    }

    /// Look up a channel by its individual key parts.
    pub fn get_channel(
        &self,
        src: &NodeId,
        dst: &NodeId,
        scid: ShortChannelId,
    ) -> Option<&Channel> {
        self.get(&ChannelRef {
            src: src.clone(),
            dst: dst.clone(),
            scid,
        })
    }

    /// The channel in the opposite direction, if announced.
    pub fn reverse(&self, chan_ref: &ChannelRef) -> Option<&Channel> {
        self.get(&chan_ref.reversed())
    }

    /// Iterate all channels in deterministic key order.
    pub fn channels(&self) -> impl Iterator<Item = (&ChannelRef, &Channel)> {
        self.channels.iter()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// All node ids appearing as a channel endpoint, in sorted order.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.channels
            .keys()
            .flat_map(|chan_ref| {
                [chan_ref.src.clone(), chan_ref.dst.clone()]
            })
            .collect()
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.channels
            .keys()
            .any(|chan_ref| &chan_ref.src == node || &chan_ref.dst == node)
    }
}
