//! JSON ingest of channel gossip snapshots.
//!
//! Two wire formats are recognized and mapped onto the canonical [`Channel`]
//! record:
//!
//! + CLN `lightning-cli listchannels` dumps: one entry per channel
//!   *direction*, already carrying the canonical field names.
//! + LND `lncli describegraph` dumps: one entry per channel with up to two
//!   per-direction policies, integers string-encoded, and the short channel
//!   id packed into a 64-bit `channel_id`.
//!
//! Malformed entries are rejected with context before any graph is built.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::channel::{Channel, NodeId, ShortChannelId};

/// Highest feature bit folded into the hex feature string when converting
/// LND node features. Higher bits are non-BOLT extensions.
const MAX_BOLT_FEATURE_BIT: u32 = 49;

// --- CLN `listchannels` --- //

#[derive(Deserialize)]
struct ClnListChannels {
    channels: Vec<ClnChannel>,
}

/// One direction of a channel in CLN gossip.
#[derive(Deserialize)]
struct ClnChannel {
    source: NodeId,
    destination: NodeId,
    short_channel_id: ShortChannelId,
    /// Capacity in sats.
    satoshis: u64,
    base_fee_millisatoshi: u64,
    fee_per_millionth: u64,
    #[serde(default)]
    htlc_minimum_msat: u64,
    #[serde(default)]
    htlc_maximum_msat: Option<u64>,
    delay: u32,
    active: bool,
    /// Whether the channel was announced in public gossip.
    public: bool,
    #[serde(default)]
    features: String,
}

impl From<ClnChannel> for Channel {
    fn from(c: ClnChannel) -> Self {
        Self {
            src: c.source,
            dst: c.destination,
            scid: c.short_channel_id,
            capacity_sat: c.satoshis,
            base_fee_msat: c.base_fee_millisatoshi,
            fee_ppm: c.fee_per_millionth,
            htlc_minimum_msat: c.htlc_minimum_msat,
            htlc_maximum_msat: c.htlc_maximum_msat,
            cltv_delta: c.delay,
            active: c.active,
            announced: c.public,
            features: c.features,
        }
    }
}

/// Parse a CLN `listchannels` JSON dump into channel records.
pub fn from_cln_json(json: &str) -> anyhow::Result<Vec<Channel>> {
    let dump: ClnListChannels = serde_json::from_str(json)
        .context("Could not deserialize CLN listchannels dump")?;

    let channels = dump
        .channels
        .into_iter()
        .map(Channel::from)
        .collect::<Vec<_>>();
    for channel in &channels {
        channel.validate().context("Malformed CLN gossip entry")?;
    }
    Ok(channels)
}

// --- LND `describegraph` --- //

#[derive(Deserialize)]
struct LndGraph {
    edges: Vec<LndEdge>,
    #[serde(default)]
    nodes: Vec<LndNode>,
}

#[derive(Deserialize)]
struct LndNode {
    pub_key: NodeId,
    #[serde(default)]
    features: BTreeMap<String, serde_json::Value>,
}

#[serde_as]
#[derive(Deserialize)]
struct LndEdge {
    #[serde_as(as = "DisplayFromStr")]
    channel_id: u64,
    #[serde_as(as = "DisplayFromStr")]
    capacity: u64,
    node1_pub: NodeId,
    node2_pub: NodeId,
    #[serde(default)]
    node1_policy: Option<LndPolicy>,
    #[serde(default)]
    node2_policy: Option<LndPolicy>,
}

#[serde_as]
#[derive(Deserialize)]
struct LndPolicy {
    time_lock_delta: u32,
    #[serde_as(as = "DisplayFromStr")]
    min_htlc: u64,
    #[serde_as(as = "DisplayFromStr")]
    fee_base_msat: u64,
    #[serde_as(as = "DisplayFromStr")]
    fee_rate_milli_msat: u64,
    #[serde_as(as = "DisplayFromStr")]
    max_htlc_msat: u64,
    disabled: bool,
}

/// Parse an LND `describegraph` JSON dump into channel records.
///
/// An edge yields one [`Channel`] per direction that carries a policy; a
/// direction is active iff its policy is not `disabled`. All LND channels in
/// `describegraph` are publicly announced.
pub fn from_lnd_json(json: &str) -> anyhow::Result<Vec<Channel>> {
    let graph: LndGraph = serde_json::from_str(json)
        .context("Could not deserialize LND describegraph dump")?;

    let node_features = graph
        .nodes
        .iter()
        .map(|node| (node.pub_key.clone(), feature_hex(&node.features)))
        .collect::<BTreeMap<_, _>>();

    let mut channels = Vec::new();
    for edge in graph.edges {
        let scid = ShortChannelId::from(edge.channel_id);
        let directions = [
            (&edge.node1_pub, &edge.node2_pub, &edge.node1_policy),
            (&edge.node2_pub, &edge.node1_pub, &edge.node2_policy),
        ];
        for (src, dst, policy) in directions {
            let Some(policy) = policy else {
                continue;
            };
            let features = node_features.get(src).cloned().unwrap_or_default();
            let channel = Channel {
                src: src.clone(),
                dst: dst.clone(),
                scid,
                capacity_sat: edge.capacity,
                base_fee_msat: policy.fee_base_msat,
                fee_ppm: policy.fee_rate_milli_msat,
                htlc_minimum_msat: policy.min_htlc,
                htlc_maximum_msat: Some(policy.max_htlc_msat),
                cltv_delta: policy.time_lock_delta,
                active: !policy.disabled,
                announced: true,
                features,
            };
            channel.validate().context("Malformed LND gossip entry")?;
            channels.push(channel);
        }
    }
    Ok(channels)
}

/// Fold a node's advertised feature bits (up to [`MAX_BOLT_FEATURE_BIT`])
/// into the hex string rendering CLN gossip uses.
fn feature_hex(features: &BTreeMap<String, serde_json::Value>) -> String {
    let mut bits: u64 = 0;
    for feature_bit in features.keys() {
        if let Ok(bit) = feature_bit.parse::<u32>() {
            if bit <= MAX_BOLT_FEATURE_BIT {
                bits |= 1 << bit;
            }
        }
    }
    format!("0{bits:x}")
}

#[cfg(test)]
mod test {
    use super::*;

    const CLN_DUMP: &str = r#"{
        "channels": [
            {
                "source": "02aaaa",
                "destination": "03bbbb",
                "short_channel_id": "700000x1x0",
                "satoshis": 1000000,
                "base_fee_millisatoshi": 1000,
                "fee_per_millionth": 250,
                "htlc_minimum_msat": 1000,
                "htlc_maximum_msat": 990000000,
                "delay": 40,
                "active": true,
                "public": true,
                "features": "0882a2"
            },
            {
                "source": "03bbbb",
                "destination": "02aaaa",
                "short_channel_id": "700000x1x0",
                "satoshis": 1000000,
                "base_fee_millisatoshi": 0,
                "fee_per_millionth": 100,
                "delay": 144,
                "active": false,
                "public": true
            }
        ]
    }"#;

    #[test]
    fn parses_cln_dump() {
        let channels = from_cln_json(CLN_DUMP).unwrap();
        assert_eq!(channels.len(), 2);

        let fwd = &channels[0];
        assert_eq!(fwd.src, NodeId::from("02aaaa"));
        assert_eq!(fwd.dst, NodeId::from("03bbbb"));
        assert_eq!(fwd.scid.to_string(), "700000x1x0");
        assert_eq!(fwd.capacity_sat, 1_000_000);
        assert_eq!(fwd.base_fee_msat, 1_000);
        assert_eq!(fwd.fee_ppm, 250);
        assert_eq!(fwd.htlc_maximum_msat, Some(990_000_000));
        assert_eq!(fwd.cltv_delta, 40);
        assert!(fwd.active);
        assert!(fwd.announced);

        // Missing optional fields default; the reverse direction is inactive.
        let rev = &channels[1];
        assert_eq!(rev.htlc_minimum_msat, 0);
        assert_eq!(rev.htlc_maximum_msat, None);
        assert!(!rev.active);
    }

    #[test]
    fn parses_lnd_dump() {
        // channel_id 100 << 40 | 5 << 16 | 1
        let packed = (100u64 << 40) | (5 << 16) | 1;
        let json = format!(
            r#"{{
                "nodes": [
                    {{ "pub_key": "02aaaa", "features": {{ "9": {{}}, "2023": {{}} }} }},
                    {{ "pub_key": "03bbbb" }}
                ],
                "edges": [
                    {{
                        "channel_id": "{packed}",
                        "capacity": "500000",
                        "node1_pub": "02aaaa",
                        "node2_pub": "03bbbb",
                        "node1_policy": {{
                            "time_lock_delta": 40,
                            "min_htlc": "1000",
                            "fee_base_msat": "1000",
                            "fee_rate_milli_msat": "400",
                            "max_htlc_msat": "495000000",
                            "disabled": false
                        }},
                        "node2_policy": {{
                            "time_lock_delta": 144,
                            "min_htlc": "1",
                            "fee_base_msat": "0",
                            "fee_rate_milli_msat": "50",
                            "max_htlc_msat": "495000000",
                            "disabled": true
                        }}
                    }}
                ]
            }}"#
        );

        let channels = from_lnd_json(&json).unwrap();
        assert_eq!(channels.len(), 2);

        let fwd = &channels[0];
        assert_eq!(fwd.scid.to_string(), "100x5x1");
        assert_eq!(fwd.src, NodeId::from("02aaaa"));
        assert_eq!(fwd.dst, NodeId::from("03bbbb"));
        assert_eq!(fwd.capacity_sat, 500_000);
        assert_eq!(fwd.fee_ppm, 400);
        assert!(fwd.active);
        assert!(fwd.announced);
        // Only bits <= 49 are folded in: 1 << 9 == 0x200.
        assert_eq!(fwd.features, "0200");

        // `active = !disabled`.
        let rev = &channels[1];
        assert_eq!(rev.src, NodeId::from("03bbbb"));
        assert!(!rev.active);
    }

    #[test]
    fn rejects_malformed_dump() {
        assert!(from_cln_json("{}").is_err());
        assert!(from_cln_json(r#"{"channels": [{"source": "x"}]}"#).is_err());
        // Zero-capacity channels are invalid input.
        let zero_cap = r#"{
            "channels": [{
                "source": "02aaaa",
                "destination": "03bbbb",
                "short_channel_id": "1x1x1",
                "satoshis": 0,
                "base_fee_millisatoshi": 0,
                "fee_per_millionth": 0,
                "delay": 6,
                "active": true,
                "public": true
            }]
        }"#;
        assert!(from_cln_json(zero_cap).is_err());
    }
}
