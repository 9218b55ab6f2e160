//! Core channel identifier and metadata types.
//!
//! A channel is a directed, capacity-bounded liquidity edge between two
//! nodes. Both the belief graph and the oracle graph key their per-channel
//! state by the same [`ChannelRef`] value type, so neither ever holds a
//! pointer into the other.

use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// A node identifier, i.e. the hex-encoded pubkey seen in gossip.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A BOLT short channel id: the funding output's position in the chain,
/// packed as `block << 40 | tx_index << 16 | output_index`.
///
/// Displays and parses in the conventional `"BxTxO"` rendering; a bare
/// integer (the packed form used by some implementations) also parses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub struct ShortChannelId(u64);

impl ShortChannelId {
    /// Block and tx index take 24 bits each, the output index 16.
    const MASK_24: u64 = 0xff_ffff;
    const MASK_16: u64 = 0xffff;

    /// Build a short channel id from its block, transaction index and output
    /// index parts. Returns `None` if any part exceeds its bit width.
    pub fn new(block: u32, tx_index: u32, output_index: u16) -> Option<Self> {
        if u64::from(block) > Self::MASK_24 {
            return None;
        }
        if u64::from(tx_index) > Self::MASK_24 {
            return None;
        }
        let packed = (u64::from(block) << 40)
            | (u64::from(tx_index) << 16)
            | u64::from(output_index);
        Some(Self(packed))
    }

    /// The packed `u64` form.
    #[inline]
    pub fn to_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn block(self) -> u32 {
        (self.0 >> 40) as u32
    }

    #[inline]
    pub fn tx_index(self) -> u32 {
        ((self.0 >> 16) & Self::MASK_24) as u32
    }

    #[inline]
    pub fn output_index(self) -> u16 {
        (self.0 & Self::MASK_16) as u16
    }
}

impl From<u64> for ShortChannelId {
    fn from(packed: u64) -> Self {
        Self(packed)
    }
}

/// Parses `"BxTxO"`, falling back to the packed integer form.
impl FromStr for ShortChannelId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        if !s.contains('x') {
            let packed = u64::from_str(s)
                .context("Short channel id is neither BxTxO nor packed u64")?;
            return Ok(Self(packed));
        }

        let mut parts = s.split('x');
        let block = parts
            .next()
            .context("Missing <block> in <block>x<tx>x<output>")?;
        let tx_index =
            parts.next().context("Missing <tx> in <block>x<tx>x<output>")?;
        let output_index = parts
            .next()
            .context("Missing <output> in <block>x<tx>x<output>")?;
        if parts.next().is_some() {
            bail!("Too many components in short channel id '{s}'");
        }

        let block = u32::from_str(block).context("Invalid block height")?;
        let tx_index = u32::from_str(tx_index).context("Invalid tx index")?;
        let output_index =
            u16::from_str(output_index).context("Invalid output index")?;

        Self::new(block, tx_index, output_index)
            .with_context(|| format!("Short channel id '{s}' out of range"))
    }
}

/// Displays as `<block>x<tx_index>x<output_index>`.
impl Display for ShortChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block(),
            self.tx_index(),
            self.output_index()
        )
    }
}

/// The value key identifying one *direction* of a channel:
/// `(source, destination, short_channel_id)`.
///
/// Parallel channels between the same ordered node pair are distinguished by
/// their short channel id. The opposite direction of a channel is not a
/// pointer but a separate entry under [`ChannelRef::reversed`], which may be
/// absent (unannounced return channels).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
pub struct ChannelRef {
    pub src: NodeId,
    pub dst: NodeId,
    pub scid: ShortChannelId,
}

impl ChannelRef {
    pub fn new(
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        scid: ShortChannelId,
    ) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            scid,
        }
    }

    /// The key of the channel in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst.clone(),
            dst: self.src.clone(),
            scid: self.scid,
        }
    }
}

impl Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}/{}", self.src, self.dst, self.scid)
    }
}

/// The static, immutable metadata of one channel direction, as parsed from
/// gossip. Liquidity state lives in the oracle and uncertainty graphs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub src: NodeId,
    pub dst: NodeId,
    pub scid: ShortChannelId,
    /// Total channel capacity in sats, as seen in the funding tx output.
    pub capacity_sat: u64,
    /// Flat fee charged per forwarded HTLC, in msat.
    pub base_fee_msat: u64,
    /// Proportional fee rate in parts per million.
    pub fee_ppm: u64,
    pub htlc_minimum_msat: u64,
    pub htlc_maximum_msat: Option<u64>,
    pub cltv_delta: u32,
    pub active: bool,
    pub announced: bool,
    pub features: String,
}

impl Channel {
    /// The key of this channel direction.
    pub fn reference(&self) -> ChannelRef {
        ChannelRef {
            src: self.src.clone(),
            dst: self.dst.clone(),
            scid: self.scid,
        }
    }

    /// Sanity-checks a parsed gossip record before it enters any graph.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.src != self.dst,
            "Channel {} loops back to its own node",
            self.scid,
        );
        ensure!(
            self.capacity_sat > 0,
            "Channel {} has zero capacity",
            self.scid,
        );
        Ok(())
    }
}
