//! Tuning constants for planning and probing.

/// Largest plausible channel on the network, in sats (150 BTC). Linearized
/// uncertainty unit costs scale inversely with a channel's conditional
/// capacity; bounding the numerator by this constant keeps every unit cost
/// inside the min-cost-flow solver's integer range.
pub const MAX_CHANNEL_SIZE_SAT: u64 = 15_000_000_000;

/// The maximum supply of Bitcoin that can ever exist, in sats. Primarily
/// useful as a sanity bound on amounts.
pub const TOTAL_BITCOIN_SUPPLY_SAT: u64 = 21_000_000 * 100_000_000;

/// Default weight of routing fees relative to uncertainty cost.
pub const DEFAULT_MU: u64 = 1;

/// Default base-fee threshold in msat. Channels charging a higher base fee
/// are excluded from planning.
pub const DEFAULT_BASE_FEE_THRESHOLD_MSAT: u64 = 0;

/// Default number of pieces used to linearize a channel's uncertainty cost.
pub const DEFAULT_N_PIECES: u64 = 5;

/// Default cap on the number of plan-probe rounds in one payment.
pub const DEFAULT_MAX_ROUNDS: u32 = 15;

/// Default probability floor: a payment aborts once the marginal attempt of
/// the previous round had a lower estimated success probability.
pub const DEFAULT_MIN_PROBABILITY_FLOOR: f64 = 0.05;

/// Amount (in sats) a channel must be able to forward with high probability
/// to survive the pre-solve reliability prune.
pub const PRUNE_PROBE_AMOUNT_SAT: u64 = 250_000;

/// Success probability below which the reliability prune drops a channel.
pub const PRUNE_MIN_PROBABILITY: f64 = 0.9;
