//! Token amounts and the reward split policy.
//!
//! All monetary values are `u128` integers in the token's smallest unit.
//! Tier splits are computed with exact basis-point arithmetic; floating
//! point is never used for money. Amounts cross the API boundary as JSON
//! strings to preserve `u128` precision.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

/// Basis-point denominator: 10 000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Direct-tier reward share: 1 000 bps = 10% of the gross value.
pub const DIRECT_TIER_BPS: u32 = 1_000;

/// Root-tier reward share: 250 bps = 2.5% of the gross value.
pub const ROOT_TIER_BPS: u32 = 250;

/// Whether a direct referrer with no ancestor of their own counts as a
/// chain root for the root tier. `false` reproduces the reference
/// behavior: the root bonus is paid only for chains of depth ≥ 2.
pub const SINGLE_LEVEL_ROOT_ELIGIBLE: bool = false;

/// A token amount in the token's smallest unit.
///
/// Immutable value type. Arithmetic is explicit and checked; there is no
/// `Add`/`Sub` sugar so every operation site states its overflow policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Creates an amount from a raw smallest-unit value.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw smallest-unit value.
    #[must_use]
    pub const fn get(&self) -> u128 {
        self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Scales the amount by `bps` basis points, rounding down.
    ///
    /// Computes `floor(value · bps / 10 000)` exactly: the value is split
    /// into quotient and remainder against the denominator first, so the
    /// intermediate products stay within `u128` for any input as long as
    /// `bps <= 10 000` (larger values are clamped).
    #[must_use]
    pub const fn scale_bps(&self, bps: u32) -> Self {
        let bps = if bps > BPS_DENOMINATOR {
            BPS_DENOMINATOR as u128
        } else {
            bps as u128
        };
        let denom = BPS_DENOMINATOR as u128;
        let quotient = self.0 / denom;
        let remainder = self.0 % denom;
        Self(quotient * bps + remainder * bps / denom)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<u128>()?))
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TokenAmount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reward split policy for a single distribution request.
///
/// Both tiers use the same fixed-point basis-point arithmetic. The
/// defaults mirror the platform constants above; deployments can override
/// them through [`crate::config::GatewayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RewardPolicy {
    /// Direct-tier share in basis points.
    pub direct_tier_bps: u32,
    /// Root-tier share in basis points.
    pub root_tier_bps: u32,
    /// Whether a referrer with no ancestor is their own chain root.
    pub single_level_root_eligible: bool,
}

impl RewardPolicy {
    /// Computes the direct-tier reward for a gross value.
    #[must_use]
    pub const fn direct_reward(&self, gross: TokenAmount) -> TokenAmount {
        gross.scale_bps(self.direct_tier_bps)
    }

    /// Computes the root-tier reward for a gross value.
    #[must_use]
    pub const fn root_reward(&self, gross: TokenAmount) -> TokenAmount {
        gross.scale_bps(self.root_tier_bps)
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            direct_tier_bps: DIRECT_TIER_BPS,
            root_tier_bps: ROOT_TIER_BPS,
            single_level_root_eligible: SINGLE_LEVEL_ROOT_ELIGIBLE,
        }
    }
}
