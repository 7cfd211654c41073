//! Ecosystem Constants for the Settlement Engine
//!
//! Centralizes pallet IDs, fixed-point scales, configuration bounds and default risk
//! parameters. Mocks and runtime configurations import these instead of repeating literals.

/// Balance type alias for consistency across the ecosystem
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
pub mod pallet_ids {
  /// Settlement Engine pallet ID (custodial claim/convert strategy account)
  pub const SETTLEMENT_ENGINE_PALLET_ID: &[u8; 8] = b"settleng";
}

/// Fixed-point scales, hard bounds and defaults for the claim/convert strategy.
pub mod params {
  use super::Balance;

  /// Token precision used for amounts in tests and defaults (10^12).
  pub const PRECISION: Balance = 1_000_000_000_000;

  /// Scale of oracle rates: base-asset units per one unit of underlying (10^18).
  pub const ORACLE_SCALE: Balance = 1_000_000_000_000_000_000;

  /// Basis-point denominator (100% = 10_000 bps).
  pub const BPS_DENOMINATOR: u32 = 10_000;

  /// Upper bound for the tolerated conversion slippage (10%).
  pub const MAX_SLIPPAGE_BPS: u16 = 1_000;

  /// Upper bound for the withheld reserve ratio (50%).
  pub const MAX_MIN_RESERVE_RATIO_BPS: u16 = 5_000;

  /// Upper bound for the oracle freshness window (1 day).
  pub const MAX_PRICE_AGE_CEILING_SECS: u64 = 86_400;

  /// Default oracle freshness window (1 hour).
  pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 3_600;

  /// Default tolerated conversion slippage (1%).
  pub const DEFAULT_MAX_SLIPPAGE_BPS: u16 = 100;

  /// Default withheld reserve ratio (5%).
  pub const DEFAULT_MIN_RESERVE_RATIO_BPS: u16 = 500;

  /// Default claimable balance that triggers an automatic claim (10 tokens).
  pub const DEFAULT_AUTO_CLAIM_THRESHOLD: Balance = 10 * PRECISION;

  /// Deadline offset applied to every exchange call (5 minutes).
  pub const SWAP_DEADLINE_SECS: u64 = 300;

  /// Maximum number of assets in a conversion route.
  pub const MAX_ROUTE_HOPS: u32 = 4;
}
