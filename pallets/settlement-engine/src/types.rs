//! Value types of the settlement engine and the fixed-point math behind them.
//!
//! Everything here is pure: no storage access and no calls into external collaborators.
//! The pallet assembles these values from fresh balance reads and feeds them back in.

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use polkadot_sdk::sp_core::U256;
use primitives::{
  AssetKind, Balance,
  ecosystem::params::{
    BPS_DENOMINATOR, MAX_MIN_RESERVE_RATIO_BPS, MAX_SLIPPAGE_BPS, ORACLE_SCALE,
  },
};
use scale_info::TypeInfo;

/// `a * b / c` in 256-bit space; `None` on division by zero or when the result overflows u128.
pub fn mul_div(a: Balance, b: Balance, c: Balance) -> Option<Balance> {
  if c == 0 {
    return None;
  }
  let result = U256::from(a)
    .checked_mul(U256::from(b))?
    .checked_div(U256::from(c))?;
  if result > U256::from(u128::MAX) {
    return None;
  }
  Some(result.as_u128())
}

/// Value of an underlying amount in base-asset terms at `rate` (ORACLE_SCALE fixed-point).
/// Saturates instead of failing so valuation never aborts.
pub fn underlying_to_base(amount: Balance, rate: Balance) -> Balance {
  mul_div(amount, rate, ORACLE_SCALE).unwrap_or(Balance::MAX)
}

/// Lowest acceptable output for `amount` underlying at `rate` after `max_slippage_bps`.
///
/// Computed as `amount * rate * (10000 - bps) / (1e18 * 10000)` in one step, rounded up so an
/// accepted `min_out` is never below the exact floor.
pub fn oracle_floor(amount: Balance, rate: Balance, max_slippage_bps: u16) -> Option<Balance> {
  let kept_bps = BPS_DENOMINATOR.saturating_sub(max_slippage_bps as u32);
  let numerator = U256::from(amount)
    .checked_mul(U256::from(rate))?
    .checked_mul(U256::from(kept_bps))?;
  let denominator = U256::from(ORACLE_SCALE).checked_mul(U256::from(BPS_DENOMINATOR))?;
  let floor = numerator
    .checked_add(denominator.checked_sub(U256::one())?)?
    .checked_div(denominator)?;
  if floor > U256::from(u128::MAX) {
    return None;
  }
  Some(floor.as_u128())
}

/// `amount * ratio_bps / 10000`, the emergency path's numeric floor.
pub fn ratio_floor(amount: Balance, ratio_bps: u32) -> Option<Balance> {
  mul_div(amount, ratio_bps as Balance, BPS_DENOMINATOR as Balance)
}

/// Signed `received - expected`, saturating at the i128 range.
pub fn signed_delta(received: Balance, expected: Balance) -> i128 {
  if received >= expected {
    i128::try_from(received - expected).unwrap_or(i128::MAX)
  } else {
    i128::try_from(expected - received)
      .map(|shortfall| -shortfall)
      .unwrap_or(i128::MIN)
  }
}

/// Holdings of the strategy account, read fresh from their sources of truth.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub struct Position {
  /// Base asset held directly by the strategy account
  pub idle_base: Balance,
  /// Underlying asset held directly (claimed, not yet converted)
  pub idle_underlying: Balance,
  /// Base-denominated deposit in the claims ledger, not yet eligible for claim
  pub unexchanged: Balance,
  /// Underlying matured in the claims ledger, requires a claim to move
  pub claimable: Balance,
}

impl Position {
  /// Balance that can leave the strategy without any pending external action.
  pub fn immediately_liquid(&self) -> Balance {
    self.idle_base.saturating_add(self.unexchanged)
  }

  /// Underlying-denominated holdings: idle plus claimable.
  pub fn underlying_total(&self) -> Balance {
    self.idle_underlying.saturating_add(self.claimable)
  }

  /// Underlying holdings valued in base terms at `mark_rate`. Display only.
  pub fn pending_in_base(&self, mark_rate: Balance) -> Balance {
    underlying_to_base(self.underlying_total(), mark_rate)
  }

  pub fn total_value(&self, mark_rate: Balance) -> Balance {
    self
      .immediately_liquid()
      .saturating_add(self.pending_in_base(mark_rate))
  }

  /// `max(0, immediately_liquid - total_value * reserve_bps / 10000)`.
  ///
  /// Never exceeds `immediately_liquid`, so claimable balance is never offered for withdrawal.
  pub fn available_to_withdraw(&self, mark_rate: Balance, min_reserve_ratio_bps: u16) -> Balance {
    let total = self.total_value(mark_rate);
    let reserve_floor = mul_div(
      total,
      min_reserve_ratio_bps as Balance,
      BPS_DENOMINATOR as Balance,
    )
    .unwrap_or(total);
    self.immediately_liquid().saturating_sub(reserve_floor)
  }
}

/// A single price sample: base units per one unit of underlying, scaled by ORACLE_SCALE.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OracleReading {
  pub rate: Balance,
  /// Unix seconds
  pub observed_at: u64,
}

impl OracleReading {
  pub fn age(&self, now: u64) -> u64 {
    now.saturating_sub(self.observed_at)
  }

  pub fn is_stale(&self, now: u64, max_price_age: u64) -> bool {
    self.age(now) > max_price_age
  }

  /// A reading may authorize a conversion only when it is fresh and carries a non-zero rate.
  pub fn is_usable(&self, now: u64, max_price_age: u64) -> bool {
    self.rate != 0 && !self.is_stale(now, max_price_age)
  }
}

/// Oracle-derived expectation for converting a given underlying amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConversionQuote {
  pub expected_out: Balance,
  pub floor: Balance,
}

impl ConversionQuote {
  pub fn derive(amount: Balance, reading: &OracleReading, max_slippage_bps: u16) -> Option<Self> {
    Some(Self {
      expected_out: mul_div(amount, reading.rate, ORACLE_SCALE)?,
      floor: oracle_floor(amount, reading.rate, max_slippage_bps)?,
    })
  }
}

/// One operator-supplied claim+swap attempt. Lives for a single call.
#[derive(Clone, Copy, Debug)]
pub struct ConversionRequest<'a> {
  pub claim_amount: Balance,
  pub min_out: Balance,
  pub route: &'a [AssetKind],
}

impl ConversionRequest<'_> {
  pub fn quote(&self, reading: &OracleReading, max_slippage_bps: u16) -> Option<ConversionQuote> {
    ConversionQuote::derive(self.claim_amount, reading, max_slippage_bps)
  }

  pub fn meets_floor(&self, quote: &ConversionQuote) -> bool {
    self.min_out >= quote.floor
  }
}

/// Risk parameters as currently configured.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub struct ReserveConfig {
  /// Oracle freshness window in seconds
  pub max_price_age: u64,
  pub max_slippage_bps: u16,
  pub min_reserve_ratio_bps: u16,
  /// Claimable balance at which `report_value` claims automatically
  pub auto_claim_threshold: Balance,
}

impl ReserveConfig {
  pub fn price_age_in_range(max_price_age: u64, ceiling: u64) -> bool {
    max_price_age > 0 && max_price_age <= ceiling
  }

  pub fn slippage_in_range(max_slippage_bps: u16) -> bool {
    max_slippage_bps <= MAX_SLIPPAGE_BPS
  }

  pub fn reserve_ratio_in_range(min_reserve_ratio_bps: u16) -> bool {
    min_reserve_ratio_bps <= MAX_MIN_RESERVE_RATIO_BPS
  }

  pub fn threshold_in_range(auto_claim_threshold: Balance) -> bool {
    auto_claim_threshold > 0
  }

  pub fn is_within_bounds(&self, max_price_age_ceiling: u64) -> bool {
    Self::price_age_in_range(self.max_price_age, max_price_age_ceiling)
      && Self::slippage_in_range(self.max_slippage_bps)
      && Self::reserve_ratio_in_range(self.min_reserve_ratio_bps)
      && Self::threshold_in_range(self.auto_claim_threshold)
  }
}

/// Published valuation. Liquid and pending value are kept apart; `total_value` is their sum.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub struct ValueReport {
  pub position: Position,
  /// Rate the underlying was valued at: fresh oracle rate, else the stored mark
  pub mark_rate: Balance,
  /// `idle_base + unexchanged`
  pub liquid: Balance,
  /// `idle_underlying + claimable` in base terms at `mark_rate`
  pub pending_in_base: Balance,
  pub total_value: Balance,
  pub available_to_withdraw: Balance,
}

impl ValueReport {
  pub fn new(position: Position, mark_rate: Balance, min_reserve_ratio_bps: u16) -> Self {
    Self {
      position,
      mark_rate,
      liquid: position.immediately_liquid(),
      pending_in_base: position.pending_in_base(mark_rate),
      total_value: position.total_value(mark_rate),
      available_to_withdraw: position.available_to_withdraw(mark_rate, min_reserve_ratio_bps),
    }
  }
}

/// Why an automatic conversion was postponed to a later cycle.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub enum DeferralReason {
  /// No fresh, non-zero oracle reading was available
  StaleOracle,
  /// The exchange reverted or did not deliver the floor
  ExchangeFailure,
  /// Quote math overflowed
  ArithmeticOverflow,
}
