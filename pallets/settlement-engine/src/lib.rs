//! Settlement Engine Pallet
//!
//! Custodial claim-convert-settle strategy. Matured balance is claimed from an external claims
//! ledger, the claimed underlying is converted into the base asset through an external exchange
//! under an oracle-derived output floor, and the resulting position is published as a valuation
//! together with a withdrawal ceiling that never counts unclaimed balance as liquid.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::*;

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

pub(crate) const LOG_TARGET: &str = "runtime::settlement-engine";

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId, OracleId> {
  /// Make `amount` claimable for `holder` in the claims ledger.
  fn seed_claimable(holder: &AccountId, amount: u128) -> frame::deps::sp_runtime::DispatchResult;
  /// Publish a fresh `rate` and return the oracle that carries it.
  fn seed_oracle(rate: u128) -> OracleId;
  /// Make the exchange fill at `rate`.
  fn seed_exchange(rate: u128);
}

#[frame::pallet]
pub mod pallet {
  use super::{LOG_TARGET, WeightInfo};
  use crate::types::*;
  use alloc::vec;
  use frame::deps::{
    frame_support::{
      storage::with_storage_layer,
      traits::{
        ConstU128, UnixTime, fungible::Inspect as NativeInspect,
        fungibles::Inspect as FungiblesInspect,
      },
    },
    sp_runtime::{
      DispatchError,
      traits::{AccountIdConversion, Saturating, Zero},
    },
  };
  use frame::prelude::*;
  use primitives::{AssetKind, ecosystem::params::ORACLE_SCALE};

  /// Route of assets handed to the exchange, underlying first and base last
  pub type RouteOf<T> = BoundedVec<AssetKind, <T as Config>::MaxRouteHops>;

  /// Configuration trait for the settlement engine pallet
  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// The assets pallet holding local fungible tokens (AssetKind::Local)
    type Assets: FungiblesInspect<Self::AccountId, AssetId = u32, Balance = u128>;

    /// The currency holding native tokens (AssetKind::Native)
    type Currency: NativeInspect<Self::AccountId, Balance = u128>;

    /// External ledger that matures base deposits into claimable underlying
    type ClaimsLedger: ClaimsLedger<Self::AccountId, u128>;

    /// Identifier of a price feed
    type OracleId: Parameter + MaxEncodedLen;

    /// External price source for the underlying/base rate
    type PriceOracle: PriceOracle<Self::OracleId, u128>;

    /// External exchange converting underlying into base
    type Exchange: Exchange<Self::AccountId, u128>;

    /// Wall clock used for oracle freshness and swap deadlines
    type Time: UnixTime;

    /// The pallet ID; its derived account holds the strategy position
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Asset the strategy is denominated in
    #[pallet::constant]
    type BaseAsset: Get<AssetKind>;

    /// Asset paid out by the claims ledger
    #[pallet::constant]
    type UnderlyingAsset: Get<AssetKind>;

    /// Default oracle freshness window in seconds
    #[pallet::constant]
    type DefaultMaxPriceAge: Get<u64>;

    /// Default slippage band below the oracle quote, in basis points
    #[pallet::constant]
    type DefaultMaxSlippageBps: Get<u16>;

    /// Default share of total value kept back from withdrawals, in basis points
    #[pallet::constant]
    type DefaultMinReserveRatioBps: Get<u16>;

    /// Default claimable balance at which reporting claims automatically
    #[pallet::constant]
    type DefaultAutoClaimThreshold: Get<u128>;

    /// Upper bound accepted by `set_max_price_age`
    #[pallet::constant]
    type MaxPriceAgeCeiling: Get<u64>;

    /// Seconds added to the current time to form a swap deadline
    #[pallet::constant]
    type SwapDeadline: Get<u64>;

    /// Blocks between automatic reports run from `on_idle`
    #[pallet::constant]
    type ReportInterval: Get<BlockNumberFor<Self>>;

    /// Maximum number of assets in a swap route
    #[pallet::constant]
    type MaxRouteHops: Get<u32>;

    /// Origin allowed to change risk parameters
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Origin allowed to claim, convert and report
    type OperatorOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Origin allowed to convert without an oracle
    type EmergencyOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Weight information for extrinsics
    type WeightInfo: WeightInfo;

    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId, Self::OracleId>;
  }

  /// Claims ledger that holds base deposits until they mature into claimable underlying
  pub trait ClaimsLedger<AccountId, Balance> {
    /// Underlying that `holder` may claim right now
    fn claimable_balance(holder: &AccountId) -> Balance;

    /// Base-denominated deposit of `holder` that has not matured yet
    fn unexchanged_balance(holder: &AccountId) -> Balance;

    /// Claim `amount`, paying underlying to `holder`.
    /// Fails without side effects if `amount` exceeds the claimable balance.
    fn claim(holder: &AccountId, amount: Balance) -> Result<Balance, DispatchError>;
  }

  /// Price feed reporting `asset_b` units per one `asset_a`, scaled by 1e18
  pub trait PriceOracle<OracleId, Balance> {
    fn get_price(oracle: &OracleId, asset_a: AssetKind, asset_b: AssetKind) -> Option<Balance>;

    /// Unix seconds of the latest update
    fn last_update_timestamp(oracle: &OracleId) -> Option<u64>;
  }

  /// Exchange converting along a route
  pub trait Exchange<AccountId, Balance> {
    /// Swap `amount_in` of `route[0]` from `who` into the last asset of `route`, paid to
    /// `recipient`. Must revert if the output is below `min_out` or `deadline` has passed.
    fn swap(
      who: &AccountId,
      amount_in: Balance,
      min_out: Balance,
      route: &[AssetKind],
      recipient: &AccountId,
      deadline: u64,
    ) -> Result<Balance, DispatchError>;
  }

  /// The pallet struct
  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Price feed used for floors and marks; conversions are refused while unset
  #[pallet::storage]
  #[pallet::getter(fn oracle)]
  pub type Oracle<T: Config> = StorageValue<_, T::OracleId, OptionQuery>;

  #[pallet::storage]
  #[pallet::getter(fn max_price_age)]
  pub type MaxPriceAge<T: Config> = StorageValue<_, u64, ValueQuery, T::DefaultMaxPriceAge>;

  #[pallet::storage]
  #[pallet::getter(fn max_slippage_bps)]
  pub type MaxSlippageBps<T: Config> = StorageValue<_, u16, ValueQuery, T::DefaultMaxSlippageBps>;

  #[pallet::storage]
  #[pallet::getter(fn min_reserve_ratio_bps)]
  pub type MinReserveRatioBps<T: Config> =
    StorageValue<_, u16, ValueQuery, T::DefaultMinReserveRatioBps>;

  #[pallet::storage]
  #[pallet::getter(fn auto_claim_threshold)]
  pub type AutoClaimThreshold<T: Config> =
    StorageValue<_, u128, ValueQuery, T::DefaultAutoClaimThreshold>;

  /// Route used by automatic and emergency conversions; `[underlying, base]` when unset
  #[pallet::storage]
  pub type DefaultRoute<T: Config> = StorageValue<_, RouteOf<T>, OptionQuery>;

  /// Last fresh oracle rate; values underlying holdings while the feed is stale. Starts at par.
  #[pallet::storage]
  #[pallet::getter(fn mark_rate)]
  pub type MarkRate<T: Config> = StorageValue<_, u128, ValueQuery, ConstU128<{ ORACLE_SCALE }>>;

  /// Running sum of `received - expected_out` over all conversions
  #[pallet::storage]
  #[pallet::getter(fn realized_execution_delta)]
  pub type RealizedExecutionDelta<T: Config> = StorageValue<_, i128, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn last_report)]
  pub type LastReport<T: Config> = StorageValue<_, ValueReport, OptionQuery>;

  /// Block at or after which `on_idle` runs the next report
  #[pallet::storage]
  pub type NextReportAt<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

  /// Events for the settlement engine pallet
  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// Underlying claimed from the claims ledger
    Claimed { amount: u128 },
    /// Underlying converted into base
    Converted {
      amount_in: u128,
      received: u128,
      expected_out: u128,
      min_out: u128,
      execution_delta: i128,
    },
    /// Automatic conversion postponed; the underlying stays idle until a later report
    ConversionDeferred {
      amount: u128,
      reason: DeferralReason,
    },
    /// Automatic claim failed and will be retried by a later report
    AutoClaimFailed { amount: u128 },
    /// Position valued
    ValueReported {
      total_value: u128,
      available_to_withdraw: u128,
      claimable: u128,
    },
    /// Conversion performed without oracle protection
    EmergencyConverted {
      claimed: u128,
      amount_in: u128,
      min_out: u128,
      received: u128,
    },
    OracleUpdated {
      old_oracle: Option<T::OracleId>,
      new_oracle: Option<T::OracleId>,
    },
    MaxPriceAgeUpdated { old_age: u64, new_age: u64 },
    MaxSlippageUpdated { old_bps: u16, new_bps: u16 },
    MinReserveRatioUpdated { old_bps: u16, new_bps: u16 },
    AutoClaimThresholdUpdated {
      old_threshold: u128,
      new_threshold: u128,
    },
    DefaultRouteUpdated {
      old_route: Option<RouteOf<T>>,
      new_route: RouteOf<T>,
    },
  }

  /// Errors for the settlement engine pallet
  #[pallet::error]
  pub enum Error<T> {
    /// Oracle unset, silent, zero or older than the freshness window
    StaleOracle,
    /// Caller's minimum output is below the oracle-derived floor
    SlippageFloorViolated,
    /// Requested claim exceeds the claimable balance
    InsufficientClaimable,
    /// Exchange reverted or delivered less than the minimum output
    ExchangeFailure,
    /// Configuration value outside its allowed range
    ConfigOutOfRange,
    /// Amount must be non-zero
    ZeroAmount,
    /// Route must run from the underlying to the base asset
    InvalidRoute,
    /// Claims ledger did not pay out the requested amount
    ClaimFailed,
    /// No underlying to convert
    NothingToConvert,
    /// Emergency minimum output ratio must yield a non-zero floor
    InvalidMinOutRatio,
    /// Arithmetic overflow occurred
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Claim `claim_amount` from the ledger and convert it to base in one atomic step.
    ///
    /// `min_out` must be at least the oracle floor `claim_amount * rate * (1 - slippage)`.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::claim_and_convert())]
    pub fn claim_and_convert(
      origin: OriginFor<T>,
      claim_amount: u128,
      min_out: u128,
      route: RouteOf<T>,
    ) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      Self::do_claim_and_convert(claim_amount, min_out, &route)?;
      Ok(())
    }

    /// Refresh the valuation, claiming and converting opportunistically.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::report_value())]
    pub fn report_value(origin: OriginFor<T>) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      Self::do_report_value();
      Ok(())
    }

    /// Claim everything and convert all underlying with a ratio floor instead of an oracle floor.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::emergency_convert())]
    pub fn emergency_convert(origin: OriginFor<T>, min_out_ratio_bps: u32) -> DispatchResult {
      T::EmergencyOrigin::ensure_origin(origin)?;
      ensure!(min_out_ratio_bps > 0, Error::<T>::InvalidMinOutRatio);
      Self::do_emergency_convert(min_out_ratio_bps)?;
      Ok(())
    }

    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::set_oracle())]
    pub fn set_oracle(origin: OriginFor<T>, new_oracle: Option<T::OracleId>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      let old_oracle = Oracle::<T>::get();
      Oracle::<T>::set(new_oracle.clone());
      Self::deposit_event(Event::OracleUpdated {
        old_oracle,
        new_oracle,
      });
      Ok(())
    }

    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::set_max_price_age())]
    pub fn set_max_price_age(origin: OriginFor<T>, new_age: u64) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        ReserveConfig::price_age_in_range(new_age, T::MaxPriceAgeCeiling::get()),
        Error::<T>::ConfigOutOfRange
      );
      let old_age = MaxPriceAge::<T>::get();
      MaxPriceAge::<T>::put(new_age);
      Self::deposit_event(Event::MaxPriceAgeUpdated { old_age, new_age });
      Ok(())
    }

    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::set_max_slippage_bps())]
    pub fn set_max_slippage_bps(origin: OriginFor<T>, new_bps: u16) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        ReserveConfig::slippage_in_range(new_bps),
        Error::<T>::ConfigOutOfRange
      );
      let old_bps = MaxSlippageBps::<T>::get();
      MaxSlippageBps::<T>::put(new_bps);
      Self::deposit_event(Event::MaxSlippageUpdated { old_bps, new_bps });
      Ok(())
    }

    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::set_min_reserve_ratio_bps())]
    pub fn set_min_reserve_ratio_bps(origin: OriginFor<T>, new_bps: u16) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        ReserveConfig::reserve_ratio_in_range(new_bps),
        Error::<T>::ConfigOutOfRange
      );
      let old_bps = MinReserveRatioBps::<T>::get();
      MinReserveRatioBps::<T>::put(new_bps);
      Self::deposit_event(Event::MinReserveRatioUpdated { old_bps, new_bps });
      Ok(())
    }

    #[pallet::call_index(7)]
    #[pallet::weight(T::WeightInfo::set_auto_claim_threshold())]
    pub fn set_auto_claim_threshold(origin: OriginFor<T>, new_threshold: u128) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        ReserveConfig::threshold_in_range(new_threshold),
        Error::<T>::ConfigOutOfRange
      );
      let old_threshold = AutoClaimThreshold::<T>::get();
      AutoClaimThreshold::<T>::put(new_threshold);
      Self::deposit_event(Event::AutoClaimThresholdUpdated {
        old_threshold,
        new_threshold,
      });
      Ok(())
    }

    #[pallet::call_index(8)]
    #[pallet::weight(T::WeightInfo::set_default_route())]
    pub fn set_default_route(origin: OriginFor<T>, new_route: RouteOf<T>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      Self::ensure_valid_route(&new_route)?;
      let old_route = DefaultRoute::<T>::get();
      DefaultRoute::<T>::put(new_route.clone());
      Self::deposit_event(Event::DefaultRouteUpdated {
        old_route,
        new_route,
      });
      Ok(())
    }
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn on_idle(n: BlockNumberFor<T>, remaining_weight: Weight) -> Weight {
      let report_weight = T::WeightInfo::report_value()
        .saturating_add(T::DbWeight::get().reads_writes(1, 1));
      if !remaining_weight.all_gte(report_weight) {
        return Weight::zero();
      }
      if n < NextReportAt::<T>::get() {
        return T::DbWeight::get().reads(1);
      }
      NextReportAt::<T>::put(n.saturating_add(T::ReportInterval::get()));
      Self::do_report_value();
      report_weight
    }

    fn integrity_test() {
      assert!(
        T::MaxRouteHops::get() >= 2,
        "MaxRouteHops must allow a direct route"
      );
      assert!(
        T::BaseAsset::get() != T::UnderlyingAsset::get(),
        "Base and underlying assets must differ"
      );
      let defaults = ReserveConfig {
        max_price_age: T::DefaultMaxPriceAge::get(),
        max_slippage_bps: T::DefaultMaxSlippageBps::get(),
        min_reserve_ratio_bps: T::DefaultMinReserveRatioBps::get(),
        auto_claim_threshold: T::DefaultAutoClaimThreshold::get(),
      };
      assert!(
        defaults.is_within_bounds(T::MaxPriceAgeCeiling::get()),
        "Default risk parameters out of range"
      );
    }
  }

  impl<T: Config> Pallet<T> {
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    fn now() -> u64 {
      T::Time::now().as_secs()
    }

    pub fn balance_of(asset: AssetKind, who: &T::AccountId) -> u128 {
      use primitives::AssetInspector;
      match asset.local_id() {
        Some(id) => T::Assets::balance(id, who),
        None => T::Currency::balance(who),
      }
    }

    pub fn claimable_balance() -> u128 {
      T::ClaimsLedger::claimable_balance(&Self::account_id())
    }

    pub fn unexchanged_balance() -> u128 {
      T::ClaimsLedger::unexchanged_balance(&Self::account_id())
    }

    /// Current holdings, read fresh from the asset pallets and the claims ledger.
    pub fn position() -> Position {
      let holder = Self::account_id();
      Position {
        idle_base: Self::balance_of(T::BaseAsset::get(), &holder),
        idle_underlying: Self::balance_of(T::UnderlyingAsset::get(), &holder),
        unexchanged: T::ClaimsLedger::unexchanged_balance(&holder),
        claimable: T::ClaimsLedger::claimable_balance(&holder),
      }
    }

    pub fn reserve_config() -> ReserveConfig {
      ReserveConfig {
        max_price_age: MaxPriceAge::<T>::get(),
        max_slippage_bps: MaxSlippageBps::<T>::get(),
        min_reserve_ratio_bps: MinReserveRatioBps::<T>::get(),
        auto_claim_threshold: AutoClaimThreshold::<T>::get(),
      }
    }

    /// Rate used to value underlying: the fresh oracle rate, or the stored mark when the feed
    /// is unusable.
    pub fn valuation_rate() -> u128 {
      Self::fresh_reading()
        .map(|reading| reading.rate)
        .unwrap_or_else(|_| MarkRate::<T>::get())
    }

    pub fn value_report() -> ValueReport {
      ValueReport::new(
        Self::position(),
        Self::valuation_rate(),
        MinReserveRatioBps::<T>::get(),
      )
    }

    pub fn total_value() -> u128 {
      Self::position().total_value(Self::valuation_rate())
    }

    pub fn available_to_withdraw() -> u128 {
      Self::position().available_to_withdraw(
        Self::valuation_rate(),
        MinReserveRatioBps::<T>::get(),
      )
    }

    pub fn default_route() -> RouteOf<T> {
      DefaultRoute::<T>::get().unwrap_or_else(|| {
        RouteOf::<T>::truncate_from(vec![T::UnderlyingAsset::get(), T::BaseAsset::get()])
      })
    }

    /// Read the configured oracle, refusing unset, silent, zero-rate or stale feeds.
    pub fn fresh_reading() -> Result<OracleReading, Error<T>> {
      let oracle = Oracle::<T>::get().ok_or(Error::<T>::StaleOracle)?;
      let rate = T::PriceOracle::get_price(&oracle, T::UnderlyingAsset::get(), T::BaseAsset::get())
        .ok_or(Error::<T>::StaleOracle)?;
      let observed_at =
        T::PriceOracle::last_update_timestamp(&oracle).ok_or(Error::<T>::StaleOracle)?;
      let reading = OracleReading { rate, observed_at };
      ensure!(
        reading.is_usable(Self::now(), MaxPriceAge::<T>::get()),
        Error::<T>::StaleOracle
      );
      Ok(reading)
    }

    fn ensure_valid_route(route: &[AssetKind]) -> Result<(), Error<T>> {
      ensure!(route.len() >= 2, Error::<T>::InvalidRoute);
      ensure!(
        route.first() == Some(&T::UnderlyingAsset::get())
          && route.last() == Some(&T::BaseAsset::get()),
        Error::<T>::InvalidRoute
      );
      ensure!(
        route.windows(2).all(|hop| hop[0] != hop[1]),
        Error::<T>::InvalidRoute
      );
      Ok(())
    }

    pub fn do_claim_and_convert(
      claim_amount: u128,
      min_out: u128,
      route: &[AssetKind],
    ) -> Result<u128, DispatchError> {
      ensure!(!claim_amount.is_zero(), Error::<T>::ZeroAmount);
      Self::ensure_valid_route(route)?;
      let holder = Self::account_id();
      ensure!(
        claim_amount <= T::ClaimsLedger::claimable_balance(&holder),
        Error::<T>::InsufficientClaimable
      );
      // Freshness is re-read right before the floor is derived.
      let reading = Self::fresh_reading()?;
      let request = ConversionRequest {
        claim_amount,
        min_out,
        route,
      };
      let quote = request
        .quote(&reading, MaxSlippageBps::<T>::get())
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      ensure!(
        request.meets_floor(&quote),
        Error::<T>::SlippageFloorViolated
      );

      let received = with_storage_layer(|| -> Result<u128, DispatchError> {
        Self::claim_from_ledger(&holder, claim_amount)?;
        Self::convert_underlying(&holder, claim_amount, min_out, route)
      })?;

      MarkRate::<T>::put(reading.rate);
      Self::record_execution(claim_amount, received, quote.expected_out, min_out);
      Ok(received)
    }

    /// One valuation cycle. Never fails: claim and conversion problems are deferred.
    pub fn do_report_value() -> ValueReport {
      let holder = Self::account_id();
      let reading = match Self::fresh_reading() {
        Ok(reading) => {
          MarkRate::<T>::put(reading.rate);
          Some(reading)
        }
        Err(_) => None,
      };

      let claimable = T::ClaimsLedger::claimable_balance(&holder);
      if !claimable.is_zero() && claimable >= AutoClaimThreshold::<T>::get() {
        if let Err(e) = with_storage_layer(|| Self::claim_from_ledger(&holder, claimable)) {
          log::info!(
            target: LOG_TARGET,
            "Auto-claim of {claimable} failed: {e:?}; retrying next cycle"
          );
          Self::deposit_event(Event::AutoClaimFailed { amount: claimable });
        }
      }

      let idle_underlying = Self::balance_of(T::UnderlyingAsset::get(), &holder);
      if !idle_underlying.is_zero() {
        match reading {
          Some(reading) => Self::auto_convert(&holder, idle_underlying, &reading),
          None => Self::defer_conversion(idle_underlying, DeferralReason::StaleOracle),
        }
      }

      let report = Self::value_report();
      LastReport::<T>::put(report);
      log::debug!(
        target: LOG_TARGET,
        "Reported total {} available {} mark {}",
        report.total_value,
        report.available_to_withdraw,
        report.mark_rate
      );
      Self::deposit_event(Event::ValueReported {
        total_value: report.total_value,
        available_to_withdraw: report.available_to_withdraw,
        claimable: report.position.claimable,
      });
      report
    }

    pub fn do_emergency_convert(min_out_ratio_bps: u32) -> Result<u128, DispatchError> {
      let holder = Self::account_id();
      let route = Self::default_route();
      with_storage_layer(|| -> Result<u128, DispatchError> {
        let claimable = T::ClaimsLedger::claimable_balance(&holder);
        let claimed = if claimable.is_zero() {
          0
        } else {
          Self::claim_from_ledger(&holder, claimable)?
        };
        let amount_in = Self::balance_of(T::UnderlyingAsset::get(), &holder);
        ensure!(!amount_in.is_zero(), Error::<T>::NothingToConvert);
        let min_out =
          ratio_floor(amount_in, min_out_ratio_bps).ok_or(Error::<T>::ArithmeticOverflow)?;
        ensure!(!min_out.is_zero(), Error::<T>::InvalidMinOutRatio);
        log::warn!(
          target: LOG_TARGET,
          "Emergency conversion of {amount_in} underlying without oracle check, min_out {min_out}"
        );
        let received = Self::convert_underlying(&holder, amount_in, min_out, &route)?;
        Self::deposit_event(Event::EmergencyConverted {
          claimed,
          amount_in,
          min_out,
          received,
        });
        Ok(received)
      })
    }

    /// Claim and verify the payout by balance delta.
    fn claim_from_ledger(holder: &T::AccountId, amount: u128) -> Result<u128, DispatchError> {
      let underlying = T::UnderlyingAsset::get();
      let before = Self::balance_of(underlying, holder);
      T::ClaimsLedger::claim(holder, amount).map_err(|_| Error::<T>::ClaimFailed)?;
      let claimed = Self::balance_of(underlying, holder).saturating_sub(before);
      ensure!(claimed >= amount, Error::<T>::ClaimFailed);
      Self::deposit_event(Event::Claimed { amount: claimed });
      Ok(claimed)
    }

    /// Swap underlying to base and verify the result by balance deltas, not the return value.
    fn convert_underlying(
      holder: &T::AccountId,
      amount_in: u128,
      min_out: u128,
      route: &[AssetKind],
    ) -> Result<u128, DispatchError> {
      let (base, underlying) = (T::BaseAsset::get(), T::UnderlyingAsset::get());
      let base_before = Self::balance_of(base, holder);
      let underlying_before = Self::balance_of(underlying, holder);
      let deadline = Self::now().saturating_add(T::SwapDeadline::get());
      T::Exchange::swap(holder, amount_in, min_out, route, holder, deadline).map_err(|e| {
        log::debug!(target: LOG_TARGET, "Swap of {amount_in} failed: {e:?}");
        Error::<T>::ExchangeFailure
      })?;
      let received = Self::balance_of(base, holder).saturating_sub(base_before);
      let spent = underlying_before.saturating_sub(Self::balance_of(underlying, holder));
      ensure!(
        !received.is_zero() && received >= min_out,
        Error::<T>::ExchangeFailure
      );
      ensure!(spent <= amount_in, Error::<T>::ExchangeFailure);
      Ok(received)
    }

    fn auto_convert(holder: &T::AccountId, amount_in: u128, reading: &OracleReading) {
      let Some(quote) = ConversionQuote::derive(amount_in, reading, MaxSlippageBps::<T>::get())
      else {
        return Self::defer_conversion(amount_in, DeferralReason::ArithmeticOverflow);
      };
      let route = Self::default_route();
      match with_storage_layer(|| Self::convert_underlying(holder, amount_in, quote.floor, &route))
      {
        Ok(received) => {
          Self::record_execution(amount_in, received, quote.expected_out, quote.floor)
        }
        Err(_) => Self::defer_conversion(amount_in, DeferralReason::ExchangeFailure),
      }
    }

    fn defer_conversion(amount: u128, reason: DeferralReason) {
      log::info!(
        target: LOG_TARGET,
        "Conversion of {amount} underlying deferred: {reason:?}"
      );
      Self::deposit_event(Event::ConversionDeferred { amount, reason });
    }

    fn record_execution(amount_in: u128, received: u128, expected_out: u128, min_out: u128) {
      let execution_delta = signed_delta(received, expected_out);
      RealizedExecutionDelta::<T>::mutate(|total| *total = total.saturating_add(execution_delta));
      Self::deposit_event(Event::Converted {
        amount_in,
        received,
        expected_out,
        min_out,
        execution_delta,
      });
    }
  }

  /// Genesis configuration: keeps the strategy account alive without native balance
  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      // Pallet account survives zero native balance via provider reference
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
