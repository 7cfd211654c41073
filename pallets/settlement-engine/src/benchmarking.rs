extern crate alloc;

use crate::*;
use alloc::vec;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::{EnsureOrigin, Get, Hooks};
use polkadot_sdk::frame_support::weights::Weight;
use polkadot_sdk::sp_runtime::traits::Zero;
use primitives::ecosystem::params::{ORACLE_SCALE, PRECISION};

/// Claimable balance, fresh par oracle and par exchange for the strategy account
fn seed_strategy<T: Config>(amount: u128) {
  let holder = Pallet::<T>::account_id();
  T::BenchmarkHelper::seed_claimable(&holder, amount).expect("Failed to seed claimable");
  T::BenchmarkHelper::seed_exchange(ORACLE_SCALE);
  Oracle::<T>::put(T::BenchmarkHelper::seed_oracle(ORACLE_SCALE));
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn claim_and_convert() -> Result<(), BenchmarkError> {
    let amount: u128 = 1_000 * PRECISION;
    seed_strategy::<T>(amount);
    let route = Pallet::<T>::default_route();
    let origin =
      T::OperatorOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, amount, amount, route);

    assert!(Pallet::<T>::claimable_balance().is_zero());
    Ok(())
  }

  #[benchmark]
  fn report_value() {
    // Claim and convert both run: the heaviest report path
    seed_strategy::<T>(AutoClaimThreshold::<T>::get().saturating_mul(2));

    #[block]
    {
      Pallet::<T>::on_idle(
        polkadot_sdk::frame_system::Pallet::<T>::block_number(),
        Weight::from_parts(u64::MAX, u64::MAX),
      );
    }

    assert!(LastReport::<T>::get().is_some());
  }

  #[benchmark]
  fn emergency_convert() -> Result<(), BenchmarkError> {
    let amount: u128 = 1_000 * PRECISION;
    seed_strategy::<T>(amount);
    let origin =
      T::EmergencyOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, 9_000u32);

    assert!(Pallet::<T>::claimable_balance().is_zero());
    Ok(())
  }

  #[benchmark]
  fn set_oracle() -> Result<(), BenchmarkError> {
    let oracle = T::BenchmarkHelper::seed_oracle(ORACLE_SCALE);
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, Some(oracle));

    assert!(Oracle::<T>::get().is_some());
    Ok(())
  }

  #[benchmark]
  fn set_max_price_age() -> Result<(), BenchmarkError> {
    let new_age = T::MaxPriceAgeCeiling::get();
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, new_age);

    assert_eq!(MaxPriceAge::<T>::get(), new_age);
    Ok(())
  }

  #[benchmark]
  fn set_max_slippage_bps() -> Result<(), BenchmarkError> {
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, 250u16);

    assert_eq!(MaxSlippageBps::<T>::get(), 250);
    Ok(())
  }

  #[benchmark]
  fn set_min_reserve_ratio_bps() -> Result<(), BenchmarkError> {
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, 1_000u16);

    assert_eq!(MinReserveRatioBps::<T>::get(), 1_000);
    Ok(())
  }

  #[benchmark]
  fn set_auto_claim_threshold() -> Result<(), BenchmarkError> {
    let new_threshold: u128 = 42 * PRECISION;
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, new_threshold);

    assert_eq!(AutoClaimThreshold::<T>::get(), new_threshold);
    Ok(())
  }

  #[benchmark]
  fn set_default_route() -> Result<(), BenchmarkError> {
    let route =
      RouteOf::<T>::truncate_from(vec![T::UnderlyingAsset::get(), T::BaseAsset::get()]);
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, route);

    assert!(DefaultRoute::<T>::get().is_some());
    Ok(())
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
