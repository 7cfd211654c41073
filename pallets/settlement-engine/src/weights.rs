#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn claim_and_convert() -> Weight;
	fn report_value() -> Weight;
	fn emergency_convert() -> Weight;
	fn set_oracle() -> Weight;
	fn set_max_price_age() -> Weight;
	fn set_max_slippage_bps() -> Weight;
	fn set_min_reserve_ratio_bps() -> Weight;
	fn set_auto_claim_threshold() -> Weight;
	fn set_default_route() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn claim_and_convert() -> Weight {
		Weight::from_parts(120_000_000, 9000)
			.saturating_add(T::DbWeight::get().reads(12))
			.saturating_add(T::DbWeight::get().writes(8))
	}
	fn report_value() -> Weight {
		Weight::from_parts(150_000_000, 10000)
			.saturating_add(T::DbWeight::get().reads(16))
			.saturating_add(T::DbWeight::get().writes(10))
	}
	fn emergency_convert() -> Weight {
		Weight::from_parts(110_000_000, 9000)
			.saturating_add(T::DbWeight::get().reads(10))
			.saturating_add(T::DbWeight::get().writes(7))
	}
	fn set_oracle() -> Weight {
		Weight::from_parts(10_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_max_price_age() -> Weight {
		Weight::from_parts(10_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_max_slippage_bps() -> Weight {
		Weight::from_parts(10_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_min_reserve_ratio_bps() -> Weight {
		Weight::from_parts(10_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_auto_claim_threshold() -> Weight {
		Weight::from_parts(10_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_default_route() -> Weight {
		Weight::from_parts(12_000_000, 1700)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
}

impl WeightInfo for () {
	fn claim_and_convert() -> Weight {
		Weight::from_parts(120_000_000, 9000)
			.saturating_add(RocksDbWeight::get().reads(12))
			.saturating_add(RocksDbWeight::get().writes(8))
	}
	fn report_value() -> Weight {
		Weight::from_parts(150_000_000, 10000)
			.saturating_add(RocksDbWeight::get().reads(16))
			.saturating_add(RocksDbWeight::get().writes(10))
	}
	fn emergency_convert() -> Weight {
		Weight::from_parts(110_000_000, 9000)
			.saturating_add(RocksDbWeight::get().reads(10))
			.saturating_add(RocksDbWeight::get().writes(7))
	}
	fn set_oracle() -> Weight {
		Weight::from_parts(10_000_000, 1500)
	}
	fn set_max_price_age() -> Weight {
		Weight::from_parts(10_000_000, 1500)
	}
	fn set_max_slippage_bps() -> Weight {
		Weight::from_parts(10_000_000, 1500)
	}
	fn set_min_reserve_ratio_bps() -> Weight {
		Weight::from_parts(10_000_000, 1500)
	}
	fn set_auto_claim_threshold() -> Weight {
		Weight::from_parts(10_000_000, 1500)
	}
	fn set_default_route() -> Weight {
		Weight::from_parts(12_000_000, 1700)
	}
}
