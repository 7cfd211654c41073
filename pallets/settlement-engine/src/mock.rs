extern crate alloc;

use crate as pallet_settlement_engine;
use alloc::vec::Vec;
use codec::Encode;
use polkadot_sdk::frame_support::traits::fungibles::Mutate;
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl, ord_parameter_types,
  storage::unhashed,
  traits::{ConstU16, ConstU32, ConstU64, ConstU128, Get, UnixTime},
  weights::constants::RocksDbWeight,
};
use polkadot_sdk::frame_system::{self, EnsureRoot, EnsureSignedBy};
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};
use primitives::{AssetInspector, AssetKind};
use primitives::ecosystem::params::{
  DEFAULT_AUTO_CLAIM_THRESHOLD, DEFAULT_MAX_PRICE_AGE_SECS, DEFAULT_MAX_SLIPPAGE_BPS,
  DEFAULT_MIN_RESERVE_RATIO_BPS, MAX_PRICE_AGE_CEILING_SECS, MAX_ROUTE_HOPS, ORACLE_SCALE,
  SWAP_DEADLINE_SECS,
};
use primitives::ecosystem::pallet_ids::SETTLEMENT_ENGINE_PALLET_ID;
use std::cell::RefCell;
use std::collections::BTreeMap;

pub const ASSET_OWNER: u64 = 1;
pub const OPERATOR: u64 = 7;
pub const ALICE: u64 = 2;
pub const BASE_ASSET_ID: u32 = 1;
pub const UNDERLYING_ASSET_ID: u32 = 2;
pub const BASE: AssetKind = AssetKind::Local(BASE_ASSET_ID);
pub const UNDERLYING: AssetKind = AssetKind::Local(UNDERLYING_ASSET_ID);
pub const ORACLE_ID: u32 = 1;
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// How the mock exchange treats the next swaps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeMode {
  Healthy,
  /// Rejects before touching balances
  Reverts,
  /// Debits the input, then reports failure without paying out
  FailsAfterDebit,
}

/// Arguments of the most recent swap request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapCall {
  pub amount_in: u128,
  pub min_out: u128,
  pub route: Vec<AssetKind>,
  pub deadline: u64,
}

// State containers for stateful mocks
thread_local! {
    pub static NOW: RefCell<u64> = const { RefCell::new(GENESIS_TIME) };

    // Oracle feeds: oracle id -> (rate, updated_at)
    pub static ORACLES: RefCell<BTreeMap<u32, (u128, u64)>> = const { RefCell::new(BTreeMap::new()) };

    // Exchange fill rate, underlying -> base, ORACLE_SCALE fixed-point
    pub static EXCHANGE_RATE: RefCell<u128> = const { RefCell::new(ORACLE_SCALE) };

    pub static EXCHANGE_MODE: RefCell<ExchangeMode> = const { RefCell::new(ExchangeMode::Healthy) };

    pub static LAST_SWAP: RefCell<Option<SwapCall>> = const { RefCell::new(None) };
}

pub fn now() -> u64 {
  NOW.with(|n| *n.borrow())
}

pub fn advance_time(secs: u64) {
  NOW.with(|n| *n.borrow_mut() += secs);
}

pub fn set_oracle_reading(oracle: u32, rate: u128, updated_at: u64) {
  ORACLES.with(|o| o.borrow_mut().insert(oracle, (rate, updated_at)));
}

pub fn set_exchange_rate(rate: u128) {
  EXCHANGE_RATE.with(|r| *r.borrow_mut() = rate);
}

pub fn set_exchange_mode(mode: ExchangeMode) {
  EXCHANGE_MODE.with(|m| *m.borrow_mut() = mode);
}

pub fn last_swap() -> Option<SwapCall> {
  LAST_SWAP.with(|s| s.borrow().clone())
}

// Ledger balances live in storage so they roll back together with the pallet's storage layers.
const CLAIMABLE_PREFIX: &[u8] = b"mock/claims-ledger/claimable";
const UNEXCHANGED_PREFIX: &[u8] = b"mock/claims-ledger/unexchanged";

fn ledger_key(prefix: &[u8], holder: &u64) -> Vec<u8> {
  let mut key = prefix.to_vec();
  key.extend(holder.encode());
  key
}

/// Set the claimable balance of the strategy account
pub fn set_claimable(amount: u128) {
  unhashed::put(
    &ledger_key(CLAIMABLE_PREFIX, &SettlementEngine::account_id()),
    &amount,
  );
}

/// Set the unexchanged balance of the strategy account
pub fn set_unexchanged(amount: u128) {
  unhashed::put(
    &ledger_key(UNEXCHANGED_PREFIX, &SettlementEngine::account_id()),
    &amount,
  );
}

/// Mint directly into the strategy account
pub fn fund_strategy(asset_id: u32, amount: u128) {
  <Assets as Mutate<u64>>::mint_into(asset_id, &SettlementEngine::account_id(), amount)
    .expect("mint into strategy account");
}

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    SettlementEngine: pallet_settlement_engine,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<u128>;
  type DbWeight = RocksDbWeight;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = u128;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = u128;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = polkadot_sdk::frame_support::traits::AsEnsureOriginWithArg<
    frame_system::EnsureSigned<Self::AccountId>,
  >;
  type ForceOrigin = EnsureRoot<Self::AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  type ApprovalDeposit = ConstU128<1>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type ReserveData = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = AssetBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct AssetBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl polkadot_sdk::pallet_assets::BenchmarkHelper<u32, ()> for AssetBenchmarkHelper {
  fn create_asset_id_parameter(id: u32) -> u32 {
    id
  }
  fn create_reserve_id_parameter(_id: u32) -> () {
    ()
  }
}

pub struct MockClaimsLedger;
impl pallet_settlement_engine::ClaimsLedger<u64, u128> for MockClaimsLedger {
  fn claimable_balance(holder: &u64) -> u128 {
    unhashed::get_or_default(&ledger_key(CLAIMABLE_PREFIX, holder))
  }

  fn unexchanged_balance(holder: &u64) -> u128 {
    unhashed::get_or_default(&ledger_key(UNEXCHANGED_PREFIX, holder))
  }

  fn claim(holder: &u64, amount: u128) -> Result<u128, DispatchError> {
    let claimable = Self::claimable_balance(holder);
    if amount > claimable {
      return Err(DispatchError::Other("Claim exceeds claimable balance"));
    }
    unhashed::put(&ledger_key(CLAIMABLE_PREFIX, holder), &(claimable - amount));
    <Assets as Mutate<u64>>::mint_into(UNDERLYING_ASSET_ID, holder, amount)?;
    Ok(amount)
  }
}

pub struct MockPriceOracle;
impl pallet_settlement_engine::PriceOracle<u32, u128> for MockPriceOracle {
  fn get_price(oracle: &u32, asset_a: AssetKind, asset_b: AssetKind) -> Option<u128> {
    if (asset_a, asset_b) != (UNDERLYING, BASE) {
      return None;
    }
    ORACLES.with(|o| o.borrow().get(oracle).map(|(rate, _)| *rate))
  }

  fn last_update_timestamp(oracle: &u32) -> Option<u64> {
    ORACLES.with(|o| o.borrow().get(oracle).map(|(_, updated_at)| *updated_at))
  }
}

pub struct MockExchange;
impl pallet_settlement_engine::Exchange<u64, u128> for MockExchange {
  fn swap(
    who: &u64,
    amount_in: u128,
    min_out: u128,
    route: &[AssetKind],
    recipient: &u64,
    deadline: u64,
  ) -> Result<u128, DispatchError> {
    LAST_SWAP.with(|s| {
      *s.borrow_mut() = Some(SwapCall {
        amount_in,
        min_out,
        route: route.to_vec(),
        deadline,
      })
    });
    let mode = EXCHANGE_MODE.with(|m| *m.borrow());
    if mode == ExchangeMode::Reverts {
      return Err(DispatchError::Other("Exchange reverted"));
    }
    if deadline < now() {
      return Err(DispatchError::Other("Deadline passed"));
    }
    let (Some(id_in), Some(id_out)) = (
      route.first().and_then(|a| a.local_id()),
      route.last().and_then(|a| a.local_id()),
    ) else {
      return Err(DispatchError::Other("Unsupported route"));
    };

    <Assets as Mutate<u64>>::burn_from(
      id_in,
      who,
      amount_in,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    if mode == ExchangeMode::FailsAfterDebit {
      return Err(DispatchError::Other("Exchange failed mid-execution"));
    }

    let rate = EXCHANGE_RATE.with(|r| *r.borrow());
    let amount_out = amount_in.saturating_mul(rate) / ORACLE_SCALE;
    if amount_out < min_out {
      return Err(DispatchError::Other("Slippage exceeded"));
    }
    <Assets as Mutate<u64>>::mint_into(id_out, recipient, amount_out)?;
    Ok(amount_out)
  }
}

pub struct MockTime;
impl UnixTime for MockTime {
  fn now() -> core::time::Duration {
    core::time::Duration::from_secs(now())
  }
}

pub struct PalletIdStub;
impl Get<PalletId> for PalletIdStub {
  fn get() -> PalletId {
    PalletId(*SETTLEMENT_ENGINE_PALLET_ID)
  }
}

pub struct BaseAssetStub;
impl Get<AssetKind> for BaseAssetStub {
  fn get() -> AssetKind {
    BASE
  }
}

pub struct UnderlyingAssetStub;
impl Get<AssetKind> for UnderlyingAssetStub {
  fn get() -> AssetKind {
    UNDERLYING
  }
}

ord_parameter_types! {
  pub const Operator: u64 = OPERATOR;
}

impl pallet_settlement_engine::Config for Test {
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = SettlementEngineBenchmarkHelper;
  type Assets = Assets;
  type Currency = Balances;
  type ClaimsLedger = MockClaimsLedger;
  type OracleId = u32;
  type PriceOracle = MockPriceOracle;
  type Exchange = MockExchange;
  type Time = MockTime;
  type PalletId = PalletIdStub;
  type BaseAsset = BaseAssetStub;
  type UnderlyingAsset = UnderlyingAssetStub;
  type DefaultMaxPriceAge = ConstU64<{ DEFAULT_MAX_PRICE_AGE_SECS }>;
  type DefaultMaxSlippageBps = ConstU16<{ DEFAULT_MAX_SLIPPAGE_BPS }>;
  type DefaultMinReserveRatioBps = ConstU16<{ DEFAULT_MIN_RESERVE_RATIO_BPS }>;
  type DefaultAutoClaimThreshold = ConstU128<{ DEFAULT_AUTO_CLAIM_THRESHOLD }>;
  type MaxPriceAgeCeiling = ConstU64<{ MAX_PRICE_AGE_CEILING_SECS }>;
  type SwapDeadline = ConstU64<{ SWAP_DEADLINE_SECS }>;
  type ReportInterval = ConstU64<10>;
  type MaxRouteHops = ConstU32<{ MAX_ROUTE_HOPS }>;
  type AdminOrigin = EnsureRoot<u64>;
  type OperatorOrigin = EnsureSignedBy<Operator, u64>;
  type EmergencyOrigin = EnsureRoot<u64>;
  type WeightInfo = ();
}

#[cfg(feature = "runtime-benchmarks")]
pub struct SettlementEngineBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<u64, u32> for SettlementEngineBenchmarkHelper {
  fn seed_claimable(holder: &u64, amount: u128) -> polkadot_sdk::sp_runtime::DispatchResult {
    unhashed::put(&ledger_key(CLAIMABLE_PREFIX, holder), &amount);
    Ok(())
  }

  fn seed_oracle(rate: u128) -> u32 {
    set_oracle_reading(ORACLE_ID, rate, now());
    ORACLE_ID
  }

  fn seed_exchange(rate: u128) {
    set_exchange_mode(ExchangeMode::Healthy);
    set_exchange_rate(rate);
  }
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_assets::GenesisConfig::<Test> {
    // Base and underlying, both sufficient with min_bal 1
    assets: alloc::vec![
      (BASE_ASSET_ID, ASSET_OWNER, true, 1),
      (UNDERLYING_ASSET_ID, ASSET_OWNER, true, 1),
    ],
    metadata: alloc::vec![],
    accounts: alloc::vec![],
    reserves: alloc::vec![],
    next_asset_id: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  pallet_settlement_engine::GenesisConfig::<Test>::default()
    .assimilate_storage(&mut t)
    .unwrap();

  // Reset State
  NOW.with(|n| *n.borrow_mut() = GENESIS_TIME);
  ORACLES.with(|o| o.borrow_mut().clear());
  EXCHANGE_RATE.with(|r| *r.borrow_mut() = ORACLE_SCALE);
  EXCHANGE_MODE.with(|m| *m.borrow_mut() = ExchangeMode::Healthy);
  LAST_SWAP.with(|s| *s.borrow_mut() = None);

  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| System::set_block_number(1));
  ext
}
