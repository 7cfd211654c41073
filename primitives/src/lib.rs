//! Primitive types and constants shared by the settlement engine and its mocks.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod assets;
pub mod ecosystem;

pub use assets::*;
pub use ecosystem::*;
