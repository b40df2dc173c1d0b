#![doc = include_str!("../README.md")]
pub mod abi;
pub mod chain;
pub mod ecc;
mod error;
pub mod name;
pub mod registry;
mod serialize;
pub mod types;
pub mod value;

pub use self::{error::*, serialize::*};

// Reexport for ease of use.
pub use byteorder::WriteBytesExt;

/// Derive macro to derive [serde::Deserialize] instances.
pub use serde::Deserialize as SerdeDeserialize;
/// Derive macro to derive [serde::Serialize] instances.
pub use serde::Serialize as SerdeSerialize;

pub use eosio_codec_derive::*;

// This is here so that we can use the _derive crate inside this crate as well.
// It allows the generated code to refer to eosio_codec::
#[doc(hidden)]
extern crate self as eosio_codec;
