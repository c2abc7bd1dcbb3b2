#![no_std]
#![deny(missing_docs)]
//! # onewire-bus
//! A no-std implementation of the 1-Wire bus protocol layer.
//!
//! This crate provides a trait-based interface for 1-Wire communication, independent of the
//! transport carrying the bus signalling.
//! [OneWire] defines the basic operations required for 1-Wire communication, such as resetting the
//! bus, writing and reading bytes, and writing and reading bits, plus the composite ROM addressing
//! sequences built on top of them. An asynchronous version of the trait, [OneWireAsync], is
//! provided for use in async environments.
//!
//! The crate also provides the ROM search algorithm for discovering devices on the 1-Wire bus,
//! implemented in the [OneWireSearch] and [OneWireSearchAsync] structs, the Dallas CRC-8 used to
//! guard ROM and scratchpad transfers ([OneWireCrc]), and the [BusMutex] guard serializing
//! multi-step bus transactions across concurrent callers.

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod consts;
mod error;
mod mutex;
mod search;
mod search_async;
mod traits;
mod traits_async;
mod utils;

pub use consts::*;
pub use error::OneWireError;
#[cfg(feature = "std")]
pub use mutex::StdBusMutex;
pub use mutex::{BusMutex, NoopMutex};
pub use search::{OneWireSearch, OneWireSearchKind};
pub use search_async::OneWireSearchAsync;
pub use traits::{OneWire, OneWireStatus};
pub use traits_async::OneWireAsync;
pub use utils::OneWireCrc;

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;
