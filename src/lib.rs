//! Client-side synchronization for the college campaign program: typed access
//! to factory and campaign accounts, a fail-atomic snapshot store, and view
//! projections over it.

use anchor_lang::prelude::*;

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod instructions;
pub mod model;
pub mod state;
pub mod store;
pub mod utils;
pub mod view;

pub use client::{ChainClient, RpcChainClient};
pub use error::{ErrorKind, GatewayError};
pub use gateway::{Gateway, ProgramGateway};
pub use store::{ReconcilePolicy, Snapshot, SyncState, SyncStore};

declare_id!("8VfeCYnGkCbdFZw2wJFBjoCQPEzbouscmx25VKvWo5DL");

pub type Result<T, E = GatewayError> = core::result::Result<T, E>;
