//! Core types and the transfer orchestrator for the Tenure ownership registry.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RegistryStore`]; everything else
//! talks to a [`registry::Registry`] built on top of one.

// Native `async fn` in traits; the `Send` bounds live on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod error;
pub mod owner;
pub mod ownership;
pub mod portfolio;
pub mod proposal;
pub mod registry;
pub mod store;
pub mod transfer;
pub mod unit;
pub mod validator;

pub use error::{Entity, Error, Result};
pub use registry::{Registry, RegistryConfig};
