//! # tessera-pool
//!
//! Fair admission control for shared database resources.
//!
//! A [`PoolGovernor`] meters access to one pooled resource with a slot
//! semaphore and an optional *turnstile*: an auxiliary semaphore that gives
//! writers priority over readers. Writer governors hold the turnstile for
//! the lifetime of their permit; reader governors touch it on the way in,
//! so readers never block one another but always queue behind a writer.
//!
//! Saturation (an acquire timing out) surfaces as
//! [`PoolError::Saturated`] carrying the governor's opaque hash, and
//! [`PoolGovernor::wait_for_drain_async`] resolves when the governor goes
//! fully idle, with a publish path that cannot be fooled by a release
//! immediately followed by a fresh acquire.

pub mod error;
pub mod governor;

pub use error::PoolError;
pub use governor::{PoolGovernor, PoolGovernorConfig, PoolPermit};
