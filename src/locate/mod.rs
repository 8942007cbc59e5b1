//! Identifier → coordinate resolution.
//!
//! [`VariantLocator`] answers from the [`PositionCache`] first and sends
//! misses to a [`LookupService`], by default the NCBI Variation Services
//! `refsnp` endpoint. Transient failures are retried under a
//! [`RetryPolicy`]; request starts are spaced by a shared [`RateLimiter`].
//!
//! [`VariantLocator`]: locator::VariantLocator
//! [`PositionCache`]: crate::catalog::store::PositionCache
//! [`LookupService`]: client::LookupService
//! [`RetryPolicy`]: retry::RetryPolicy
//! [`RateLimiter`]: client::RateLimiter

pub mod client;
pub mod locator;
pub mod refsnp;
pub mod retry;

pub use client::{ClientConfig, LookupError, LookupService, NcbiVariationClient};
pub use locator::{LocateOutput, LocatorConfig, LocatorStats, VariantLocator};
