//! Venue adapters behind one `Exchange` contract
//!
//! Every adapter turns canonical calls into a venue's REST requests, signs
//! the private ones, and normalizes the responses into [`tradewire_types`]
//! values. Transport and time are injected through [`VenueConfig`], so the
//! same adapter runs against a live venue or a `MockHttpClient`.
//!
//! # Quick Start
//!
//! ```no_run
//! use tradewire_venues::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExchangeError> {
//!     let binance = connect(Venue::Binance, VenueConfig::new()).await?;
//!     let depth = binance.get_depth(10, &CurrencyPair::BTC_USDT).await?;
//!     println!("best bid {:?}", depth.best_bid());
//!
//!     // OKEx routes by product
//!     let okex = OKEx::connect(VenueConfig::new()).await?;
//!     let swap = CurrencyPair::BTC_USDT.with_product(ProductType::Swap);
//!     println!("swap last {}", okex.get_ticker(&swap).await?.last);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`exchange`] - The [`Exchange`] trait
//! - [`venues`] - One adapter per venue, plus the OKEx product facade
//! - [`registry`] - [`connect`] any [`Venue`] as `Box<dyn Exchange>`
//! - [`normalize`] - Column tables, depth tiers and envelope helpers shared by adapters

pub mod config;
pub mod context;
pub mod exchange;
pub mod metadata;
pub mod normalize;
pub mod prelude;
pub mod registry;
pub mod venue;
pub mod venues;

pub use config::VenueConfig;
pub use context::RestContext;
pub use exchange::Exchange;
pub use metadata::MetadataCache;
pub use registry::{connect, connect_all};
pub use venue::Venue;

#[cfg(feature = "test-utils")]
pub use tradewire_auth::FixedClock;
#[cfg(feature = "test-utils")]
pub use tradewire_http::MockHttpClient;
