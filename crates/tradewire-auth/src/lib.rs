//! Credentials, nonces, clock skew correction and request signing
//!
//! This crate provides the authentication pieces every private venue call
//! goes through: a secrecy-protected [`Credentials`] set, a
//! [`VenueClock`] corrected by the venue's server time, a strictly
//! increasing [`NonceGenerator`], and the five [`SignScheme`]s venues use.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tradewire_auth::{
//!     Credentials, Digest, FormScheme, NonceGenerator, Placement, SignInput, SignScheme,
//!     SystemClock, VenueClock,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let creds = Credentials::from_env("BINANCE")?;
//!     let clock = VenueClock::new(Arc::new(SystemClock));
//!     let nonces = NonceGenerator::new();
//!
//!     let scheme = SignScheme::Form(FormScheme {
//!         digest: Digest::Sha256,
//!         key: Placement::Header("X-MBX-APIKEY"),
//!         nonce_field: "timestamp",
//!         signature: Placement::Field("signature"),
//!         extra_params: &[("recvWindow", "60000")],
//!         sorted: false,
//!     });
//!     let nonce = nonces.next_millis(&clock);
//!     let signed = scheme.sign(&creds, SignInput::new("GET", "/api/v3/account", nonce, clock.now_millis()))?;
//!     println!("{} params", signed.params.len());
//!     Ok(())
//! }
//! ```

mod clock;
mod credentials;
mod error;
mod signer;

#[cfg(any(test, feature = "test-utils"))]
pub use clock::FixedClock;
pub use clock::{Clock, NonceGenerator, SystemClock, VenueClock};
pub use credentials::Credentials;
pub use error::{AuthError, AuthResult};
pub use signer::{
    encode_params, ClientIdScheme, Digest, FormScheme, PassphraseMode, PathScheme, PayloadScheme,
    Placement, PrehashScheme, SignInput, SignScheme, SignedRequest, TimestampFormat,
};
