//! # Audio Decoders
//!
//! - [`CallbackDecoder`] adapts a callback-style backend onto
//!   [`AudioDecodeBackend`](bridge_traits::AudioDecodeBackend)
//! - [`SymphoniaBackend`] decodes in-process (feature `decoder-symphonia`)

pub mod callback;
#[cfg(feature = "decoder-symphonia")]
pub mod symphonia;

pub use callback::CallbackDecoder;
#[cfg(feature = "decoder-symphonia")]
pub use self::symphonia::SymphoniaBackend;
