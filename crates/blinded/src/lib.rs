//! # Blinded
//!
//! Privacy-preserving pose classification with a CRT-based blinded
//! comparison. Only linear combinations and a sign test are supported.
//!
//! Roles:
//! - capture device: encrypts features with the full key set
//! - untrusted computer: builds comparison tickets from the public moduli
//! - key holder: decrypts the ticket signs and evaluates the pose circuit
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use blinded::{EncryptedClassifier, KeyMaterial};
//! use contracts::{PoseLabel, PoseMetrics};
//!
//! let keys = Arc::new(KeyMaterial::deployed().unwrap());
//! let classifier = EncryptedClassifier::new(keys, 10_000.0).unwrap();
//! let metrics = PoseMetrics {
//!     torso_angle: 88.0,
//!     thigh_uprightness: 70.0,
//!     thigh_length: 100.0,
//!     calf_length: 100.0,
//!     torso_height: 120.0,
//!     leg_length: 200.0,
//!     ..Default::default()
//! };
//! let verdict = classifier.classify(&metrics).unwrap();
//! assert_eq!(verdict.label, PoseLabel::LyingDown);
//! ```

mod arithmetic;
pub mod circuit;
mod error;
mod keys;
mod roles;

pub use arithmetic::{
    blinded_difference, decrypt6, decrypt_compare, encrypt2, encrypt6, Ciphertext2, Ciphertext6,
    ComparisonTicket, Operand, FEATURE_SCALE, G_MAX, G_MIN, MAX_COMPARISON_SCALE, R1_MAX, R1_MIN,
    R2_MAX, R2_MIN,
};
pub use error::CryptoError;
pub use keys::{
    KeyMaterial, PublicModuli, DEFAULT_P, DEFAULT_Q, DEFAULT_R, DEFAULT_S, DEFAULT_T, DEFAULT_U,
    DEFAULT_W,
};
pub use roles::{
    CaptureDevice, EncryptedClassifier, EncryptedFeatures, KeyHolder, KeyHolderVerdict, TicketSet,
    UntrustedComputer,
};
