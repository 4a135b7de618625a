//! The three parties of blinded classification.
//!
//! - [`CaptureDevice`] encrypts the six features on the camera side
//! - [`UntrustedComputer`] turns them into comparison tickets, knowing only `{p, q}`
//! - [`KeyHolder`] decrypts the ticket signs and evaluates the pose circuit
//!
//! [`EncryptedClassifier`] chains them in-process.

use std::sync::Arc;

use contracts::{PoseLabel, PoseMetrics, PosePredicates};
use rand::{CryptoRng, Rng};
use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::arithmetic::{
    blinded_difference, decrypt_compare, encrypt2, Ciphertext2, ComparisonTicket, Operand,
    FEATURE_SCALE,
};
use crate::{circuit, CryptoError, KeyMaterial, PublicModuli};

/// Fixed-point thresholds (degrees * 100)
const T30: i64 = 3000;
const T40: i64 = 4000;
const T60: i64 = 6000;
const T80: i64 = 8000;

/// Ratio comparisons as integer scales: `10*thigh - 7*calf`, `10*torso - 5*leg`
const RATIO_SCALE: u32 = 10;
const THIGH_CALF_SCALE: u32 = 7;
const TORSO_LEG_SCALE: u32 = 5;

/// Encrypted feature vector sent by the capture device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFeatures {
    #[serde(rename = "Tra")]
    pub torso_angle: Ciphertext2,
    #[serde(rename = "Tha")]
    pub thigh_uprightness: Ciphertext2,
    #[serde(rename = "Thl")]
    pub thigh_length: Ciphertext2,
    #[serde(rename = "cl")]
    pub calf_length: Ciphertext2,
    #[serde(rename = "Trl")]
    pub torso_height: Ciphertext2,
    #[serde(rename = "ll")]
    pub leg_length: Ciphertext2,
}

/// Comparison tickets sent to the key holder.
///
/// Every entry is optional on the wire so a missing one surfaces as
/// `InvalidComparisonTicket` instead of a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSet {
    #[serde(rename = "T30", default, skip_serializing_if = "Option::is_none")]
    pub torso_30: Option<ComparisonTicket>,
    #[serde(rename = "T40", default, skip_serializing_if = "Option::is_none")]
    pub thigh_40: Option<ComparisonTicket>,
    #[serde(rename = "T80", default, skip_serializing_if = "Option::is_none")]
    pub torso_80: Option<ComparisonTicket>,
    #[serde(rename = "T60", default, skip_serializing_if = "Option::is_none")]
    pub thigh_60: Option<ComparisonTicket>,
    #[serde(rename = "TC", default, skip_serializing_if = "Option::is_none")]
    pub thigh_calf: Option<ComparisonTicket>,
    #[serde(rename = "TL", default, skip_serializing_if = "Option::is_none")]
    pub torso_leg: Option<ComparisonTicket>,
}

/// Key-holder answer, with the raw bits for audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHolderVerdict {
    pub label: PoseLabel,
    pub pose_code: u8,
    pub flags: PosePredicates,
}

/// `trunc(value * 100)`, refused beyond the validated magnitude
fn fixed_point(name: &str, value: f64, bound: &Integer) -> Result<Integer, CryptoError> {
    let scaled = (value * FEATURE_SCALE as f64).trunc();
    let fixed = Integer::from_f64(scaled)
        .ok_or_else(|| CryptoError::invalid_ticket(name, "non-finite feature"))?;
    if fixed.clone().abs() > *bound {
        return Err(CryptoError::invalid_ticket(
            name,
            format!("feature {value} exceeds the validated range"),
        ));
    }
    Ok(fixed)
}

/// Camera side: holds the full key set, sees plaintext features
#[derive(Debug, Clone)]
pub struct CaptureDevice {
    keys: Arc<KeyMaterial>,
    /// Largest fixed-point magnitude the headroom check covered
    bound: Integer,
}

impl CaptureDevice {
    /// # Errors
    /// `Headroom` when the keys cannot cover `max_feature_value`.
    pub fn new(keys: Arc<KeyMaterial>, max_feature_value: f64) -> Result<Self, CryptoError> {
        keys.validate_headroom(max_feature_value)?;
        let bound = Integer::from_f64((max_feature_value * FEATURE_SCALE as f64).ceil())
            .ok_or_else(|| CryptoError::headroom("max_feature_value is not finite"))?;
        Ok(Self { keys, bound })
    }

    /// Encrypt the six features.
    ///
    /// # Errors
    /// `InvalidComparisonTicket` naming the first feature outside the
    /// validated range; such a frame must fail closed.
    pub fn encrypt_features<R: Rng + CryptoRng>(
        &self,
        m: &PoseMetrics,
        rng: &mut R,
    ) -> Result<EncryptedFeatures, CryptoError> {
        let mut enc = |name: &str, value: f64| {
            fixed_point(name, value, &self.bound).map(|fixed| encrypt2(&self.keys, &fixed, rng))
        };
        Ok(EncryptedFeatures {
            torso_angle: enc("Tra", m.torso_angle)?,
            thigh_uprightness: enc("Tha", m.thigh_uprightness)?,
            thigh_length: enc("Thl", m.thigh_length)?,
            calf_length: enc("cl", m.calf_length)?,
            torso_height: enc("Trl", m.torso_height)?,
            leg_length: enc("ll", m.leg_length)?,
        })
    }
}

/// Analytics server side: only the public moduli
#[derive(Debug, Clone)]
pub struct UntrustedComputer {
    public: PublicModuli,
}

impl UntrustedComputer {
    pub fn new(public: PublicModuli) -> Self {
        Self { public }
    }

    /// Build the six tickets `T30, T40, T80, T60, TC, TL`
    pub fn build_tickets<R: Rng + CryptoRng>(
        &self,
        f: &EncryptedFeatures,
        rng: &mut R,
    ) -> Result<TicketSet, CryptoError> {
        let public = &self.public;
        let mut against = |name: &str, ct: &Ciphertext2, threshold: i64| {
            blinded_difference(public, name, ct, 1, Operand::Constant(threshold), rng)
        };
        let torso_30 = against("T30", &f.torso_angle, T30)?;
        let thigh_40 = against("T40", &f.thigh_uprightness, T40)?;
        let torso_80 = against("T80", &f.torso_angle, T80)?;
        let thigh_60 = against("T60", &f.thigh_uprightness, T60)?;

        let thigh_calf = blinded_difference(
            public,
            "TC",
            &f.thigh_length,
            RATIO_SCALE,
            Operand::Cipher {
                ct: &f.calf_length,
                scale: THIGH_CALF_SCALE,
            },
            rng,
        )?;
        let torso_leg = blinded_difference(
            public,
            "TL",
            &f.torso_height,
            RATIO_SCALE,
            Operand::Cipher {
                ct: &f.leg_length,
                scale: TORSO_LEG_SCALE,
            },
            rng,
        )?;

        Ok(TicketSet {
            torso_30: Some(torso_30),
            thigh_40: Some(thigh_40),
            torso_80: Some(torso_80),
            thigh_60: Some(thigh_60),
            thigh_calf: Some(thigh_calf),
            torso_leg: Some(torso_leg),
        })
    }
}

/// Holds the secret; never sees the features themselves
#[derive(Debug, Clone)]
pub struct KeyHolder {
    keys: Arc<KeyMaterial>,
}

impl KeyHolder {
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    fn decide(&self, name: &str, ticket: Option<ComparisonTicket>) -> Result<bool, CryptoError> {
        let ticket = ticket.ok_or_else(|| CryptoError::invalid_ticket(name, "missing"))?;
        decrypt_compare(&self.keys, name, ticket)
    }

    /// Consume the ticket set and evaluate the pose circuit
    pub fn evaluate(&self, tickets: TicketSet) -> Result<KeyHolderVerdict, CryptoError> {
        let flags = PosePredicates {
            torso_ge_30: self.decide("T30", tickets.torso_30)?,
            thigh_ge_40: self.decide("T40", tickets.thigh_40)?,
            torso_ge_80: self.decide("T80", tickets.torso_80)?,
            thigh_calf_ge_07: self.decide("TC", tickets.thigh_calf)?,
            torso_leg_ge_05: self.decide("TL", tickets.torso_leg)?,
            thigh_ge_60: self.decide("T60", tickets.thigh_60)?,
        };
        let pose_code = circuit::pose_code(&flags);
        Ok(KeyHolderVerdict {
            label: PoseLabel::from_code(pose_code),
            pose_code,
            flags,
        })
    }
}

/// All three roles wired together in one process
#[derive(Debug, Clone)]
pub struct EncryptedClassifier {
    device: CaptureDevice,
    computer: UntrustedComputer,
    holder: KeyHolder,
}

impl EncryptedClassifier {
    /// # Errors
    /// `Headroom` when the keys cannot cover `max_feature_value`.
    pub fn new(keys: Arc<KeyMaterial>, max_feature_value: f64) -> Result<Self, CryptoError> {
        Ok(Self {
            device: CaptureDevice::new(Arc::clone(&keys), max_feature_value)?,
            computer: UntrustedComputer::new(keys.public().clone()),
            holder: KeyHolder::new(keys),
        })
    }

    /// Classify with the thread-local CSPRNG
    pub fn classify(&self, m: &PoseMetrics) -> Result<KeyHolderVerdict, CryptoError> {
        self.classify_with_rng(m, &mut rand::rng())
    }

    pub fn classify_with_rng<R: Rng + CryptoRng>(
        &self,
        m: &PoseMetrics,
        rng: &mut R,
    ) -> Result<KeyHolderVerdict, CryptoError> {
        let result = self
            .device
            .encrypt_features(m, rng)
            .and_then(|features| self.computer.build_tickets(&features, rng))
            .and_then(|tickets| self.holder.evaluate(tickets));

        match &result {
            Ok(verdict) => debug!(label = %verdict.label, code = verdict.pose_code, "blinded pose"),
            Err(e) => warn!(error = %e, "blinded classification failed closed"),
        }
        result
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }

    pub fn computer(&self) -> &UntrustedComputer {
        &self.computer
    }

    pub fn holder(&self) -> &KeyHolder {
        &self.holder
    }
}
