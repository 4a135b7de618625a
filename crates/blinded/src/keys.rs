//! Key material for the CRT blinded-comparison scheme.
//!
//! Six pairwise-coprime moduli `p, q, r, s, t, w` and a blinding integer `u`.
//! The first two moduli form the public 2-modulus system used for comparison
//! tickets; all six form the system used by `encrypt6`/`decrypt6`.

use std::fmt;

use contracts::KeyConfig;
use rug::{Complete, Integer};

use crate::arithmetic::{FEATURE_SCALE, G_MAX, MAX_COMPARISON_SCALE, R1_MAX, R2_MAX};
use crate::CryptoError;

/// Deployed constants, decimal
pub const DEFAULT_P: &str = "234406548094233827948571379965547188853";
pub const DEFAULT_Q: &str = "583457592311129510314141861330330044443";
pub const DEFAULT_R: &str = "696522972436164062959242838052087531431";
pub const DEFAULT_S: &str = "374670603170509799404699393785831797599";
pub const DEFAULT_T: &str = "443137959904584298054176676987615849169";
pub const DEFAULT_W: &str = "391475886865055383118586393345880578361";
pub const DEFAULT_U: &str = "2355788435550222327802749264573303139783";

const MODULUS_NAMES: [&str; 6] = ["p", "q", "r", "s", "t", "w"];

/// CRT system over a set of moduli: `x = sum(r_i * coeff_i) mod n`
#[derive(Clone)]
pub(crate) struct CrtSystem {
    pub(crate) moduli: Vec<Integer>,
    pub(crate) coeffs: Vec<Integer>,
    pub(crate) n: Integer,
    pub(crate) half_n: Integer,
}

impl CrtSystem {
    fn new(moduli: &[Integer]) -> Result<Self, CryptoError> {
        let n = moduli.iter().fold(Integer::from(1), |acc, m| acc * m);
        let mut coeffs = Vec::with_capacity(moduli.len());
        for m in moduli {
            let partial = (&n / m).complete();
            let inverse = partial
                .clone()
                .invert(m)
                .map_err(|_| CryptoError::key_material(format!("no inverse of N/{m} mod {m}")))?;
            coeffs.push(partial * inverse);
        }
        let half_n = (&n >> 1u32).complete();
        Ok(Self {
            moduli: moduli.to_vec(),
            coeffs,
            n,
            half_n,
        })
    }

    /// Combine residues into the representative in `(-n/2, n/2]`
    pub(crate) fn combine_centered(&self, residues: &[Integer]) -> Integer {
        let mut acc = Integer::new();
        for (r, c) in residues.iter().zip(&self.coeffs) {
            acc += (r * c).complete();
        }
        let x = acc.rem_euc(&self.n);
        if x > self.half_n {
            x - &self.n
        } else {
            x
        }
    }
}

/// Public part handed to the untrusted computer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicModuli {
    pub p: Integer,
    pub q: Integer,
}

impl PublicModuli {
    #[inline]
    pub fn as_array(&self) -> [&Integer; 2] {
        [&self.p, &self.q]
    }
}

/// Full key set held by the capture device and the key holder
#[derive(Clone)]
pub struct KeyMaterial {
    public: PublicModuli,
    u: Integer,
    half_u: Integer,
    /// `bits(u) / 2`, the comparison cut-off
    gu: u32,
    six: CrtSystem,
    two: CrtSystem,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("n1_bits", &self.six.n.significant_bits())
            .field("n2_bits", &self.two.n.significant_bits())
            .field("u_bits", &self.u.significant_bits())
            .finish()
    }
}

impl KeyMaterial {
    /// Build from the six moduli `[p, q, r, s, t, w]` and the blinding integer.
    ///
    /// # Errors
    /// `KeyMaterial` when a constant is below 2 or two moduli share a factor.
    pub fn new(moduli: [Integer; 6], u: Integer) -> Result<Self, CryptoError> {
        for (name, m) in MODULUS_NAMES.iter().zip(&moduli) {
            if *m < 2 {
                return Err(CryptoError::key_material(format!("{name} must be > 1")));
            }
        }
        if u < 2 {
            return Err(CryptoError::key_material("u must be > 1"));
        }
        for i in 0..moduli.len() {
            for j in (i + 1)..moduli.len() {
                let g = moduli[i].gcd_ref(&moduli[j]).complete();
                if g != 1 {
                    return Err(CryptoError::key_material(format!(
                        "{} and {} are not coprime",
                        MODULUS_NAMES[i], MODULUS_NAMES[j]
                    )));
                }
            }
        }

        let six = CrtSystem::new(&moduli)?;
        let two = CrtSystem::new(&moduli[..2])?;
        let [p, q, ..] = moduli;
        let half_u = (&u >> 1u32).complete();
        let gu = u.significant_bits() / 2;

        Ok(Self {
            public: PublicModuli { p, q },
            u,
            half_u,
            gu,
            six,
            two,
        })
    }

    /// Parse decimal strings in the order `p, q, r, s, t, w, u`
    pub fn from_decimal(values: [&str; 7]) -> Result<Self, CryptoError> {
        let names = ["p", "q", "r", "s", "t", "w", "u"];
        let mut parsed = Vec::with_capacity(7);
        for (name, text) in names.iter().zip(values) {
            let value = text.trim().parse::<Integer>().map_err(|e| {
                CryptoError::key_material(format!("{name} is not a decimal integer: {e}"))
            })?;
            parsed.push(value);
        }
        let u = parsed.pop().unwrap_or_default();
        let moduli: [Integer; 6] = parsed
            .try_into()
            .map_err(|_| CryptoError::key_material("expected six moduli"))?;
        Self::new(moduli, u)
    }

    /// The constants shipped with the capture devices
    pub fn deployed() -> Result<Self, CryptoError> {
        Self::from_decimal([
            DEFAULT_P, DEFAULT_Q, DEFAULT_R, DEFAULT_S, DEFAULT_T, DEFAULT_W, DEFAULT_U,
        ])
    }

    /// Keys from configuration, deployed constants when no override is present
    pub fn from_config(config: Option<&KeyConfig>) -> Result<Self, CryptoError> {
        match config {
            Some(keys) => {
                let [p, q, r, s, t, w, u] = keys.entries().map(|(_, value)| value);
                Self::from_decimal([p, q, r, s, t, w, u])
            }
            None => Self::deployed(),
        }
    }

    #[inline]
    pub fn public(&self) -> &PublicModuli {
        &self.public
    }

    #[inline]
    pub fn u(&self) -> &Integer {
        &self.u
    }

    #[inline]
    pub fn gu(&self) -> u32 {
        self.gu
    }

    #[inline]
    pub fn n1(&self) -> &Integer {
        &self.six.n
    }

    #[inline]
    pub fn n2(&self) -> &Integer {
        &self.two.n
    }

    pub(crate) fn half_u(&self) -> &Integer {
        &self.half_u
    }

    pub(crate) fn six(&self) -> &CrtSystem {
        &self.six
    }

    pub(crate) fn two(&self) -> &CrtSystem {
        &self.two
    }

    /// Check that features up to `max_feature_value` compare correctly.
    ///
    /// Three bounds, all with the largest blinding factors:
    /// - the blinded difference stays below `2^(gu - 1)` after reduction mod `u`
    /// - a full ticket value stays below `N2 / 2`
    /// - a 6-modulus ciphertext value stays below `N1 / 2`
    pub fn validate_headroom(&self, max_feature_value: f64) -> Result<(), CryptoError> {
        if !(max_feature_value.is_finite() && max_feature_value > 0.0) {
            return Err(CryptoError::headroom(format!(
                "max_feature_value must be positive, got {max_feature_value}"
            )));
        }
        if self.gu < 2 {
            return Err(CryptoError::headroom("u is too small"));
        }

        let scaled = (max_feature_value * FEATURE_SCALE as f64).ceil();
        if scaled >= u64::MAX as f64 {
            return Err(CryptoError::headroom(format!(
                "max_feature_value {max_feature_value} is out of range"
            )));
        }
        let m_max = Integer::from(scaled as u64);
        let blind = Integer::from(2 * R1_MAX + R2_MAX);
        let two_scale = 2 * MAX_COMPARISON_SCALE;

        let diff_max = (&m_max * two_scale).complete() * &blind;
        let cut = Integer::from(1) << (self.gu - 1);
        if diff_max >= cut {
            return Err(CryptoError::headroom(format!(
                "blinded difference needs {} bits, u allows {}",
                diff_max.significant_bits(),
                self.gu - 1
            )));
        }

        let plain_max = (&self.u * G_MAX).complete() + &m_max;
        let ticket_max = (&plain_max * two_scale).complete() * &blind;
        if ticket_max >= self.two.half_n {
            return Err(CryptoError::headroom(format!(
                "ticket value needs {} bits, N2 allows {}",
                ticket_max.significant_bits(),
                self.two.half_n.significant_bits()
            )));
        }
        if plain_max >= self.six.half_n {
            return Err(CryptoError::headroom(format!(
                "ciphertext value needs {} bits, N1 allows {}",
                plain_max.significant_bits(),
                self.six.half_n.significant_bits()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_keys() -> KeyMaterial {
        KeyMaterial::from_decimal(["11", "13", "17", "19", "23", "29", "31"]).unwrap()
    }

    #[test]
    fn test_deployed_keys_load() {
        let keys = KeyMaterial::deployed().unwrap();
        assert_eq!(keys.u().significant_bits(), 131);
        assert_eq!(keys.gu(), 65);
        assert!(keys.n2().significant_bits() > 250);
        assert!(keys.n1().significant_bits() > 760);
    }

    #[test]
    fn test_deployed_keys_have_headroom() {
        let keys = KeyMaterial::deployed().unwrap();
        assert!(keys.validate_headroom(10_000.0).is_ok());
    }

    #[test]
    fn test_small_keys_lack_headroom() {
        let err = small_keys().validate_headroom(10_000.0).unwrap_err();
        assert!(matches!(err, CryptoError::Headroom { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_huge_feature_range_rejected() {
        let keys = KeyMaterial::deployed().unwrap();
        assert!(keys.validate_headroom(1e30).is_err());
        assert!(keys.validate_headroom(0.0).is_err());
        assert!(keys.validate_headroom(f64::NAN).is_err());
    }

    #[test]
    fn test_crt_coefficients_recover_residues() {
        let keys = KeyMaterial::deployed().unwrap();
        let x = Integer::from(123_456_789u64);
        let residues: Vec<Integer> = keys
            .six()
            .moduli
            .iter()
            .map(|m| x.rem_euc_ref(m).complete())
            .collect();
        assert_eq!(keys.six().combine_centered(&residues), x);

        let neg = Integer::from(-42);
        let residues: Vec<Integer> = keys
            .two()
            .moduli
            .iter()
            .map(|m| neg.rem_euc_ref(m).complete())
            .collect();
        assert_eq!(keys.two().combine_centered(&residues), neg);
    }

    #[test]
    fn test_shared_factor_rejected() {
        let err = KeyMaterial::from_decimal(["11", "22", "17", "19", "23", "29", "31"]).unwrap_err();
        assert!(err.to_string().contains("not coprime"));
    }

    #[test]
    fn test_unparsable_constant_rejected() {
        let err = KeyMaterial::from_decimal(["11", "13", "x", "19", "23", "29", "31"]).unwrap_err();
        assert!(err.to_string().contains("r is not a decimal integer"));
    }

    #[test]
    fn test_config_override() {
        let config = KeyConfig {
            p: "11".into(),
            q: "13".into(),
            r: "17".into(),
            s: "19".into(),
            t: "23".into(),
            w: "29".into(),
            u: "31".into(),
        };
        let keys = KeyMaterial::from_config(Some(&config)).unwrap();
        assert_eq!(*keys.n2(), 143);
        assert_eq!(keys.public().p, 11);
    }
}
