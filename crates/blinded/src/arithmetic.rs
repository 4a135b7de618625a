//! CRT encryption primitives and the blinded comparison.
//!
//! A plaintext `m` is hidden as `g*u + m` for a fresh random `g` and stored as
//! its residues. Linear combinations work residue-wise. The comparison ticket
//! `r2 + 2*r1*(x - y)` keeps the sign of `x - y`; after reduction mod `u` a
//! non-negative value stays short while a negative one wraps to nearly
//! `bits(u)` bits.

use rand::{CryptoRng, Rng};
use rug::{Complete, Integer};
use serde::{Deserialize, Serialize};

use crate::{CryptoError, KeyMaterial, PublicModuli};

/// Fixed-point factor applied to features before encryption
pub const FEATURE_SCALE: u32 = 100;
/// Largest multiplier applied to a ciphertext in a comparison
pub const MAX_COMPARISON_SCALE: u32 = 10;

/// `g` in `[G_MIN, G_MAX)`
pub const G_MIN: u64 = 1;
pub const G_MAX: u64 = 1 << 32;
/// `r1` in `[R1_MIN, R1_MAX)`
pub const R1_MIN: u64 = 1 << 21;
pub const R1_MAX: u64 = 1 << 22;
/// `r2` in `[R2_MIN, R2_MAX)`
pub const R2_MIN: u64 = 1;
pub const R2_MAX: u64 = 1 << 10;

/// Residue lists travel as decimal strings; the values exceed 128 bits
mod decimal {
    use rug::Integer;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        values: &[Integer],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| v.to_string_radix(10)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Integer>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| s.parse::<Integer>().map_err(D::Error::custom))
            .collect()
    }
}

/// Ciphertext over the public moduli `{p, q}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext2 {
    #[serde(with = "decimal")]
    residues: Vec<Integer>,
}

/// Ciphertext over all six moduli
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext6 {
    #[serde(with = "decimal")]
    residues: Vec<Integer>,
}

impl Ciphertext2 {
    #[inline]
    pub fn residues(&self) -> &[Integer] {
        &self.residues
    }

    /// Build from raw residues; shape is checked where the ciphertext is used
    pub fn from_residues(residues: Vec<Integer>) -> Self {
        Self { residues }
    }

    /// Ensure two residues, each reduced into `[0, modulus)`
    pub fn check(&self, name: &str, public: &PublicModuli) -> Result<(), CryptoError> {
        check_residues(name, &self.residues, &public.as_array())
    }
}

impl Ciphertext6 {
    #[inline]
    pub fn residues(&self) -> &[Integer] {
        &self.residues
    }

    pub fn from_residues(residues: Vec<Integer>) -> Self {
        Self { residues }
    }
}

fn check_residues(
    name: &str,
    residues: &[Integer],
    moduli: &[&Integer],
) -> Result<(), CryptoError> {
    if residues.len() != moduli.len() {
        return Err(CryptoError::invalid_ticket(
            name,
            format!("expected {} residues, got {}", moduli.len(), residues.len()),
        ));
    }
    for (residue, modulus) in residues.iter().zip(moduli) {
        if *residue < 0 || residue >= *modulus {
            return Err(CryptoError::invalid_ticket(name, "residue out of range"));
        }
    }
    Ok(())
}

/// A blinded difference over `{p, q}`, decrypted exactly once by the key holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonTicket(Ciphertext2);

impl ComparisonTicket {
    #[inline]
    pub fn ciphertext(&self) -> &Ciphertext2 {
        &self.0
    }

    pub fn from_ciphertext(ct: Ciphertext2) -> Self {
        Self(ct)
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// `scale * ct`
    Cipher { ct: &'a Ciphertext2, scale: u32 },
    /// Already in fixed-point units
    Constant(i64),
}

fn blinded_value<R: Rng + CryptoRng>(value: &Integer, u: &Integer, rng: &mut R) -> Integer {
    let g = rng.random_range(G_MIN..G_MAX);
    (u * g).complete() + value
}

/// Encrypt `m` over all six moduli
pub fn encrypt6<R: Rng + CryptoRng>(
    keys: &KeyMaterial,
    m: &Integer,
    rng: &mut R,
) -> Ciphertext6 {
    let value = blinded_value(m, keys.u(), rng);
    let residues = keys
        .six()
        .moduli
        .iter()
        .map(|modulus| value.rem_euc_ref(modulus).complete())
        .collect();
    Ciphertext6 { residues }
}

/// Encrypt `m` over the public moduli `{p, q}`
pub fn encrypt2<R: Rng + CryptoRng>(
    keys: &KeyMaterial,
    m: &Integer,
    rng: &mut R,
) -> Ciphertext2 {
    let value = blinded_value(m, keys.u(), rng);
    let residues = keys
        .public()
        .as_array()
        .iter()
        .map(|modulus| value.rem_euc_ref(modulus).complete())
        .collect();
    Ciphertext2 { residues }
}

/// Recover `m` from a 6-modulus ciphertext, re-centred into `(-u/2, u/2]`
pub fn decrypt6(keys: &KeyMaterial, ct: &Ciphertext6) -> Result<Integer, CryptoError> {
    let moduli: Vec<&Integer> = keys.six().moduli.iter().collect();
    check_residues("ciphertext6", &ct.residues, &moduli)?;

    let value = keys.six().combine_centered(&ct.residues);
    let m = value.rem_euc(keys.u());
    Ok(if m > *keys.half_u() { m - keys.u() } else { m })
}

/// Blinded difference `r2 + 2*r1*(scale_a*a - rhs)` residue-wise.
///
/// Uses only the public moduli. `r1`, `r2` are fresh per call.
pub fn blinded_difference<R: Rng + CryptoRng>(
    public: &PublicModuli,
    name: &str,
    a: &Ciphertext2,
    scale_a: u32,
    rhs: Operand<'_>,
    rng: &mut R,
) -> Result<ComparisonTicket, CryptoError> {
    a.check(name, public)?;
    if let Operand::Cipher { ct, .. } = rhs {
        ct.check(name, public)?;
    }

    let r1 = rng.random_range(R1_MIN..R1_MAX);
    let r2 = rng.random_range(R2_MIN..R2_MAX);

    let residues = public
        .as_array()
        .iter()
        .enumerate()
        .map(|(i, modulus)| {
            let mut diff = (&a.residues[i] * scale_a).complete();
            match rhs {
                Operand::Cipher { ct, scale } => diff -= (&ct.residues[i] * scale).complete(),
                Operand::Constant(c) => diff -= c,
            }
            diff *= 2 * r1;
            diff += r2;
            diff.rem_euc(*modulus)
        })
        .collect();

    Ok(ComparisonTicket(Ciphertext2 { residues }))
}

/// Decide the sign of a ticket: `true` when the blinded difference was
/// non-negative. Equal bit length to the cut-off resolves to `false`.
pub fn decrypt_compare(
    keys: &KeyMaterial,
    name: &str,
    ticket: ComparisonTicket,
) -> Result<bool, CryptoError> {
    let ComparisonTicket(ct) = ticket;
    ct.check(name, keys.public())?;

    let value = keys.two().combine_centered(&ct.residues);
    let reduced = value.rem_euc(keys.u());
    Ok(reduced.significant_bits() < keys.gu())
}
