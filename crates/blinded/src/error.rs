//! Blinded-comparison errors
//!
//! `KeyMaterial` and `Headroom` are startup errors. `InvalidComparisonTicket`
//! fails one classification closed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key constants unusable (parse failure, non-coprime moduli, no inverse)
    #[error("key material error: {message}")]
    KeyMaterial { message: String },

    /// Keys too small for the configured feature range
    #[error("insufficient key headroom: {message}")]
    Headroom { message: String },

    /// Ticket or ciphertext missing or malformed
    #[error("invalid comparison ticket '{ticket}': {reason}")]
    InvalidComparisonTicket { ticket: String, reason: String },
}

impl CryptoError {
    pub fn key_material(message: impl Into<String>) -> Self {
        Self::KeyMaterial {
            message: message.into(),
        }
    }

    pub fn headroom(message: impl Into<String>) -> Self {
        Self::Headroom {
            message: message.into(),
        }
    }

    pub fn invalid_ticket(ticket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidComparisonTicket {
            ticket: ticket.into(),
            reason: reason.into(),
        }
    }

    /// Errors that mean the engine must not start
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::KeyMaterial { .. } | Self::Headroom { .. })
    }
}
