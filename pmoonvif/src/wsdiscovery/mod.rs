//! # Module WS-Discovery - découverte multicast des devices
//!
//! Ce module implémente les deux dialectes de sonde incompatibles parlés
//! par les devices vidéo du marché, derrière un même cycle
//! envoi / écoute / collecte :
//!
//! - ✅ Dialecte générique : Probe WS-Discovery vers 239.255.255.250:3702,
//!   réponses ProbeMatches (XAddrs + Scopes) en unicast vers le port
//!   source de la sonde
//! - ✅ Dialecte propriétaire : document plat `<Probe><Uuid/><Types>inquiry`
//!   sur le port 37020 dans les deux sens
//!
//! La fenêtre d'écoute est une échéance dure, pas un timeout d'inactivité :
//! zéro réponse est un résultat vide valide, jamais une erreur.
//!
//! ## Architecture
//!
//! - [`client`] : cycle UDP multicast lié à une interface nommée
//! - [`probe`] : construction du payload Probe générique
//! - [`matches`] : décodage ProbeMatches + heuristiques de scopes
//! - [`inquiry`] : dialecte propriétaire plat

pub mod client;
pub mod inquiry;
pub mod matches;
pub mod probe;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

pub use client::send_probe_multicast;
pub use inquiry::{InquiryMatch, build_inquiry_probe, parse_inquiry_match};
pub use matches::{ProbeMatch, ScopeMetadata, extract_scope_metadata, parse_probe_matches};
pub use probe::build_probe_message;

/// Groupe multicast partagé par les deux dialectes
pub const MULTICAST_ADDR: &str = "239.255.255.250";

/// Port de destination du dialecte WS-Discovery générique
pub const WS_DISCOVERY_PORT: u16 = 3702;

/// Port unique (envoi et réception) du dialecte propriétaire
pub const INQUIRY_PORT: u16 = 37020;

/// Fenêtre d'écoute par défaut d'un cycle de sonde
pub const DEFAULT_LISTEN_WINDOW: std::time::Duration = std::time::Duration::from_secs(1);

pub(crate) const BUF_SIZE: usize = 8192;

/// Erreur du cycle de sonde multicast
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no IPv4 address on interface '{0}'")]
    InterfaceNotFound(String),

    #[error("probe cancelled")]
    Cancelled,

    #[error(transparent)]
    Envelope(#[from] crate::soap::EnvelopeError),
}

/// Jeton d'annulation honoré entre deux lectures socket.
///
/// Clonable et partageable entre threads : un appelant peut interrompre la
/// fenêtre d'écoute depuis un autre thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
