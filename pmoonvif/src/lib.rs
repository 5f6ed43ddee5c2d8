//! # pmoonvif - Couche protocole ONVIF
//!
//! Ce crate implémente la partie « fil » du protocole ONVIF côté client :
//! enveloppes SOAP, en-tête d'authentification WS-Security et découverte
//! des devices par multicast UDP.
//!
//! ## Fonctionnalités
//!
//! - ✅ Construction d'enveloppes SOAP 1.2 (Header + Body + namespaces)
//! - ✅ Extraction du payload d'une réponse SOAP
//! - ✅ En-tête WS-Security UsernameToken avec PasswordDigest
//! - ✅ Sonde WS-Discovery (Probe / ProbeMatches) sur 239.255.255.250:3702
//! - ✅ Sonde propriétaire « inquiry » sur le port 37020
//!
//! ## Architecture
//!
//! - [`soap`] : enveloppes, sécurité, faults
//! - [`wsdiscovery`] : les deux dialectes de sonde multicast
//! - [`namespaces`] : table fixe des namespaces du schéma ONVIF

pub mod namespaces;
pub mod soap;
pub mod wsdiscovery;

pub use namespaces::ONVIF_NAMESPACES;
pub use soap::{EnvelopeError, SoapEnvelope, build_security_header, extract_body};
pub use wsdiscovery::{CancelToken, DiscoveryError, InquiryMatch, ProbeMatch};
