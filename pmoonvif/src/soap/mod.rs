//! # Module SOAP - enveloppes de contrôle ONVIF
//!
//! Ce module implémente le support SOAP 1.2 côté client, permettant la
//! construction des requêtes de contrôle et la décomposition des réponses.
//!
//! ## Fonctionnalités
//!
//! - ✅ Squelette d'enveloppe (Header + Body + namespaces fixes)
//! - ✅ Injection d'un payload unique dans le Body (sémantique « replace »)
//! - ✅ Ajout de blocs d'en-tête successifs (sécurité, adressage)
//! - ✅ Extraction du payload d'une réponse reçue
//! - ✅ Reconnaissance des SOAP Faults côté appelant
//!
//! ## Example
//!
//! ```ignore
//! use pmoonvif::soap::SoapEnvelope;
//! use pmoonvif::ONVIF_NAMESPACES;
//! use xmltree::Element;
//!
//! let mut envelope = SoapEnvelope::new();
//! envelope.add_root_namespaces(&ONVIF_NAMESPACES);
//! envelope.set_body(Element::new("tds:GetCapabilities"));
//! let xml = envelope.to_xml().unwrap();
//! ```

mod envelope;
mod fault;
mod security;

pub use envelope::{EnvelopeError, SoapEnvelope, extract_body};
pub use fault::{SoapFault, looks_like_fault, parse_fault};
pub use security::{build_security_header, password_digest, security_header_with_nonce};

/// Namespace de l'enveloppe SOAP 1.2
pub const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Namespace d'encodage SOAP 1.2
pub const SOAP_ENCODING_NS: &str = "http://www.w3.org/2003/05/soap-encoding";

/// Namespace WS-Addressing utilisé par l'en-tête `wsa:To`
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";
