//! # pmocamcontrol - session de contrôle des devices vidéo ONVIF
//!
//! Couche session au-dessus de [`pmoonvif`] : possession des endpoints
//! résolus, des identifiants et du décalage d'horloge, appels d'opération
//! one-shot signés, et découverte des devices sur une interface réseau.
//!
//! ## Fonctionnalités
//!
//! - ✅ Session [`Device`] : « appelle l'opération, rends le payload »
//! - ✅ Résolution des services logiques (exacte puis floue)
//! - ✅ Réécriture NAT des URLs apprises vers l'adresse composée
//! - ✅ Synchronisation d'horloge préalable aux appels signés
//! - ✅ Découverte bi-dialecte avec déduplication et contrôle de vivacité
//!
//! Les catalogues d'opérations par service (media, PTZ, imaging...) ne
//! vivent pas ici : l'appelant fournit un payload typé et décode le
//! payload rendu.

mod capabilities;

pub mod device;
pub mod discovery;
pub mod errors;
pub mod model;
pub mod soap_client;

use std::time::Duration;

pub use device::{Device, DeviceParams, MethodCall};
pub use discovery::{ProbeOptions, discover_interface, probe_interface};
pub use errors::CameraControlError;
pub use model::{DeviceInfo, DeviceType, DiscoveredCandidate};
pub use soap_client::{SOAP_CONTENT_TYPE, SoapResponse, SoapTransport, UreqTransport};

pub use pmoonvif::wsdiscovery::CancelToken;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
