//! Modèle de données côté session
//!
//! Les champs descriptifs sont tous optionnels : ils se remplissent au
//! mieux, depuis la requête d'information explicite ou depuis les
//! métadonnées de découverte, et l'absence est un état valide.

use std::fmt;

use serde::{Deserialize, Serialize};

use pmoonvif::wsdiscovery::{InquiryMatch, ScopeMetadata};

/// Métadonnées descriptives d'un device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub mac: Option<String>,
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

impl DeviceInfo {
    /// Enrichit depuis les scopes du dialecte générique. Les champs déjà
    /// renseignés gardent leur valeur.
    pub fn merge_scope_metadata(&mut self, meta: &ScopeMetadata) {
        fill(&mut self.name, &meta.name);
        fill(&mut self.hardware_id, &meta.hardware);
        fill(&mut self.location, &meta.location);
        fill(&mut self.mac, &meta.mac);
    }

    /// Enrichit depuis une réponse du dialecte propriétaire.
    pub fn merge_inquiry(&mut self, inquiry: &InquiryMatch) {
        fill(&mut self.model, &inquiry.description);
        fill(&mut self.serial_number, &inquiry.serial);
        fill(&mut self.firmware_version, &inquiry.firmware);
        fill(&mut self.mac, &inquiry.mac);
    }
}

/// Classe de device interrogée par la sonde générique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    NetworkVideoDisplay,
    NetworkVideoStorage,
    NetworkVideoAnalytics,
    NetworkVideoTransmitter,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::NetworkVideoDisplay => "NetworkVideoDisplay",
            DeviceType::NetworkVideoStorage => "NetworkVideoStorage",
            DeviceType::NetworkVideoAnalytics => "NetworkVideoAnalytics",
            DeviceType::NetworkVideoTransmitter => "NetworkVideoTransmitter",
        };
        f.write_str(name)
    }
}

impl DeviceType {
    /// Qualificatif tel qu'il apparaît dans l'élément Types de la sonde.
    pub fn qualifier(&self) -> String {
        format!("dn:{}", self)
    }
}

/// Candidat produit par un cycle de découverte, avant le contrôle de
/// vivacité. Transitoire : consommé immédiatement en [`crate::Device`].
#[derive(Debug, Clone)]
pub struct DiscoveredCandidate {
    /// Adresse `host[:port]` utilisée pour joindre le device
    pub address: String,

    /// La réponse provient-elle d'une sonde filtrée par type ?
    pub type_matched: bool,

    /// Scopes bruts du dialecte générique (vide pour le propriétaire)
    pub scopes: Vec<String>,

    /// Métadonnées déjà extraites des réponses de sonde
    pub info: DeviceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_does_not_overwrite() {
        let mut info = DeviceInfo {
            name: Some("configured".to_string()),
            ..DeviceInfo::default()
        };
        let meta = ScopeMetadata {
            name: Some("from-scope".to_string()),
            hardware: Some("HW-1".to_string()),
            ..ScopeMetadata::default()
        };

        info.merge_scope_metadata(&meta);
        assert_eq!(info.name.as_deref(), Some("configured"));
        assert_eq!(info.hardware_id.as_deref(), Some("HW-1"));
    }

    #[test]
    fn test_inquiry_fields_land_in_info() {
        let mut info = DeviceInfo::default();
        info.merge_inquiry(&InquiryMatch {
            description: Some("DS-2CD2T47G1-L".to_string()),
            serial: Some("SN-1".to_string()),
            firmware: Some("V5.5.83".to_string()),
            mac: Some("44:19:b6:43:a2:5f".to_string()),
            ipv4: Some("192.168.1.64".to_string()),
        });

        assert_eq!(info.model.as_deref(), Some("DS-2CD2T47G1-L"));
        assert_eq!(info.serial_number.as_deref(), Some("SN-1"));
        assert_eq!(info.firmware_version.as_deref(), Some("V5.5.83"));
        assert_eq!(info.mac.as_deref(), Some("44:19:b6:43:a2:5f"));
    }

    #[test]
    fn test_device_type_qualifier() {
        assert_eq!(
            DeviceType::NetworkVideoTransmitter.qualifier(),
            "dn:NetworkVideoTransmitter"
        );
    }
}
