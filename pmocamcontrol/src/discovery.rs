//! Découverte des devices sur une interface réseau
//!
//! Une entrée unique pour les deux dialectes de sonde : chaque dialecte
//! fait son cycle envoi / écoute / collecte, les candidats sont fusionnés
//! et dédupliqués par adresse (premier vu gagne, doublons inter-dialectes
//! compris), puis chaque adresse survivante subit un contrôle de vivacité
//! par échange de capacités. Un candidat qui n'y répond pas est écarté en
//! silence : un résultat de découverte partiel est la norme, pas une
//! exception.
//!
//! Un appel couvre UNE interface ; sonder plusieurs interfaces en
//! parallèle est du ressort de l'appelant.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use pmoonvif::wsdiscovery::{
    self, CancelToken, DiscoveryError, InquiryMatch, ProbeMatch, build_inquiry_probe,
    build_probe_message, extract_scope_metadata, parse_inquiry_match, parse_probe_matches,
    send_probe_multicast,
};

use crate::device::{Device, DeviceParams};
use crate::errors::CameraControlError;
use crate::model::{DeviceInfo, DeviceType, DiscoveredCandidate};

const NETWORK_WSDL: &str = "http://www.onvif.org/ver10/network/wsdl";

/// Options d'un cycle de découverte
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Fenêtre d'écoute de chaque dialecte (échéance dure)
    pub window: Duration,

    /// Classe de device sollicitée par le dialecte générique
    pub device_type: DeviceType,

    /// Filtres de scope transmis dans la sonde générique
    pub scopes: Vec<String>,

    /// Jeton d'annulation honoré entre deux lectures socket
    pub cancel: Option<CancelToken>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            window: wsdiscovery::DEFAULT_LISTEN_WINDOW,
            device_type: DeviceType::NetworkVideoTransmitter,
            scopes: Vec::new(),
            cancel: None,
        }
    }
}

/// Sonde les deux dialectes et rend les candidats dédupliqués, sans
/// contrôle de vivacité.
pub fn probe_interface(
    interface_name: &str,
    opts: &ProbeOptions,
) -> Result<Vec<DiscoveredCandidate>, CameraControlError> {
    // Dialecte générique : réponses unicast vers le port source (0 = choisi
    // par l'OS).
    let payload = build_probe_message(
        &Uuid::new_v4().to_string(),
        &opts.scopes,
        &[opts.device_type.qualifier()],
        &HashMap::from([("dn", NETWORK_WSDL)]),
    )?;

    let raw = send_probe_multicast(
        &payload,
        interface_name,
        wsdiscovery::WS_DISCOVERY_PORT,
        0,
        opts.window,
        opts.cancel.as_ref(),
    )?;
    let ws_matches: Vec<ProbeMatch> = raw
        .iter()
        .filter_map(|response| parse_probe_matches(response))
        .flatten()
        .collect();

    // Dialecte propriétaire : port fixe dans les deux sens. Source
    // d'enrichissement secondaire : son échec socket (port déjà pris) ne
    // condamne pas le cycle, seule l'annulation remonte.
    let inquiry_payload = build_inquiry_probe(&Uuid::new_v4().to_string());
    let inquiry_matches: Vec<InquiryMatch> = match send_probe_multicast(
        &inquiry_payload,
        interface_name,
        wsdiscovery::INQUIRY_PORT,
        wsdiscovery::INQUIRY_PORT,
        opts.window,
        opts.cancel.as_ref(),
    ) {
        Ok(raw) => raw
            .iter()
            .filter_map(|response| parse_inquiry_match(response))
            .collect(),
        Err(DiscoveryError::Cancelled) => return Err(CameraControlError::Cancelled),
        Err(err) => {
            warn!("inquiry probe failed on {}: {}", interface_name, err);
            Vec::new()
        }
    };

    Ok(merge_candidates(ws_matches, inquiry_matches))
}

/// Fusionne les réponses des deux dialectes en candidats uniques.
///
/// Déduplication par adresse réseau uniquement, jamais par identité
/// déclarée : deux candidats de même adresse ne coexistent pas, le premier
/// vu gagne. Le dialecte générique passe en premier.
fn merge_candidates(
    ws_matches: Vec<ProbeMatch>,
    inquiry_matches: Vec<InquiryMatch>,
) -> Vec<DiscoveredCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for probe_match in ws_matches {
        let meta = extract_scope_metadata(&probe_match.scopes);
        for address in &probe_match.addresses {
            if !seen.insert(address.clone()) {
                debug!("duplicate candidate {} dropped", address);
                continue;
            }
            let mut info = DeviceInfo::default();
            info.merge_scope_metadata(&meta);
            candidates.push(DiscoveredCandidate {
                address: address.clone(),
                // sollicité par filtre de type : le match fait foi
                type_matched: true,
                scopes: probe_match.scopes.clone(),
                info,
            });
        }
    }

    for inquiry in inquiry_matches {
        let Some(address) = inquiry.ipv4.clone() else {
            continue;
        };
        if !seen.insert(address.clone()) {
            debug!("duplicate candidate {} dropped (inquiry)", address);
            continue;
        }
        let mut info = DeviceInfo::default();
        info.merge_inquiry(&inquiry);
        candidates.push(DiscoveredCandidate {
            address,
            type_matched: false,
            scopes: Vec::new(),
            info,
        });
    }

    candidates
}

/// Découverte complète sur une interface : sonde, déduplique, contrôle la
/// vivacité de chaque candidat et rend les sessions prêtes à l'emploi.
///
/// Les échecs par candidat (pas de réponse au protocole de contrôle,
/// réponse indécodable) sont journalisés puis contenus : ils n'échouent
/// jamais l'appel global.
pub fn discover_interface(
    interface_name: &str,
    opts: &ProbeOptions,
) -> Result<Vec<Device>, CameraControlError> {
    let candidates = probe_interface(interface_name, opts)?;
    info!(
        "🔎 {} candidate(s) on {} before liveness check",
        candidates.len(),
        interface_name
    );

    let mut devices = Vec::new();
    for candidate in candidates {
        let device = Device::new(DeviceParams {
            xaddr: candidate.address.clone(),
            ..DeviceParams::default()
        });

        match device.inspect() {
            Ok(_) => {
                device.merge_info(|info| {
                    let discovered = candidate.info.clone();
                    if info.name.is_none() {
                        info.name = discovered.name;
                    }
                    if info.hardware_id.is_none() {
                        info.hardware_id = discovered.hardware_id;
                    }
                    if info.location.is_none() {
                        info.location = discovered.location;
                    }
                    if info.mac.is_none() {
                        info.mac = discovered.mac;
                    }
                    if info.model.is_none() {
                        info.model = discovered.model;
                    }
                    if info.serial_number.is_none() {
                        info.serial_number = discovered.serial_number;
                    }
                    if info.firmware_version.is_none() {
                        info.firmware_version = discovered.firmware_version;
                    }
                });
                devices.push(device);
            }
            Err(err) => {
                // contenu : le reste du résultat reste valable
                warn!("dropping {}: {}", candidate.address, err);
            }
        }
    }

    info!(
        "✅ discovery on {}: {} device(s)",
        interface_name,
        devices.len()
    );
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws_match(addresses: &[&str], scopes: &[&str]) -> ProbeMatch {
        ProbeMatch {
            addresses: addresses.iter().map(|s| s.to_string()).collect(),
            types: vec!["dn:NetworkVideoTransmitter".to_string()],
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn inquiry(ipv4: &str) -> InquiryMatch {
        InquiryMatch {
            description: Some("DS-2CD2T47G1-L".to_string()),
            serial: Some("SN-1".to_string()),
            mac: Some("44:19:b6:43:a2:5f".to_string()),
            firmware: Some("V5.5.83".to_string()),
            ipv4: Some(ipv4.to_string()),
        }
    }

    #[test]
    fn test_cross_dialect_duplicates_collapse_to_one() {
        let merged = merge_candidates(
            vec![ws_match(&["192.168.1.64"], &[])],
            vec![inquiry("192.168.1.64")],
        );

        assert_eq!(merged.len(), 1);
        // premier vu gagne : l'entrée vient du dialecte générique
        assert!(merged[0].type_matched);
    }

    #[test]
    fn test_distinct_addresses_both_survive() {
        let merged = merge_candidates(
            vec![ws_match(&["192.168.1.64"], &[])],
            vec![inquiry("192.168.1.65")],
        );

        assert_eq!(merged.len(), 2);
        assert!(merged[0].type_matched);
        assert!(!merged[1].type_matched);
        assert_eq!(merged[1].info.model.as_deref(), Some("DS-2CD2T47G1-L"));
    }

    #[test]
    fn test_duplicate_within_dialect_first_seen_wins() {
        let merged = merge_candidates(
            vec![
                ws_match(&["192.168.1.64"], &["onvif://www.onvif.org/name/First"]),
                ws_match(&["192.168.1.64"], &["onvif://www.onvif.org/name/Second"]),
            ],
            vec![],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].info.name.as_deref(), Some("First"));
    }

    #[test]
    fn test_scope_metadata_lands_on_candidate() {
        let merged = merge_candidates(
            vec![ws_match(
                &["192.168.1.64"],
                &[
                    "onvif://www.onvif.org/name/IPC-123",
                    "onvif://www.onvif.org/hardware/DS-2CD2T47",
                ],
            )],
            vec![],
        );

        assert_eq!(merged[0].info.name.as_deref(), Some("IPC-123"));
        assert_eq!(merged[0].info.hardware_id.as_deref(), Some("DS-2CD2T47"));
    }

    #[test]
    fn test_zero_responses_merge_to_empty() {
        assert!(merge_candidates(vec![], vec![]).is_empty());
    }
}
