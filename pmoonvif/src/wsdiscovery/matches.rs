//! Décodage des réponses ProbeMatches du dialecte générique
//!
//! Les scopes sont des chaînes libres de la forme
//! `onvif://www.onvif.org/<marqueur>/<valeur>` ; les marqueurs `name`,
//! `hardware`, `location` et `mac` sont exploités heuristiquement pour
//! enrichir les métadonnées du device. Transformations pures : le décodage
//! ne touche aucun état partagé.

use std::io::BufReader;

use tracing::trace;
use url::Url;
use xmltree::Element;

/// Une réponse ProbeMatch décodée
#[derive(Debug, Clone, Default)]
pub struct ProbeMatch {
    /// Adresses candidates `host[:port]`, une par URL de la liste XAddrs
    pub addresses: Vec<String>,

    /// Qualificatifs de type rapportés par le device
    pub types: Vec<String>,

    /// Scopes bruts, pour extraction de métadonnées
    pub scopes: Vec<String>,
}

/// Métadonnées extraites des scopes d'un ProbeMatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMetadata {
    pub name: Option<String>,
    pub hardware: Option<String>,
    pub location: Option<String>,
    pub mac: Option<String>,
}

fn child_by_local_name<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| {
        node.as_element()
            .filter(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
    })
}

/// Réduit une URL de service en adresse `host[:port]`.
fn address_of(xaddr: &str) -> Option<String> {
    let url = Url::parse(xaddr).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Décode un document ProbeMatches reçu pendant la fenêtre d'écoute.
///
/// Un datagramme illisible est ignoré (`None`), jamais fatal : les
/// réponses exploitables des autres devices restent valables.
pub fn parse_probe_matches(xml: &str) -> Option<Vec<ProbeMatch>> {
    let root = match Element::parse(BufReader::new(xml.as_bytes())) {
        Ok(root) => root,
        Err(err) => {
            trace!("unparseable probe response: {}", err);
            return None;
        }
    };
    if !root.name.ends_with("Envelope") {
        trace!("probe response without Envelope root: {}", root.name);
        return None;
    }

    let body = child_by_local_name(&root, "Body")?;
    let probe_matches = child_by_local_name(body, "ProbeMatches")?;

    let mut matches = Vec::new();
    for node in &probe_matches.children {
        let Some(elem) = node.as_element() else {
            continue;
        };
        if !elem.name.ends_with("ProbeMatch") {
            continue;
        }

        let mut probe_match = ProbeMatch::default();

        if let Some(xaddrs) = child_by_local_name(elem, "XAddrs") {
            let text = xaddrs.get_text().unwrap_or_default();
            probe_match.addresses = text
                .split_whitespace()
                .filter_map(address_of)
                .collect();
        }
        if let Some(types) = child_by_local_name(elem, "Types") {
            let text = types.get_text().unwrap_or_default();
            probe_match.types = text.split_whitespace().map(str::to_string).collect();
        }
        if let Some(scopes) = child_by_local_name(elem, "Scopes") {
            let text = scopes.get_text().unwrap_or_default();
            probe_match.scopes = text.split_whitespace().map(str::to_string).collect();
        }

        matches.push(probe_match);
    }

    Some(matches)
}

/// Dernier segment de chemin suivant `/<marker>/` dans un scope.
fn scope_field(scope: &str, marker: &str) -> Option<String> {
    let needle = format!("/{}/", marker);
    let idx = scope.find(&needle)?;
    let tail = &scope[idx + needle.len()..];
    tail.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Extrait les métadonnées descriptives d'une liste de scopes.
///
/// Premier scope porteur gagne pour chaque champ.
pub fn extract_scope_metadata(scopes: &[String]) -> ScopeMetadata {
    let mut meta = ScopeMetadata::default();
    for scope in scopes {
        if meta.name.is_none() {
            meta.name = scope_field(scope, "name");
        }
        if meta.hardware.is_none() {
            meta.hardware = scope_field(scope, "hardware");
        }
        if meta.location.is_none() {
            meta.location = scope_field(scope, "location");
        }
        if meta.mac.is_none() {
            meta.mac = scope_field(scope, "mac");
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_MATCHES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"
                   xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery"
                   xmlns:dn="http://www.onvif.org/ver10/network/wsdl">
  <SOAP-ENV:Body>
    <d:ProbeMatches>
      <d:ProbeMatch>
        <d:Types>dn:NetworkVideoTransmitter</d:Types>
        <d:Scopes>onvif://www.onvif.org/type/video_encoder onvif://www.onvif.org/name/IPC-123 onvif://www.onvif.org/hardware/DS-2CD2T47 onvif://www.onvif.org/location/city/hangzhou</d:Scopes>
        <d:XAddrs>http://192.168.1.64/onvif/device_service http://[fe80::1]/onvif/device_service</d:XAddrs>
      </d:ProbeMatch>
    </d:ProbeMatches>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

    #[test]
    fn test_parse_probe_matches_extracts_every_address() {
        let matches = parse_probe_matches(PROBE_MATCHES).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].addresses.len(), 2);
        assert_eq!(matches[0].addresses[0], "192.168.1.64");
        assert_eq!(matches[0].types, vec!["dn:NetworkVideoTransmitter"]);
    }

    #[test]
    fn test_address_keeps_explicit_port() {
        assert_eq!(
            address_of("http://10.0.0.5:8080/onvif/device_service"),
            Some("10.0.0.5:8080".to_string())
        );
        assert_eq!(
            address_of("http://10.0.0.5/onvif/device_service"),
            Some("10.0.0.5".to_string())
        );
    }

    #[test]
    fn test_scope_metadata_extraction() {
        let matches = parse_probe_matches(PROBE_MATCHES).unwrap();
        let meta = extract_scope_metadata(&matches[0].scopes);

        assert_eq!(meta.name.as_deref(), Some("IPC-123"));
        assert_eq!(meta.hardware.as_deref(), Some("DS-2CD2T47"));
        // marqueur à segments multiples : seul le dernier segment compte
        assert_eq!(meta.location.as_deref(), Some("hangzhou"));
        assert_eq!(meta.mac, None);
    }

    #[test]
    fn test_scope_field_ignores_trailing_slash() {
        assert_eq!(
            scope_field("onvif://www.onvif.org/name/Cam/", "name"),
            Some("Cam".to_string())
        );
        assert_eq!(scope_field("onvif://www.onvif.org/name/", "name"), None);
    }

    #[test]
    fn test_garbage_datagram_is_ignored() {
        assert!(parse_probe_matches("not xml at all").is_none());
        assert!(parse_probe_matches("<Probe/>").is_none());
    }

    #[test]
    fn test_envelope_without_matches_yields_empty_list() {
        let xml = r#"<Envelope><Body><ProbeMatches/></Body></Envelope>"#;
        let matches = parse_probe_matches(xml).unwrap();
        assert!(matches.is_empty());
    }
}
