//! Dialecte de sonde propriétaire « inquiry »
//!
//! Document plat, sans enveloppe ni namespace, émis et reçu sur le port
//! 37020. Les réponses sont une liste de champs à plat ; ce dialecte ne
//! connaît ni types ni scopes et ne sert que de source d'enrichissement
//! secondaire.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::trace;

/// Payload de sonde du dialecte propriétaire.
pub fn build_inquiry_probe(uuid: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><Probe><Uuid>{}</Uuid><Types>inquiry</Types></Probe>"#,
        uuid
    )
}

/// Réponse « inquiry » décodée
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryMatch {
    /// Libellé du modèle (champ DeviceDescription)
    pub description: Option<String>,

    /// Numéro de série (champ DeviceSN)
    pub serial: Option<String>,

    /// Adresse MAC normalisée en notation `aa:bb:cc:dd:ee:ff`
    pub mac: Option<String>,

    /// Version logicielle (champ SoftwareVersion)
    pub firmware: Option<String>,

    /// Adresse IPv4 déclarée par le device
    pub ipv4: Option<String>,
}

/// Ramène les séparateurs MAC propriétaires à la notation deux-points.
pub fn normalize_mac(raw: &str) -> String {
    raw.trim().replace('-', ":")
}

/// Décode une réponse du dialecte propriétaire.
///
/// Un datagramme illisible ou sans adresse IPv4 exploitable est ignoré
/// (`None`) ; il ne fait jamais échouer le cycle de découverte.
pub fn parse_inquiry_match(xml: &str) -> Option<InquiryMatch> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = InquiryMatch::default();
    let mut current_tag: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_tag = Some(String::from_utf8_lossy(e.name().as_ref()).to_string());
            }
            Ok(Event::End(_)) => {
                current_tag = None;
            }
            Ok(Event::Text(e)) => {
                if let Some(tag) = &current_tag {
                    let text = match e.decode() {
                        Ok(text) => text.into_owned(),
                        Err(err) => {
                            trace!("undecodable inquiry field {}: {}", tag, err);
                            continue;
                        }
                    };

                    match tag.as_str() {
                        "DeviceDescription" => parsed.description = Some(text),
                        "DeviceSN" => parsed.serial = Some(text),
                        "MAC" => parsed.mac = Some(normalize_mac(&text)),
                        "SoftwareVersion" => parsed.firmware = Some(text),
                        "IPv4Address" => parsed.ipv4 = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                trace!("unparseable inquiry response: {}", err);
                return None;
            }
        }
    }

    if parsed == InquiryMatch::default() {
        // Datagramme plat mais sans aucun champ connu (ex: écho de notre
        // propre sonde).
        return None;
    }
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INQUIRY_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ProbeMatch>
  <Uuid>6a1ddc39-ee0d-44ff-bbb2-27f401fc3a5e</Uuid>
  <Types>inquiry</Types>
  <DeviceType>131329</DeviceType>
  <DeviceDescription>DS-2CD2T47G1-L</DeviceDescription>
  <DeviceSN>DS-2CD2T47G1-L20190120AAWR</DeviceSN>
  <CommandPort>8000</CommandPort>
  <MAC>44-19-b6-43-a2-5f</MAC>
  <IPv4Address>192.168.1.64</IPv4Address>
  <SoftwareVersion>V5.5.83 build 190120</SoftwareVersion>
</ProbeMatch>"#;

    #[test]
    fn test_parse_inquiry_response() {
        let parsed = parse_inquiry_match(INQUIRY_RESPONSE).unwrap();

        assert_eq!(parsed.description.as_deref(), Some("DS-2CD2T47G1-L"));
        assert_eq!(parsed.serial.as_deref(), Some("DS-2CD2T47G1-L20190120AAWR"));
        assert_eq!(parsed.mac.as_deref(), Some("44:19:b6:43:a2:5f"));
        assert_eq!(parsed.firmware.as_deref(), Some("V5.5.83 build 190120"));
        assert_eq!(parsed.ipv4.as_deref(), Some("192.168.1.64"));
    }

    #[test]
    fn test_probe_payload_shape() {
        let payload = build_inquiry_probe("6a1ddc39-ee0d-44ff-bbb2-27f401fc3a5e");
        assert!(payload.starts_with("<?xml"));
        assert!(payload.contains("<Uuid>6a1ddc39-ee0d-44ff-bbb2-27f401fc3a5e</Uuid>"));
        assert!(payload.contains("<Types>inquiry</Types>"));
    }

    #[test]
    fn test_own_probe_echo_is_ignored() {
        let echo = build_inquiry_probe("6a1ddc39-ee0d-44ff-bbb2-27f401fc3a5e");
        assert!(parse_inquiry_match(&echo).is_none());
    }

    #[test]
    fn test_mac_already_normalized_is_untouched() {
        assert_eq!(normalize_mac("44:19:b6:43:a2:5f"), "44:19:b6:43:a2:5f");
    }
}
