//! Construction du payload Probe du dialecte générique
//!
//! La sonde est une enveloppe SOAP adressée (Action / MessageID / ReplyTo /
//! To) dont le Body porte l'élément Probe avec ses qualificatifs Types et
//! Scopes optionnels.

use std::collections::HashMap;

use xmltree::{Element, XMLNode};

use crate::soap::{EnvelopeError, SoapEnvelope};

const WSD_NS: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery";
const WSA_2004_NS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
const PROBE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe";
const DISCOVERY_TO: &str = "urn:schemas-xmlsoap-org:ws:2005:04:discovery";
const ANONYMOUS_ROLE: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

/// Construit la sonde multicast générique.
///
/// `message_id` est un identifiant frais (UUID v4) propre à ce cycle ;
/// `types` porte le qualificatif de classe de device (ex:
/// `dn:NetworkVideoTransmitter`) et `namespaces` les préfixes que ces
/// qualificatifs référencent (ex: `dn` →
/// `http://www.onvif.org/ver10/network/wsdl`).
pub fn build_probe_message(
    message_id: &str,
    scopes: &[String],
    types: &[String],
    namespaces: &HashMap<&str, &str>,
) -> Result<String, EnvelopeError> {
    let mut envelope = SoapEnvelope::new();
    envelope.add_root_namespace("a", WSA_2004_NS);
    envelope.add_root_namespace("d", WSD_NS);
    envelope.add_root_namespaces(namespaces);

    let mut action = text_element("a:Action", PROBE_ACTION);
    action
        .attributes
        .insert("mustUnderstand".to_string(), "1".to_string());
    envelope.add_header(action);

    envelope.add_header(text_element("a:MessageID", &format!("uuid:{}", message_id)));

    let mut reply_to = Element::new("a:ReplyTo");
    reply_to
        .children
        .push(XMLNode::Element(text_element("a:Address", ANONYMOUS_ROLE)));
    envelope.add_header(reply_to);

    let mut to = text_element("a:To", DISCOVERY_TO);
    to.attributes
        .insert("mustUnderstand".to_string(), "1".to_string());
    envelope.add_header(to);

    let mut probe = Element::new("d:Probe");
    if !types.is_empty() {
        probe
            .children
            .push(XMLNode::Element(text_element("d:Types", &types.join(" "))));
    }
    if !scopes.is_empty() {
        probe.children.push(XMLNode::Element(text_element(
            "d:Scopes",
            &scopes.join(" "),
        )));
    }
    envelope.set_body(probe);

    envelope.to_xml()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_carries_addressing_header() {
        let xml = build_probe_message(
            "78a2ed98-bc1f-4b08-9668-094fcba81e35",
            &[],
            &["dn:NetworkVideoTransmitter".to_string()],
            &HashMap::from([("dn", "http://www.onvif.org/ver10/network/wsdl")]),
        )
        .unwrap();

        assert!(xml.contains(PROBE_ACTION));
        assert!(xml.contains("uuid:78a2ed98-bc1f-4b08-9668-094fcba81e35"));
        assert!(xml.contains(DISCOVERY_TO));
        assert!(xml.contains(ANONYMOUS_ROLE));
    }

    #[test]
    fn test_probe_carries_types_and_namespace() {
        let xml = build_probe_message(
            "x",
            &[],
            &["dn:NetworkVideoTransmitter".to_string()],
            &HashMap::from([("dn", "http://www.onvif.org/ver10/network/wsdl")]),
        )
        .unwrap();

        assert!(xml.contains("<d:Types>dn:NetworkVideoTransmitter</d:Types>"));
        assert!(xml.contains("xmlns:dn=\"http://www.onvif.org/ver10/network/wsdl\""));
    }

    #[test]
    fn test_probe_scopes_are_space_joined() {
        let xml = build_probe_message(
            "x",
            &[
                "onvif://www.onvif.org/name".to_string(),
                "onvif://www.onvif.org/location".to_string(),
            ],
            &[],
            &HashMap::new(),
        )
        .unwrap();

        assert!(
            xml.contains("onvif://www.onvif.org/name onvif://www.onvif.org/location"),
            "scopes must be joined by a single space"
        );
        assert!(!xml.contains("<d:Types>"));
    }
}
