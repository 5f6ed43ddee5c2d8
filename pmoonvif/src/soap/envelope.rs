//! Construction et décomposition d'enveloppes SOAP
//!
//! Le squelette est construit une fois (Envelope + Header + Body + les deux
//! namespaces fixes de la syntaxe SOAP), puis chaque opération y substitue
//! son propre payload. Un seul payload par enveloppe : un second appel à
//! [`SoapEnvelope::set_body`] remplace le précédent. Les blocs d'en-tête,
//! eux, s'ajoutent les uns aux autres.

use std::collections::HashMap;
use std::io::BufReader;

use thiserror::Error;
use xmltree::{Element, EmitterConfig, XMLNode};

use super::{SOAP_ENCODING_NS, SOAP_ENVELOPE_NS, WSA_NS};

const ENVELOPE_TAG: &str = "soap-env:Envelope";
const HEADER_TAG: &str = "soap-env:Header";
const BODY_TAG: &str = "soap-env:Body";

/// Erreur de construction ou de décomposition d'enveloppe
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Write(#[from] xmltree::Error),

    #[error("serialized envelope is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("missing SOAP Envelope root")]
    MissingEnvelope,

    #[error("missing SOAP Body")]
    MissingBody,

    #[error("SOAP Body carries no payload")]
    EmptyBody,
}

/// Enveloppe SOAP en cours de construction
///
/// État mutable, vivant le temps d'une requête. Jamais partagée entre
/// appels.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    root: Element,
}

impl SoapEnvelope {
    /// Crée le squelette minimal : Envelope, Header, Body et les deux
    /// déclarations de namespace de la syntaxe SOAP elle-même.
    pub fn new() -> Self {
        let mut root = Element::new(ENVELOPE_TAG);
        root.attributes
            .insert("xmlns:soap-env".to_string(), SOAP_ENVELOPE_NS.to_string());
        root.attributes
            .insert("xmlns:soap-enc".to_string(), SOAP_ENCODING_NS.to_string());

        root.children
            .push(XMLNode::Element(Element::new(HEADER_TAG)));
        root.children.push(XMLNode::Element(Element::new(BODY_TAG)));

        Self { root }
    }

    /// Déclare un namespace supplémentaire sur la racine.
    pub fn add_root_namespace(&mut self, prefix: &str, uri: &str) {
        self.root
            .attributes
            .insert(format!("xmlns:{}", prefix), uri.to_string());
    }

    /// Déclare toute une table de namespaces sur la racine.
    ///
    /// Les préfixes sont insérés par ordre alphabétique pour que la
    /// sérialisation soit stable d'un appel à l'autre.
    pub fn add_root_namespaces(&mut self, namespaces: &HashMap<&str, &str>) {
        let mut pairs: Vec<(&str, &str)> = namespaces.iter().map(|(p, u)| (*p, *u)).collect();
        pairs.sort();
        for (prefix, uri) in pairs {
            self.add_root_namespace(prefix, uri);
        }
    }

    fn section_mut(&mut self, tag: &str) -> &mut Element {
        // Le squelette est construit par new(), les deux sections existent
        // toujours.
        self.root
            .get_mut_child(tag)
            .expect("envelope skeleton has Header and Body")
    }

    /// Insère le payload comme unique enfant du Body.
    ///
    /// Un second appel remplace le payload précédent.
    pub fn set_body(&mut self, content: Element) {
        let body = self.section_mut(BODY_TAG);
        body.children.clear();
        body.children.push(XMLNode::Element(content));
    }

    /// Ajoute un bloc d'en-tête sous Header, à la suite des blocs déjà
    /// présents.
    pub fn add_header(&mut self, content: Element) {
        self.section_mut(HEADER_TAG)
            .children
            .push(XMLNode::Element(content));
    }

    /// Ajoute l'en-tête d'adressage `wsa:To` portant l'URI du service visé.
    pub fn add_to(&mut self, uri: &str) {
        let mut to = Element::new("wsa:To");
        to.attributes
            .insert("xmlns:wsa".to_string(), WSA_NS.to_string());
        to.children.push(XMLNode::Text(uri.to_string()));
        self.add_header(to);
    }

    /// Sérialise l'enveloppe complète, déclaration XML incluse.
    pub fn to_xml(&self) -> Result<String, EnvelopeError> {
        let mut buf = Vec::new();
        let config = EmitterConfig::new()
            .write_document_declaration(true)
            .perform_indent(true)
            .indent_string("  ");
        self.root.write_with_config(&mut buf, config)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl Default for SoapEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

/// Retrouve un enfant par nom local, avec ou sans préfixe littéral.
fn child_by_local_name<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.get_child(name).or_else(|| {
        parent.children.iter().find_map(|node| {
            node.as_element()
                .filter(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
        })
    })
}

/// Extrait le payload du Body d'une réponse SOAP reçue.
///
/// Un document Fault n'est pas validé ici : il est rendu tel quel comme
/// payload ordinaire et doit être reconnu par l'appelant (voir
/// [`super::looks_like_fault`]).
pub fn extract_body(xml: &[u8]) -> Result<String, EnvelopeError> {
    let root = Element::parse(BufReader::new(xml))?;

    if !root.name.ends_with("Envelope") {
        return Err(EnvelopeError::MissingEnvelope);
    }

    let body = child_by_local_name(&root, "Body").ok_or(EnvelopeError::MissingBody)?;

    let payload = body
        .children
        .iter()
        .find_map(|node| node.as_element())
        .ok_or(EnvelopeError::EmptyBody)?;

    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(false)
        .perform_indent(true)
        .indent_string("  ");
    payload.write_with_config(&mut buf, config)?;
    Ok(String::from_utf8(buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, text: &str) -> Element {
        let mut elem = Element::new(name);
        elem.children.push(XMLNode::Text(text.to_string()));
        elem
    }

    #[test]
    fn test_skeleton_has_header_body_and_fixed_namespaces() {
        let xml = SoapEnvelope::new().to_xml().unwrap();

        assert!(xml.contains("<soap-env:Envelope"));
        assert!(xml.contains("soap-env:Header"));
        assert!(xml.contains("soap-env:Body"));
        assert!(xml.contains(&format!("xmlns:soap-env=\"{}\"", SOAP_ENVELOPE_NS)));
        assert!(xml.contains(&format!("xmlns:soap-enc=\"{}\"", SOAP_ENCODING_NS)));
    }

    #[test]
    fn test_set_body_then_extract_body_round_trips() {
        let mut envelope = SoapEnvelope::new();
        envelope.set_body(payload("GetCapabilities", "All"));

        let xml = envelope.to_xml().unwrap();
        let extracted = extract_body(xml.as_bytes()).unwrap();

        let reparsed = Element::parse(BufReader::new(extracted.as_bytes())).unwrap();
        assert_eq!(reparsed.name, "GetCapabilities");
        assert_eq!(reparsed.get_text().unwrap(), "All");
    }

    #[test]
    fn test_set_body_twice_replaces() {
        let mut envelope = SoapEnvelope::new();
        envelope.set_body(Element::new("First"));
        envelope.set_body(Element::new("Second"));

        let xml = envelope.to_xml().unwrap();
        assert!(!xml.contains("First"));
        assert!(xml.contains("Second"));
    }

    #[test]
    fn test_add_header_appends() {
        let mut envelope = SoapEnvelope::new();
        envelope.add_header(Element::new("SecurityBlock"));
        envelope.add_to("http://10.0.0.5/onvif/device_service");

        let xml = envelope.to_xml().unwrap();
        let security_pos = xml.find("SecurityBlock").unwrap();
        let to_pos = xml.find("wsa:To").unwrap();
        assert!(security_pos < to_pos, "header blocks must accumulate in order");
        assert!(xml.contains("http://10.0.0.5/onvif/device_service"));
    }

    #[test]
    fn test_extract_body_missing_body_fails() {
        let xml = b"<Envelope><Header/></Envelope>";
        assert!(matches!(
            extract_body(xml),
            Err(EnvelopeError::MissingBody)
        ));
    }

    #[test]
    fn test_extract_body_empty_body_fails() {
        let xml = b"<Envelope><Body></Body></Envelope>";
        assert!(matches!(extract_body(xml), Err(EnvelopeError::EmptyBody)));
    }

    #[test]
    fn test_extract_body_not_an_envelope_fails() {
        let xml = b"<Probe><Uuid>x</Uuid></Probe>";
        assert!(matches!(
            extract_body(xml),
            Err(EnvelopeError::MissingEnvelope)
        ));
    }

    #[test]
    fn test_extract_body_handles_prefixed_response() {
        let xml = br#"<?xml version="1.0"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope">
  <SOAP-ENV:Body>
    <GetSystemDateAndTimeResponse>
      <SystemDateAndTime>ok</SystemDateAndTime>
    </GetSystemDateAndTimeResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

        let extracted = extract_body(xml).unwrap();
        assert!(extracted.contains("GetSystemDateAndTimeResponse"));
    }
}
