//! Reconnaissance des SOAP Faults côté client
//!
//! L'extraction du Body ne valide pas les Faults : un document Fault est
//! renvoyé comme payload ordinaire. C'est ici que l'appelant le reconnaît,
//! à partir du tag racine.

use std::io::BufReader;

use xmltree::Element;

/// Fault SOAP décodé d'un payload de réponse
#[derive(Debug, Clone)]
pub struct SoapFault {
    /// Code d'erreur (ex: "soap-env:Sender", "ter:NotAuthorized")
    pub code: String,

    /// Texte lisible rapporté par le device
    pub reason: String,
}

/// Le payload est-il un document Fault ?
pub fn looks_like_fault(payload: &str) -> bool {
    Element::parse(BufReader::new(payload.as_bytes()))
        .map(|root| root.name.ends_with("Fault"))
        .unwrap_or(false)
}

fn child_by_local_name<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| {
        node.as_element()
            .filter(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
    })
}

fn text_of(elem: &Element) -> String {
    elem.get_text().unwrap_or_default().trim().to_string()
}

/// Décode un payload Fault en code + raison.
///
/// Les deux générations de structure sont acceptées : SOAP 1.2
/// (`Code/Value` + `Reason/Text`) et SOAP 1.1 (`faultcode` +
/// `faultstring`). Retourne `None` si le payload n'est pas un Fault.
pub fn parse_fault(payload: &str) -> Option<SoapFault> {
    let root = Element::parse(BufReader::new(payload.as_bytes())).ok()?;
    if !root.name.ends_with("Fault") {
        return None;
    }

    // SOAP 1.2
    if let Some(code_elem) = child_by_local_name(&root, "Code") {
        let code = child_by_local_name(code_elem, "Value")
            .map(text_of)
            .unwrap_or_default();
        let reason = child_by_local_name(&root, "Reason")
            .and_then(|r| child_by_local_name(r, "Text"))
            .map(text_of)
            .unwrap_or_default();
        return Some(SoapFault { code, reason });
    }

    // SOAP 1.1
    let code = child_by_local_name(&root, "faultcode").map(text_of)?;
    let reason = child_by_local_name(&root, "faultstring")
        .map(text_of)
        .unwrap_or_default();
    Some(SoapFault { code, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAULT_12: &str = r#"<soap-env:Fault xmlns:soap-env="http://www.w3.org/2003/05/soap-envelope">
  <soap-env:Code>
    <soap-env:Value>soap-env:Sender</soap-env:Value>
  </soap-env:Code>
  <soap-env:Reason>
    <soap-env:Text xml:lang="en">Sender not authorized</soap-env:Text>
  </soap-env:Reason>
</soap-env:Fault>"#;

    #[test]
    fn test_parse_soap12_fault() {
        let fault = parse_fault(FAULT_12).unwrap();
        assert_eq!(fault.code, "soap-env:Sender");
        assert_eq!(fault.reason, "Sender not authorized");
    }

    #[test]
    fn test_parse_soap11_fault() {
        let xml = r#"<Fault><faultcode>Client</faultcode><faultstring>Bad request</faultstring></Fault>"#;
        let fault = parse_fault(xml).unwrap();
        assert_eq!(fault.code, "Client");
        assert_eq!(fault.reason, "Bad request");
    }

    #[test]
    fn test_non_fault_payload_passes_through() {
        let xml = "<GetCapabilitiesResponse><Capabilities/></GetCapabilitiesResponse>";
        assert!(!looks_like_fault(xml));
        assert!(parse_fault(xml).is_none());
    }

    #[test]
    fn test_fault_is_recognized() {
        assert!(looks_like_fault(FAULT_12));
    }
}
