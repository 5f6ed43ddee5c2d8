//! Décodage d'une réponse GetCapabilities en table nom→adresse
//!
//! Chaque catégorie de capacités porte son adresse de service dans un
//! enfant XAddr ; la catégorie Extension imbrique les capacités vendeur un
//! niveau plus bas. Un jeu de capacités partiel est normal : certaines
//! classes de device n'exposent qu'un sous-ensemble des services.

use std::io::BufReader;

use xmltree::Element;

use crate::errors::CameraControlError;

fn child_by_local_name<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| {
        node.as_element()
            .filter(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
    })
}

fn xaddr_of(category: &Element) -> Option<String> {
    let text = child_by_local_name(category, "XAddr")?.get_text()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

/// Liste `(catégorie, adresse)` d'une réponse GetCapabilities complète
/// (enveloppe incluse). Zéro adresse reconnue n'est pas une erreur.
pub(crate) fn parse_capability_endpoints(
    xml: &[u8],
) -> Result<Vec<(String, String)>, CameraControlError> {
    let root = Element::parse(BufReader::new(xml))
        .map_err(|e| CameraControlError::MalformedCapabilities(e.to_string()))?;

    if !root.name.ends_with("Envelope") {
        return Err(CameraControlError::MalformedCapabilities(
            "missing Envelope root".to_string(),
        ));
    }

    let capabilities = child_by_local_name(&root, "Body")
        .and_then(|body| child_by_local_name(body, "GetCapabilitiesResponse"))
        .and_then(|response| child_by_local_name(response, "Capabilities"))
        .ok_or_else(|| {
            CameraControlError::MalformedCapabilities(
                "missing GetCapabilitiesResponse/Capabilities".to_string(),
            )
        })?;

    let mut found = Vec::new();
    for node in &capabilities.children {
        let Some(category) = node.as_element() else {
            continue;
        };

        if category.name == "Extension" || category.name.ends_with(":Extension") {
            // Les capacités vendeur sont un niveau plus bas.
            for sub in &category.children {
                let Some(extension) = sub.as_element() else {
                    continue;
                };
                if let Some(xaddr) = xaddr_of(extension) {
                    found.push((extension.name.clone(), xaddr));
                }
            }
        } else if let Some(xaddr) = xaddr_of(category) {
            found.push((category.name.clone(), xaddr));
        }
    }

    Ok(found)
}
