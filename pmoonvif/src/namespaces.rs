//! Table des namespaces du schéma ONVIF
//!
//! La table est construite une seule fois et partagée par toutes les
//! sessions. Chaque enveloppe déclare l'intégralité de la table sur son
//! élément racine, qu'une opération donnée utilise le préfixe ou non.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Préfixes de schéma déclarés à la racine de chaque enveloppe.
pub static ONVIF_NAMESPACES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("onvif", "http://www.onvif.org/ver10/schema"),
        ("tds", "http://www.onvif.org/ver10/device/wsdl"),
        ("trt", "http://www.onvif.org/ver10/media/wsdl"),
        ("tev", "http://www.onvif.org/ver10/events/wsdl"),
        ("tptz", "http://www.onvif.org/ver20/ptz/wsdl"),
        ("timg", "http://www.onvif.org/ver20/imaging/wsdl"),
        ("tan", "http://www.onvif.org/ver20/analytics/wsdl"),
        ("xmime", "http://www.w3.org/2005/05/xmlmime"),
        ("wsnt", "http://docs.oasis-open.org/wsn/b-2"),
        ("xop", "http://www.w3.org/2004/08/xop/include"),
        ("wsa", "http://www.w3.org/2005/08/addressing"),
        ("wstop", "http://docs.oasis-open.org/wsn/t-1"),
        ("wsntw", "http://docs.oasis-open.org/wsn/bw-2"),
        ("wsrf-rw", "http://docs.oasis-open.org/wsrf/rw-2"),
        ("wsaw", "http://www.w3.org/2006/05/addressing/wsdl"),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_contains_core_services() {
        assert_eq!(
            ONVIF_NAMESPACES.get("tds"),
            Some(&"http://www.onvif.org/ver10/device/wsdl")
        );
        assert_eq!(
            ONVIF_NAMESPACES.get("trt"),
            Some(&"http://www.onvif.org/ver10/media/wsdl")
        );
        assert!(ONVIF_NAMESPACES.contains_key("tptz"));
        assert!(ONVIF_NAMESPACES.contains_key("wsa"));
    }

    #[test]
    fn test_table_size() {
        assert_eq!(ONVIF_NAMESPACES.len(), 15);
    }
}
