//! Génération de l'en-tête d'authentification WS-Security
//!
//! L'horodatage `Created` n'est pas l'heure locale : c'est la meilleure
//! estimation de l'heure du device visé, soit `Utc::now() - clock_drift`.
//! Un drift trop éloigné de la fenêtre d'acceptation du device fait échouer
//! l'authentification même avec de bons identifiants, d'où la
//! synchronisation d'horloge préalable côté session.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngCore;
use sha1::{Digest, Sha1};
use xmltree::{Element, XMLNode};

const NS_WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const NS_WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const PASSWORD_DIGEST_TYPE: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const NONCE_ENCODING: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

const NONCE_LEN: usize = 16;

/// Construit l'en-tête `wsse:Security` avec un nonce frais, à usage unique.
pub fn build_security_header(username: &str, password: &str, clock_drift: Duration) -> Element {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let created = Utc::now() - clock_drift;
    security_header_with_nonce(username, password, &nonce, created)
}

/// Variante déterministe : nonce et horodatage fournis par l'appelant.
///
/// À nonce et horodatage fixés, le digest produit est identique d'un appel
/// à l'autre.
pub fn security_header_with_nonce(
    username: &str,
    password: &str,
    nonce: &[u8],
    created: DateTime<Utc>,
) -> Element {
    let created = created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let digest = password_digest(nonce, &created, password);

    let mut security = Element::new("wsse:Security");
    security
        .attributes
        .insert("xmlns:wsse".to_string(), NS_WSSE.to_string());
    security
        .attributes
        .insert("xmlns:wsu".to_string(), NS_WSU.to_string());
    security
        .attributes
        .insert("soap-env:mustUnderstand".to_string(), "1".to_string());

    let mut token = Element::new("wsse:UsernameToken");

    let mut user_elem = Element::new("wsse:Username");
    user_elem.children.push(XMLNode::Text(username.to_string()));
    token.children.push(XMLNode::Element(user_elem));

    let mut password_elem = Element::new("wsse:Password");
    password_elem
        .attributes
        .insert("Type".to_string(), PASSWORD_DIGEST_TYPE.to_string());
    password_elem.children.push(XMLNode::Text(digest));
    token.children.push(XMLNode::Element(password_elem));

    let mut nonce_elem = Element::new("wsse:Nonce");
    nonce_elem
        .attributes
        .insert("EncodingType".to_string(), NONCE_ENCODING.to_string());
    nonce_elem
        .children
        .push(XMLNode::Text(BASE64.encode(nonce)));
    token.children.push(XMLNode::Element(nonce_elem));

    let mut created_elem = Element::new("wsu:Created");
    created_elem.children.push(XMLNode::Text(created));
    token.children.push(XMLNode::Element(created_elem));

    security.children.push(XMLNode::Element(token));
    security
}

/// `base64(sha1(nonce ++ created ++ password))`
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(nonce);
    sha.update(created.as_bytes());
    sha.update(password.as_bytes());
    BASE64.encode(sha.finalize())
}
