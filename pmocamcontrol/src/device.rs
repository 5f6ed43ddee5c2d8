//! Session device ONVIF
//!
//! Un [`Device`] possède l'adresse composée au dial, les identifiants
//! optionnels, la table des endpoints apprise par l'échange de capacités
//! et le décalage d'horloge mesuré par [`Device::sync_clock`]. La table et
//! le décalage sont derrière des verrous en lecture majoritaire : un
//! rafraîchissement de capacités et des appels signés concurrents sur la
//! même session ne se marchent pas dessus.
//!
//! Le device ne migre jamais vers une autre adresse : les URLs apprises
//! sont réécrites vers l'adresse composée au dial (correction NAT), seule
//! voie de changement d'hôte.

use std::collections::HashMap;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;
use xmltree::{Element, XMLNode};

use pmoonvif::ONVIF_NAMESPACES;
use pmoonvif::soap::{self, SoapEnvelope, build_security_header};
use pmoonvif::wsdiscovery::CancelToken;

use crate::capabilities::parse_capability_endpoints;
use crate::errors::CameraControlError;
use crate::model::DeviceInfo;
use crate::soap_client::{SoapResponse, SoapTransport, UreqTransport};

/// Paramètres de construction d'une session
///
/// Des identifiants vides désactivent la signature : aucun en-tête de
/// sécurité anonyme n'est jamais émis.
#[derive(Clone, Default)]
pub struct DeviceParams {
    /// Adresse `host[:port]` composée pour joindre le device
    pub xaddr: String,
    pub username: String,
    pub password: String,
    /// Transport HTTP fourni par l'appelant ; `ureq` par défaut
    pub transport: Option<Arc<dyn SoapTransport>>,
}

/// Session vers un device de contrôle ONVIF
pub struct Device {
    xaddr: String,
    username: String,
    password: String,
    transport: Arc<dyn SoapTransport>,
    endpoints: RwLock<HashMap<String, String>>,
    clock_drift: RwLock<Duration>,
    info: RwLock<DeviceInfo>,
}

fn split_authority(addr: &str) -> (&str, Option<u16>) {
    match addr.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (addr, None),
        },
        None => (addr, None),
    }
}

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

impl Device {
    pub fn new(params: DeviceParams) -> Self {
        let device = Self {
            xaddr: params.xaddr,
            username: params.username,
            password: params.password,
            transport: params.transport.unwrap_or_else(|| Arc::new(UreqTransport)),
            endpoints: RwLock::new(HashMap::new()),
            clock_drift: RwLock::new(Duration::zero()),
            info: RwLock::new(DeviceInfo::default()),
        };

        let seed = format!("http://{}/onvif/device_service", device.xaddr);
        device.add_endpoint("Device", &seed);
        device
    }

    pub fn xaddr(&self) -> &str {
        &self.xaddr
    }

    /// Copie de la table des endpoints appris.
    pub fn services(&self) -> HashMap<String, String> {
        self.endpoints.read().clone()
    }

    /// Métadonnées descriptives accumulées jusqu'ici.
    pub fn device_info(&self) -> DeviceInfo {
        self.info.read().clone()
    }

    /// Décalage `horloge locale - horloge device` mesuré par
    /// [`Device::sync_clock`]. Zéro tant qu'aucune synchronisation n'a
    /// abouti.
    pub fn clock_drift(&self) -> Duration {
        *self.clock_drift.read()
    }

    pub(crate) fn merge_info(&self, apply: impl FnOnce(&mut DeviceInfo)) {
        apply(&mut self.info.write());
    }

    /// Remplace l'hôte d'une URL apprise par l'adresse composée au dial.
    ///
    /// Certains devices annoncent une adresse interne invisible derrière
    /// un NAT ; l'adresse qui a répondu fait foi.
    fn rewrite_host(&self, value: &str) -> String {
        match Url::parse(value) {
            Ok(mut url) => {
                let (host, port) = split_authority(&self.xaddr);
                if url.set_host(Some(host)).is_err() {
                    return value.to_string();
                }
                if url.set_port(port).is_err() {
                    return value.to_string();
                }
                url.to_string()
            }
            Err(_) => value.to_string(),
        }
    }

    /// Normalise la clé une fois pour toutes : les vendeurs mélangent
    /// `Events`, `EVENTS` et `events` pour le même service.
    pub(crate) fn add_endpoint(&self, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        let value = self.rewrite_host(value);
        self.endpoints.write().insert(key, value);
    }

    /// Résout un nom de service logique en URL concrète.
    ///
    /// Correspondance exacte d'abord ; à défaut, recherche par
    /// sous-chaîne avec la clé la plus courte comme départage, pour que la
    /// résolution soit déterministe. Échoue avant tout appel réseau.
    pub fn endpoint(&self, name: &str) -> Result<String, CameraControlError> {
        let name = name.to_ascii_lowercase();
        let endpoints = self.endpoints.read();

        if let Some(url) = endpoints.get(&name) {
            return Ok(url.clone());
        }

        endpoints
            .iter()
            .filter(|(key, _)| key.contains(&name))
            .min_by_key(|(key, _)| key.len())
            .map(|(_, url)| url.clone())
            .ok_or(CameraControlError::EndpointNotFound(name))
    }

    fn build_envelope(&self, body: Element, sign: bool) -> Result<String, CameraControlError> {
        let mut envelope = SoapEnvelope::new();
        envelope.add_root_namespaces(&ONVIF_NAMESPACES);
        envelope.set_body(body);

        if sign && !self.username.is_empty() && !self.password.is_empty() {
            envelope.add_header(build_security_header(
                &self.username,
                &self.password,
                self.clock_drift(),
            ));
        }

        Ok(envelope.to_xml()?)
    }

    /// Prépare un appel d'opération ; le payload est l'élément body de
    /// l'opération, préfixé selon la table de namespaces du protocole.
    pub fn create_request(&self, body: Element) -> MethodCall<'_> {
        MethodCall {
            device: self,
            body,
            service: "device".to_string(),
            endpoint: None,
            timeout: None,
            cancel: None,
            sign: true,
        }
    }

    /// Appel one-shot : statut HTTP + corps brut.
    pub fn call(&self, service: &str, body: Element) -> Result<SoapResponse, CameraControlError> {
        self.create_request(body).service(service).send()
    }

    /// Appel one-shot décomposé : payload du Body de la réponse, Faults
    /// reconnus et remontés en erreur typée.
    pub fn request(&self, service: &str, body: Element) -> Result<String, CameraControlError> {
        self.create_request(body).service(service).fetch()
    }

    /// Mesure le décalage d'horloge avec le device.
    ///
    /// L'opération n'est jamais signée, même avec des identifiants : on ne
    /// peut pas signer avec un drift qu'on est en train de calculer. À
    /// invoquer avant le premier appel authentifié, puis au besoin sur les
    /// sessions longues ; le rafraîchissement est à la charge de
    /// l'appelant.
    pub fn sync_clock(&self) -> Result<Duration, CameraControlError> {
        let payload = self
            .create_request(Element::new("tds:GetSystemDateAndTime"))
            .unauthenticated()
            .fetch()?;

        let device_time = parse_system_date_time(&payload)?;
        let drift = Utc::now() - device_time;
        *self.clock_drift.write() = drift;
        debug!("🕑 clock drift for {}: {}s", self.xaddr, drift.num_seconds());
        Ok(drift)
    }

    /// Échange de capacités : remplit la table des endpoints et rend le
    /// payload capacités pour décodage typé par l'appelant.
    pub fn inspect(&self) -> Result<String, CameraControlError> {
        if let Err(err) = self.sync_clock() {
            // Certains devices refusent l'heure ; les capacités restent
            // tentables avec un drift nul.
            warn!("clock sync failed for {}: {}", self.xaddr, err);
        }

        let mut get_capabilities = Element::new("tds:GetCapabilities");
        get_capabilities
            .children
            .push(XMLNode::Element(text_element("tds:Category", "All")));

        let response = self.create_request(get_capabilities).send()?;
        if !response.status_ok() {
            return Err(CameraControlError::NotOnline(self.xaddr.clone()));
        }

        self.ingest_capabilities(response.body.as_bytes())?;
        Ok(soap::extract_body(response.body.as_bytes())?)
    }

    /// Ingestion d'une réponse de capacités déjà en main (enveloppe
    /// complète). Ré-ingérer le même document est idempotent.
    pub fn ingest_capabilities(&self, xml: &[u8]) -> Result<(), CameraControlError> {
        let endpoints = parse_capability_endpoints(xml)?;
        if endpoints.is_empty() {
            debug!("no capability addresses advertised by {}", self.xaddr);
        }
        for (category, xaddr) in endpoints {
            self.add_endpoint(&category, &xaddr);
        }
        Ok(())
    }

    /// Requête d'information explicite ; remplit les champs descriptifs
    /// principaux et rend la fiche à jour.
    pub fn get_device_information(&self) -> Result<DeviceInfo, CameraControlError> {
        let payload = self
            .create_request(Element::new("tds:GetDeviceInformation"))
            .fetch()?;

        let root = Element::parse(BufReader::new(payload.as_bytes()))
            .map_err(|e| CameraControlError::Envelope(e.into()))?;

        let field = |name: &str| -> Option<String> {
            let elem = root.children.iter().find_map(|node| {
                node.as_element()
                    .filter(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
            })?;
            let text = elem.get_text()?.trim().to_string();
            (!text.is_empty()).then_some(text)
        };

        let mut info = self.info.write();
        info.manufacturer = field("Manufacturer").or(info.manufacturer.take());
        info.model = field("Model").or(info.model.take());
        info.firmware_version = field("FirmwareVersion").or(info.firmware_version.take());
        info.serial_number = field("SerialNumber").or(info.serial_number.take());
        info.hardware_id = field("HardwareId").or(info.hardware_id.take());
        Ok(info.clone())
    }
}

/// Appel d'opération en cours de préparation
///
/// Construit par [`Device::create_request`] ; permet de dérouter
/// l'endpoint, de poser une échéance ou un jeton d'annulation, et de
/// désactiver la signature pour les opérations exemptées.
pub struct MethodCall<'a> {
    device: &'a Device,
    body: Element,
    service: String,
    endpoint: Option<String>,
    timeout: Option<StdDuration>,
    cancel: Option<CancelToken>,
    sign: bool,
}

impl MethodCall<'_> {
    /// Nom de service logique visé ("device" par défaut).
    pub fn service(mut self, name: &str) -> Self {
        self.service = name.to_string();
        self
    }

    /// Court-circuite la résolution : URL d'endpoint imposée.
    pub fn endpoint(mut self, url: &str) -> Self {
        self.endpoint = Some(url.to_string());
        self
    }

    /// Échéance de l'appel, appliquée au transport.
    pub fn deadline(mut self, timeout: StdDuration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Jeton d'annulation contrôlé à la frontière de l'appel bloquant.
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Désactive la signature pour cet appel, identifiants présents ou non.
    pub fn unauthenticated(mut self) -> Self {
        self.sign = false;
        self
    }

    /// Envoie l'appel : statut HTTP + corps brut de la réponse.
    pub fn send(self) -> Result<SoapResponse, CameraControlError> {
        let MethodCall {
            device,
            body,
            service,
            endpoint,
            timeout,
            cancel,
            sign,
        } = self;

        let endpoint = match endpoint {
            Some(url) => url,
            None => device.endpoint(&service)?,
        };

        let message = device.build_envelope(body, sign)?;

        ensure_not_cancelled(&cancel)?;
        let response = device.transport.post(&endpoint, &message, timeout)?;
        ensure_not_cancelled(&cancel)?;
        Ok(response)
    }

    /// Envoie l'appel et rend le payload du Body, Faults décodés.
    pub fn fetch(self) -> Result<String, CameraControlError> {
        let response = self.send()?;

        if !response.status_ok() {
            // Un Fault arrive typiquement avec un 400/500 ; il prime sur le
            // statut brut quand le corps est décodable.
            if let Ok(payload) = soap::extract_body(response.body.as_bytes()) {
                if let Some(fault) = soap::parse_fault(&payload) {
                    return Err(CameraControlError::Fault {
                        code: fault.code,
                        reason: fault.reason,
                    });
                }
            }
            return Err(CameraControlError::UnexpectedStatus(response.status));
        }

        let payload = soap::extract_body(response.body.as_bytes())?;
        if let Some(fault) = soap::parse_fault(&payload) {
            return Err(CameraControlError::Fault {
                code: fault.code,
                reason: fault.reason,
            });
        }
        Ok(payload)
    }
}

fn ensure_not_cancelled(cancel: &Option<CancelToken>) -> Result<(), CameraControlError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(CameraControlError::Cancelled),
        _ => Ok(()),
    }
}

/// Décode les champs UTCDateTime d'une réponse GetSystemDateAndTime en
/// horodatage absolu.
fn parse_system_date_time(payload: &str) -> Result<DateTime<Utc>, CameraControlError> {
    let invalid = |msg: &str| CameraControlError::InvalidDeviceTime(msg.to_string());

    let root = Element::parse(BufReader::new(payload.as_bytes()))
        .map_err(|e| CameraControlError::InvalidDeviceTime(e.to_string()))?;

    let child = |parent: &Element, name: &str| -> Option<Element> {
        parent
            .children
            .iter()
            .find_map(|node| {
                node.as_element()
                    .filter(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
            })
            .cloned()
    };

    let utc = child(&root, "SystemDateAndTime")
        .and_then(|s| child(&s, "UTCDateTime"))
        .ok_or_else(|| invalid("missing UTCDateTime"))?;

    let date = child(&utc, "Date").ok_or_else(|| invalid("missing Date"))?;
    let time = child(&utc, "Time").ok_or_else(|| invalid("missing Time"))?;

    let number = |parent: &Element, name: &str| -> Result<u32, CameraControlError> {
        let elem = child(parent, name).ok_or_else(|| invalid(&format!("missing {}", name)))?;
        let text = elem.get_text().unwrap_or_default();
        text.trim()
            .parse()
            .map_err(|_| invalid(&format!("bad {}: '{}'", name, text.trim())))
    };

    let year = number(&date, "Year")? as i32;
    let month = number(&date, "Month")?;
    let day = number(&date, "Day")?;
    let hour = number(&time, "Hour")?;
    let minute = number(&time, "Minute")?;
    let second = number(&time, "Second")?;

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| invalid("date out of range"))
}
