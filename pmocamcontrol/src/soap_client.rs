//! Transport HTTP bloquant pour les appels SOAP
//!
//! La frontière transport est un trait : le cœur n'ouvre jamais de
//! connexion TCP lui-même. L'implémentation par défaut s'appuie sur
//! `ureq`, en lecture du corps quel que soit le statut HTTP : un SOAP
//! Fault arrive typiquement avec un 400/500 et son corps doit rester
//! lisible.

use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::errors::CameraControlError;

/// Content-Type fixe de tous les appels de contrôle
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Résultat brut d'un POST SOAP : statut HTTP + corps complet
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: u16,
    pub body: String,
}

impl SoapResponse {
    pub fn status_ok(&self) -> bool {
        self.status == 200
    }
}

/// Frontière transport : « envoie des octets, rends des octets + statut ».
pub trait SoapTransport: Send + Sync {
    fn post(
        &self,
        url: &str,
        body: &str,
        timeout: Option<Duration>,
    ) -> Result<SoapResponse, CameraControlError>;
}

/// Transport par défaut : POST bloquant via `ureq`.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl SoapTransport for UreqTransport {
    fn post(
        &self,
        url: &str,
        body: &str,
        timeout: Option<Duration>,
    ) -> Result<SoapResponse, CameraControlError> {
        // Un Agent par appel, configuré pour ne PAS traiter les 4xx/5xx
        // comme des erreurs : le corps d'un Fault doit pouvoir être lu.
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        let agent: Agent = config.into();

        let mut response = agent
            .post(url)
            .header("Content-Type", SOAP_CONTENT_TYPE)
            .send(body.to_string())?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        debug!("📨 SOAP response {} from {} ({} bytes)", status, url, body.len());

        Ok(SoapResponse { status, body })
    }
}
