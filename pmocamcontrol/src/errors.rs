use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraControlError {
    // Erreur réseau/HTTP remontée telle quelle, jamais retentée ici
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    #[error("malformed SOAP envelope: {0}")]
    Envelope(#[from] pmoonvif::soap::EnvelopeError),

    #[error("malformed capabilities document: {0}")]
    MalformedCapabilities(String),

    #[error("endpoint service '{0}' not found")]
    EndpointNotFound(String),

    #[error("device at {0} is not available or does not support ONVIF services")]
    NotOnline(String),

    #[error("device returned SOAP fault {code}: {reason}")]
    Fault { code: String, reason: String },

    #[error("device returned HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("call cancelled")]
    Cancelled,

    #[error("invalid device time: {0}")]
    InvalidDeviceTime(String),

    #[error("discovery error: {0}")]
    Discovery(pmoonvif::wsdiscovery::DiscoveryError),
}

impl From<pmoonvif::wsdiscovery::DiscoveryError> for CameraControlError {
    fn from(err: pmoonvif::wsdiscovery::DiscoveryError) -> Self {
        match err {
            // L'annulation garde sa propre identité jusqu'à l'appelant.
            pmoonvif::wsdiscovery::DiscoveryError::Cancelled => CameraControlError::Cancelled,
            other => CameraControlError::Discovery(other),
        }
    }
}
