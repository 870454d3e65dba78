//! services/signature_service.rs
//! Verificación HMAC-SHA256 del cuerpo crudo del webhook.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header donde la plataforma envía la firma (hex).
pub const SIGNATURE_HEADER: &str = "x-vapi-signature";

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        SignatureVerifier { secret }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// `true` sólo si hay secreto, hay firma y el HMAC del cuerpo coincide.
    /// Sin secreto configurado se rechaza todo.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            log::error!("Secreto del webhook no configurado: se rechazan todas las peticiones");
            return false;
        };

        let signature = match signature.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => {
                log::warn!("Falta el header {}: petición rechazada", SIGNATURE_HEADER);
                return false;
            }
        };

        let Ok(expected) = hex::decode(signature) else {
            log::warn!("Firma con formato inválido: petición rechazada");
            return false;
        };

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(e) => {
                log::error!("No se pudo inicializar HMAC: {}", e);
                return false;
            }
        };
        mac.update(body);

        // verify_slice compara en tiempo constante
        if mac.verify_slice(&expected).is_err() {
            log::warn!("Firma inválida: posible petición falsificada");
            return false;
        }
        true
    }
}

/// Firma un cuerpo como lo haría la plataforma.
#[cfg(test)]
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC acepta cualquier clave");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
