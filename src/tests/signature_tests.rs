//! tests/signature_tests.rs
//! Pruebas de la verificación HMAC del webhook.

#[cfg(test)]
mod tests {
    use crate::services::signature_service::{sign_body, SignatureVerifier};
    use crate::tests::support::SECRET;

    const BODY: &[u8] = br#"{"message":{"type":"assistant-request","call":{"id":"call-1"}}}"#;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(Some(SECRET.to_string()))
    }

    #[test]
    fn accepts_hmac_of_exact_body() {
        let signature = sign_body(SECRET, BODY);
        assert!(verifier().verify(BODY, Some(&signature)));
    }

    #[test]
    fn rejects_single_bit_change_in_body() {
        let signature = sign_body(SECRET, BODY);
        for index in [0, BODY.len() / 2, BODY.len() - 1] {
            for bit in 0..8 {
                let mut mutated = BODY.to_vec();
                mutated[index] ^= 1 << bit;
                assert!(
                    !verifier().verify(&mutated, Some(&signature)),
                    "aceptó cuerpo alterado en byte {} bit {}",
                    index,
                    bit
                );
            }
        }
    }

    #[test]
    fn rejects_single_bit_change_in_token() {
        let signature = sign_body(SECRET, BODY);
        let raw = hex::decode(&signature).unwrap();
        for index in 0..raw.len() {
            let mut mutated = raw.clone();
            mutated[index] ^= 0x01;
            let token = hex::encode(mutated);
            assert!(!verifier().verify(BODY, Some(&token)));
        }
    }

    #[test]
    fn rejects_missing_or_empty_header() {
        assert!(!verifier().verify(BODY, None));
        assert!(!verifier().verify(BODY, Some("")));
        assert!(!verifier().verify(BODY, Some("   ")));
    }

    #[test]
    fn rejects_non_hex_token() {
        assert!(!verifier().verify(BODY, Some("not-a-signature")));
    }

    #[test]
    fn rejects_signature_made_with_another_secret() {
        let signature = sign_body("otro-secreto", BODY);
        assert!(!verifier().verify(BODY, Some(&signature)));
    }

    #[test]
    fn without_secret_every_request_is_rejected() {
        for secret in [None, Some(String::new())] {
            let verifier = SignatureVerifier::new(secret);
            assert!(!verifier.is_configured());
            assert!(!verifier.verify(BODY, None));
            assert!(!verifier.verify(BODY, Some(&sign_body(SECRET, BODY))));
            assert!(!verifier.verify(BODY, Some(&sign_body("", BODY))));
        }
    }
}
