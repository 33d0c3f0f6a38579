//! Sealing of authentication tokens to a client's RSA public key.
//!
//! Tokens are handed out only in sealed form: RSA-OAEP with SHA-1, then
//! base64. Public keys are configured as base64 of a PEM or DER document.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;

use opencdn_common::{Error, Result};

/// A configured client public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealingKey {
    key: RsaPublicKey,
}

impl SealingKey {
    /// Parse a PEM encoded public key, either SubjectPublicKeyInfo or
    /// PKCS#1.
    ///
    /// # Errors
    /// - `Error::Config` if neither encoding parses
    pub fn from_pem(pem: &str) -> Result<Self> {
        RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map(|key| Self { key })
            .map_err(|e| Error::Config(format!("Invalid public key PEM: {}", e)))
    }

    /// Parse a DER encoded public key, either SubjectPublicKeyInfo or
    /// PKCS#1.
    ///
    /// # Errors
    /// - `Error::Config` if neither encoding parses
    pub fn from_der(der: &[u8]) -> Result<Self> {
        RsaPublicKey::from_public_key_der(der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(der))
            .map(|key| Self { key })
            .map_err(|e| Error::Config(format!("Invalid public key DER: {}", e)))
    }

    /// Parse a key as written in the configuration file.
    ///
    /// Accepts base64 of a PEM or DER document, or a bare PEM document.
    ///
    /// # Errors
    /// - `Error::Config` if the value is not a usable RSA public key
    pub fn from_config_value(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.starts_with("-----BEGIN") {
            return Self::from_pem(value);
        }

        let decoded = STANDARD
            .decode(value)
            .map_err(|e| Error::Config(format!("Public key is not valid base64: {}", e)))?;

        match std::str::from_utf8(&decoded) {
            Ok(text) if text.trim_start().starts_with("-----BEGIN") => Self::from_pem(text),
            _ => Self::from_der(&decoded),
        }
    }

    /// Encrypt a message to this key with RSA-OAEP (SHA-1).
    ///
    /// # Errors
    /// - `Error::Crypto` if the message is too long for the key
    pub fn seal(&self, message: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        self.key
            .encrypt(&mut rng, Oaep::new::<Sha1>(), message)
            .map_err(|e| Error::Crypto(format!("Sealing failed: {}", e)))
    }

    /// Seal a message and base64 encode the result.
    pub fn seal_base64(&self, message: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(self.seal(message)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::RsaPrivateKey;

    const PRIVATE_PEM: &str = include_str!("../testdata/rsa_1024_private.pem");
    const PUBLIC_PEM: &str = include_str!("../testdata/rsa_1024_public.pem");
    const PUBLIC_PKCS1_PEM: &str = include_str!("../testdata/rsa_1024_public_pkcs1.pem");

    fn unseal(ciphertext: &[u8]) -> Vec<u8> {
        let private = RsaPrivateKey::from_pkcs8_pem(PRIVATE_PEM).unwrap();
        private.decrypt(Oaep::new::<Sha1>(), ciphertext).unwrap()
    }

    #[test]
    fn test_seal_roundtrip() {
        let key = SealingKey::from_pem(PUBLIC_PEM).unwrap();
        let sealed = key.seal(b"abcdefghijklmnopqrst").unwrap();
        assert_eq!(sealed.len(), 128);
        assert_eq!(unseal(&sealed), b"abcdefghijklmnopqrst");
    }

    #[test]
    fn test_seal_is_randomized() {
        let key = SealingKey::from_pem(PUBLIC_PEM).unwrap();
        assert_ne!(key.seal(b"token").unwrap(), key.seal(b"token").unwrap());
    }

    #[test]
    fn test_pkcs1_and_spki_parse_to_same_key() {
        let spki = SealingKey::from_pem(PUBLIC_PEM).unwrap();
        let pkcs1 = SealingKey::from_pem(PUBLIC_PKCS1_PEM).unwrap();
        assert_eq!(spki, pkcs1);
    }

    #[test]
    fn test_config_value_forms() {
        let expected = SealingKey::from_pem(PUBLIC_PEM).unwrap();

        let b64_pem = STANDARD.encode(PUBLIC_PEM);
        assert_eq!(SealingKey::from_config_value(&b64_pem).unwrap(), expected);
        assert_eq!(SealingKey::from_config_value(PUBLIC_PEM).unwrap(), expected);

        let sealed = SealingKey::from_config_value(&b64_pem)
            .unwrap()
            .seal_base64(b"token")
            .unwrap();
        assert_eq!(unseal(&STANDARD.decode(sealed).unwrap()), b"token");
    }

    #[test]
    fn test_invalid_config_value() {
        assert!(matches!(
            SealingKey::from_config_value("not base64!"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SealingKey::from_config_value(&STANDARD.encode("garbage")),
            Err(Error::Config(_))
        ));
    }
}
