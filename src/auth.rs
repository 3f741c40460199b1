//! Request authentication for the strato crate
//!
//! Credentials are parsed and validated once at client construction; per
//! request they produce an `Authorization` header value, either HTTP Basic
//! or an HTTP Signature over the request date.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use std::fmt;

/// Signature algorithm identifier sent in the `Authorization` header
const SIGNATURE_ALGORITHM: &str = "rsa-sha256";

/// Client credentials, fixed at construction time
///
/// Either an HTTP Basic token (pre-encoded, so the base64 work happens
/// once) or an RSA signing key identified by a key id. The private key is
/// parsed eagerly so a bad key surfaces before any request is made.
#[derive(Clone)]
pub(crate) enum Credentials {
    /// HTTP Basic authentication with a pre-encoded `login:password` token
    Basic { token: String },

    /// HTTP Signature authentication with an RSA-SHA256 signing key
    Signature {
        key_id: String,
        key: SigningKey<Sha256>,
    },
}

impl Credentials {
    /// Create Basic credentials from a login and password
    pub(crate) fn basic(login: &str, password: &str) -> Result<Self> {
        if login.is_empty() || password.is_empty() {
            return Err(Error::Auth(
                "login and password must be non-empty".to_string(),
            ));
        }

        let token = STANDARD.encode(format!("{}:{}", login, password));
        Ok(Credentials::Basic { token })
    }

    /// Create Signature credentials from a key id and a PEM-encoded RSA
    /// private key (PKCS#8 or PKCS#1)
    pub(crate) fn signature(key_id: impl Into<String>, pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::Auth(format!("invalid RSA private key: {}", e)))?;

        Ok(Credentials::Signature {
            key_id: key_id.into(),
            key: SigningKey::<Sha256>::new(private_key),
        })
    }

    /// Build the `Authorization` header value for a request carrying the
    /// given `Date` header value
    pub(crate) fn authorization(&self, date: &str) -> String {
        match self {
            Credentials::Basic { token } => format!("Basic {}", token),
            Credentials::Signature { key_id, key } => {
                let signature = key.sign(date.as_bytes());
                format!(
                    "Signature keyId=\"{}\",algorithm=\"{}\" {}",
                    key_id,
                    SIGNATURE_ALGORITHM,
                    STANDARD.encode(signature.to_bytes())
                )
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { .. } => f.debug_struct("Basic").finish_non_exhaustive(),
            Credentials::Signature { key_id, .. } => f
                .debug_struct("Signature")
                .field("key_id", key_id)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::pkcs8::EncodePrivateKey;
    use rsa::signature::Verifier;

    fn test_key() -> (RsaPrivateKey, String) {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .expect("failed to generate test key");
        let pem = key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .expect("failed to encode test key")
            .to_string();
        (key, pem)
    }

    #[test]
    fn test_basic_token_is_pre_encoded() {
        let creds = Credentials::basic("admin", "joypass123").unwrap();

        let header = creds.authorization("ignored");
        let expected = STANDARD.encode("admin:joypass123");
        assert_eq!(header, format!("Basic {}", expected));
    }

    #[test]
    fn test_basic_rejects_empty_credentials() {
        assert!(matches!(Credentials::basic("", "pw"), Err(Error::Auth(_))));
        assert!(matches!(
            Credentials::basic("login", ""),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn test_signature_header_format() {
        let (_, pem) = test_key();
        let creds = Credentials::signature("/admin/keys/laptop", &pem).unwrap();

        let header = creds.authorization("Mon, 07 Aug 2026 12:00:00 GMT");
        assert!(header.starts_with(
            "Signature keyId=\"/admin/keys/laptop\",algorithm=\"rsa-sha256\" "
        ));
    }

    #[test]
    fn test_signature_verifies_against_public_key() {
        let (key, pem) = test_key();
        let creds = Credentials::signature("/admin/keys/laptop", &pem).unwrap();

        let date = "Mon, 07 Aug 2026 12:00:00 GMT";
        let header = creds.authorization(date);
        let encoded = header.rsplit(' ').next().unwrap();
        let sig_bytes = STANDARD.decode(encoded).unwrap();

        let verifying_key = VerifyingKey::<Sha256>::new(key.to_public_key());
        let signature = Signature::try_from(sig_bytes.as_slice()).unwrap();
        verifying_key
            .verify(date.as_bytes(), &signature)
            .expect("signature did not verify");
    }

    #[test]
    fn test_signature_rejects_bad_pem() {
        let result = Credentials::signature("/admin/keys/laptop", "not a pem");
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let creds = Credentials::basic("admin", "secret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
    }
}
