//! Signed same-origin download references
//!
//! A reference names the backend download route for one file plus an expiry
//! and a keyed SHA-256 digest binding secret, user, file and expiry. Nothing
//! Google-issued ever appears in it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::Error;
use crate::Result;

/// Route the references point at.
pub const DOWNLOAD_ROUTE: &str = "/api/classroom/files/download";

/// Characters escaped in a file id placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A freshly issued reference.
#[derive(Debug, Clone)]
pub struct SignedLink {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DownloadLinks {
    secret: Vec<u8>,
    ttl: Duration,
}

impl DownloadLinks {
    /// An empty secret gets a random per-process key, so references die with
    /// the process.
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let secret = if secret.is_empty() {
            tracing::warn!("No download secret configured, using a random per-process key");
            let mut key = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            key
        } else {
            secret.as_bytes().to_vec()
        };

        Self {
            secret,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn sign(&self, user_id: &str, file_id: &str) -> SignedLink {
        self.sign_at(user_id, file_id, Utc::now())
    }

    pub fn sign_at(&self, user_id: &str, file_id: &str, now: DateTime<Utc>) -> SignedLink {
        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();
        let sig = self.digest(user_id, file_id, expires);
        let id = utf8_percent_encode(file_id, PATH_SEGMENT);

        SignedLink {
            url: format!("{}/{}?expires={}&sig={}", DOWNLOAD_ROUTE, id, expires, sig),
            // Keep the reported expiry at whole-second precision, like the URL.
            expires_at: Utc.timestamp_opt(expires, 0).single().unwrap_or(expires_at),
        }
    }

    pub fn verify(&self, user_id: &str, file_id: &str, expires: i64, sig: &str) -> Result<()> {
        self.verify_at(user_id, file_id, expires, sig, Utc::now())
    }

    pub fn verify_at(
        &self,
        user_id: &str,
        file_id: &str,
        expires: i64,
        sig: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let expected = self.digest(user_id, file_id, expires);
        let matches = expected.len() == sig.len()
            && bool::from(expected.as_bytes().ct_eq(sig.as_bytes()));
        if !matches {
            return Err(Error::Auth("Invalid download link".to_string()));
        }
        if now.timestamp() > expires {
            return Err(Error::Auth("Download link has expired".to_string()));
        }
        Ok(())
    }

    /// `H(key || H(key || msg))`, base64url without padding.
    fn digest(&self, user_id: &str, file_id: &str, expires: i64) -> String {
        let inner = Sha256::new()
            .chain_update(&self.secret)
            .chain_update(user_id.as_bytes())
            .chain_update([0u8])
            .chain_update(file_id.as_bytes())
            .chain_update([0u8])
            .chain_update(expires.to_string().as_bytes())
            .finalize();
        let outer = Sha256::new()
            .chain_update(&self.secret)
            .chain_update(inner)
            .finalize();
        URL_SAFE_NO_PAD.encode(outer)
    }
}
