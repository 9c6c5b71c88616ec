use crate::core::{
    entities::MediaType,
    error::{Error, Result},
    storage::{
        content_type, object_name, Method, ObjectStorage, SignedUrl,
        SIGNED_URL_TTL_SECS,
    },
};
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use rsa::{
    pkcs1v15::SigningKey,
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer},
    RsaPrivateKey,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::{fs, path::Path, sync::Arc};

const HOST: &str = "storage.googleapis.com";

/// RFC 3986 unreserved characters stay as they are.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const PATH_SET: &AsciiSet = &QUERY_SET.remove(b'/');

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
}

/// V4 (`GOOG4-RSA-SHA256`) signer for a service account.
pub(crate) struct GcsSigner {
    client_email: String,
    private_key: RsaPrivateKey,
}

impl GcsSigner {
    pub(crate) fn new(client_email: String, private_key: RsaPrivateKey) -> Self {
        Self {
            client_email,
            private_key,
        }
    }

    pub(crate) fn from_service_account_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::wrap(
                format!("failed to read service account file {}", path.display()),
                500,
                e,
            )
        })?;
        Self::from_service_account_json(&raw)
    }

    pub(crate) fn from_service_account_json(raw: &str) -> Result<Self> {
        let account: ServiceAccount = serde_json::from_str(raw).map_err(|e| {
            Error::wrap("failed to parse service account".into(), 500, e)
        })?;
        let private_key = RsaPrivateKey::from_pkcs8_pem(&account.private_key)
            .map_err(|e| {
                Error::wrap("failed to load private key".into(), 500, e)
            })?;
        Ok(Self::new(account.client_email, private_key))
    }

    /// Returns `(canonical_query, canonical_request)` for the given request.
    fn canonical_request(
        &self,
        method: Method,
        bucket: &str,
        object: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
        expires_in: u64,
    ) -> (String, String) {
        let datestamp = now.format("%Y%m%d");
        let timestamp = now.format("%Y%m%dT%H%M%SZ");
        let credential = format!(
            "{}/{}/auto/storage/goog4_request",
            self.client_email, datestamp
        );
        let canonical_uri = format!(
            "/{}/{}",
            bucket,
            utf8_percent_encode(object, PATH_SET)
        );

        let (canonical_headers, signed_headers) = match content_type {
            Some(ct) => (
                format!("content-type:{}\nhost:{}\n", ct, HOST),
                "content-type;host",
            ),
            None => (format!("host:{}\n", HOST), "host"),
        };

        let mut query_items = vec![
            ("X-Goog-Algorithm", "GOOG4-RSA-SHA256".to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", timestamp.to_string()),
            ("X-Goog-Expires", expires_in.to_string()),
            ("X-Goog-SignedHeaders", signed_headers.to_string()),
        ];
        query_items.sort_by(|a, b| a.0.cmp(b.0));
        let canonical_query = query_items
            .iter()
            .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, QUERY_SET)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\nUNSIGNED-PAYLOAD",
            method, canonical_uri, canonical_query, canonical_headers, signed_headers
        );
        (canonical_query, canonical_request)
    }

    fn string_to_sign(now: DateTime<Utc>, canonical_request: &str) -> String {
        format!(
            "GOOG4-RSA-SHA256\n{}\n{}/auto/storage/goog4_request\n{}",
            now.format("%Y%m%dT%H%M%SZ"),
            now.format("%Y%m%d"),
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        )
    }

    pub(crate) fn sign_at(
        &self,
        method: Method,
        bucket: &str,
        object: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
        expires_in: u64,
    ) -> String {
        let (canonical_query, canonical_request) = self.canonical_request(
            method,
            bucket,
            object,
            content_type,
            now,
            expires_in,
        );
        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key
            .sign(Self::string_to_sign(now, &canonical_request).as_bytes())
            .to_bytes();
        format!(
            "https://{}/{}/{}?{}&X-Goog-Signature={}",
            HOST,
            bucket,
            utf8_percent_encode(object, PATH_SET),
            canonical_query,
            hex::encode(signature)
        )
    }
}

#[derive(Clone)]
pub(crate) struct GcsStorage {
    client: Client,
    bucket: String,
    signer: Arc<GcsSigner>,
}

impl GcsStorage {
    pub(crate) fn new(bucket: impl Into<String>, signer: GcsSigner) -> Self {
        Self {
            client: Client::new(),
            bucket: bucket.into(),
            signer: Arc::new(signer),
        }
    }
}

impl ObjectStorage for GcsStorage {
    fn signed_url(
        &self,
        method: Method,
        media_type: MediaType,
        file_name: &str,
    ) -> Result<SignedUrl> {
        let object = object_name(media_type, file_name)?;
        let content_type = content_type(media_type, file_name);
        let url = self.signer.sign_at(
            method,
            &self.bucket,
            &object,
            (method == Method::Put).then_some(content_type.as_str()),
            Utc::now(),
            SIGNED_URL_TTL_SECS,
        );
        Ok(SignedUrl {
            url,
            object,
            content_type,
            method: method.to_string(),
            expires_in: SIGNED_URL_TTL_SECS,
        })
    }

    async fn upload(
        &self,
        media_type: MediaType,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        let signed = self.signed_url(Method::Put, media_type, file_name)?;
        let res = self
            .client
            .put(&signed.url)
            .header("Content-Type", &signed.content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::wrap("failed to send upload request".into(), 502, e))?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            let reason = res.text().await.unwrap_or_default();
            return Err(Error::new(
                format!("upload of {} failed ({}): {}", signed.object, status, reason),
                502,
            ));
        }
        log::info!("uploaded {}", signed.object);
        Ok(())
    }

    async fn delete(&self, media_type: MediaType, file_name: &str) -> Result<()> {
        let signed = self.signed_url(Method::Delete, media_type, file_name)?;
        let res = self
            .client
            .delete(&signed.url)
            .send()
            .await
            .map_err(|e| Error::wrap("failed to send delete request".into(), 502, e))?;
        match res.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => {
                log::info!("deleted {}", signed.object);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                log::warn!("{} was already gone from the bucket", signed.object);
                Ok(())
            }
            status => {
                let reason = res.text().await.unwrap_or_default();
                Err(Error::new(
                    format!("deletion of {} failed ({}): {}", signed.object, status, reason),
                    502,
                ))
            }
        }
    }
}
