//! Cloudflare R2 blob store over the S3-compatible API.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client};
use aws_types::region::Region;
use chrono::{DateTime, Utc};

use super::blob::{normalize_object_key, BlobStore, ObjectMetadata, ObjectRef};
use crate::util::is_http_url;
use crate::{Error, Result};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "R2_PUBLIC_BASE_URL";

/// Largest page `list_objects_v2` returns.
const LIST_PAGE_LIMIT: usize = 1000;

/// Cloudflare R2 configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Optional public URL base for serving images without presigning.
    pub public_base_url: Option<String>,
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl R2Config {
    /// Load R2 configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// R2-backed blob store.
#[derive(Clone, Debug)]
pub struct R2Storage {
    config: R2Config,
    url_ttl: Duration,
    client: Client,
}

impl R2Storage {
    /// Build a store; download URLs are presigned for `url_ttl` unless a
    /// public base URL is configured.
    #[must_use]
    pub fn new(config: R2Config, url_ttl: Duration) -> Self {
        let client = build_s3_client(&config);
        Self {
            config,
            url_ttl,
            client,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &R2Config {
        &self.config
    }

    /// Check that the configured bucket is reachable with current credentials.
    pub async fn bucket_is_reachable(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|error| storage_error("head_bucket", &self.config.bucket, None, error))?;
        Ok(())
    }

    /// Public URL for an object key when a public base URL is configured.
    #[must_use]
    pub fn public_object_url(&self, object_key: &str) -> Option<String> {
        let base = self.config.public_base_url.as_ref()?;
        let key = object_key.trim_matches('/');
        if key.is_empty() {
            return None;
        }

        Some(format!("{base}/{key}"))
    }
}

#[async_trait]
impl BlobStore for R2Storage {
    async fn list(&self, prefix: &str, max_results: Option<usize>) -> Result<Vec<ObjectRef>> {
        let prefix = prefix.trim_matches('/');
        let prefix = if prefix.is_empty() {
            None
        } else {
            Some(format!("{prefix}/"))
        };
        let limit = max_results.unwrap_or(usize::MAX);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        let mut continuation_token = None;
        loop {
            let remaining = limit - objects.len();
            let page_size = i32::try_from(remaining.min(LIST_PAGE_LIMIT)).unwrap_or(1000);

            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket)
                .set_prefix(prefix.clone())
                .set_continuation_token(continuation_token.take())
                .max_keys(page_size)
                .send()
                .await
                .map_err(|error| {
                    Error::List(format!(
                        "R2 list_objects_v2 failed for {}: {error}",
                        self.config.bucket
                    ))
                })?;

            objects.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| !key.ends_with('/'))
                    .map(ObjectRef::new),
            );

            continuation_token = response
                .next_continuation_token()
                .map(ToOwned::to_owned);
            if objects.len() >= limit
                || !response.is_truncated().unwrap_or(false)
                || continuation_token.is_none()
            {
                break;
            }
        }

        objects.truncate(limit);
        tracing::debug!("Listed {} objects from {}", objects.len(), self.config.bucket);
        Ok(objects)
    }

    async fn download_url(&self, object: &ObjectRef) -> Result<String> {
        let object_key = normalize_object_key(&object.key)?;
        if let Some(url) = self.public_object_url(&object_key) {
            return Ok(url);
        }

        let presign_config = PresigningConfig::expires_in(self.url_ttl)
            .map_err(|error| Error::InvalidInput(format!("Invalid presign TTL: {error}")))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .presigned(presign_config)
            .await
            .map_err(|error| {
                storage_error(
                    "presign get_object",
                    &self.config.bucket,
                    Some(&object_key),
                    error,
                )
            })?;

        Ok(request.uri().to_string())
    }

    async fn metadata(&self, object: &ObjectRef) -> Result<ObjectMetadata> {
        let object_key = normalize_object_key(&object.key)?;
        let response = self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|error| {
                storage_error("head_object", &self.config.bucket, Some(&object_key), error)
            })?;

        let created_at = response
            .last_modified()
            .and_then(|time| DateTime::<Utc>::from_timestamp(time.secs(), time.subsec_nanos()));
        let custom = response
            .metadata()
            .map(decode_metadata)
            .unwrap_or_default();

        Ok(ObjectMetadata { created_at, custom })
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        content_type: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<ObjectRef> {
        let object_key = normalize_object_key(key)?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .body(ByteStream::from(payload))
            .set_metadata(Some(encode_metadata(&metadata)));

        if let Some(content_type) = normalize_content_type(Some(content_type)) {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|error| {
            Error::Write(format!(
                "R2 put_object failed for {}/{object_key}: {error}",
                self.config.bucket
            ))
        })?;

        Ok(ObjectRef::new(object_key))
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<R2Config>> {
    let account_id = lookup(ENV_ACCOUNT_ID).map(|value| value.trim().to_string());
    let bucket = lookup(ENV_BUCKET).map(|value| value.trim().to_string());
    let access_key_id = lookup(ENV_ACCESS_KEY_ID).map(|value| value.trim().to_string());
    let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY).map(|value| value.trim().to_string());
    let public_base_url = lookup(ENV_PUBLIC_BASE_URL).map(|value| value.trim().to_string());

    let any_present = account_id.is_some()
        || bucket.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some()
        || public_base_url.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    let mut required = |value: Option<String>, name: &'static str| match value {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            missing.push(name);
            None
        }
    };
    let account_id = required(account_id, ENV_ACCOUNT_ID);
    let bucket = required(bucket, ENV_BUCKET);
    let access_key_id = required(access_key_id, ENV_ACCESS_KEY_ID);
    let secret_access_key = required(secret_access_key, ENV_SECRET_ACCESS_KEY);

    let (Some(account_id), Some(bucket), Some(access_key_id), Some(secret_access_key)) =
        (account_id, bucket, access_key_id, secret_access_key)
    else {
        return Err(Error::Config(format!(
            "R2 configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    };

    let public_base_url = normalize_public_base_url(public_base_url)?;

    Ok(Some(R2Config {
        account_id,
        bucket,
        access_key_id,
        secret_access_key,
        public_base_url,
    }))
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "album-core-r2-storage",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = object_key.map_or_else(|| bucket.to_string(), |key| format!("{bucket}/{key}"));
    Error::Storage(format!("R2 {operation} failed for {target}: {error}"))
}

/// S3 user metadata travels as HTTP headers, so values are percent-encoded.
fn encode_metadata(metadata: &BTreeMap<String, String>) -> HashMap<String, String> {
    metadata
        .iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), urlencoding::encode(value).into_owned()))
        .collect()
}

fn decode_metadata(metadata: &HashMap<String, String>) -> BTreeMap<String, String> {
    metadata
        .iter()
        .map(|(key, value)| {
            let decoded = urlencoding::decode(value)
                .map_or_else(|_| value.clone(), std::borrow::Cow::into_owned);
            (key.to_ascii_lowercase(), decoded)
        })
        .collect()
}

fn normalize_content_type(content_type: Option<&str>) -> Option<String> {
    content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn normalize_public_base_url(public_base_url: Option<String>) -> Result<Option<String>> {
    let Some(value) = public_base_url else {
        return Ok(None);
    };

    if value.is_empty() {
        return Ok(None);
    }
    if !is_http_url(&value) {
        return Err(Error::Config(format!(
            "{ENV_PUBLIC_BASE_URL} must start with http:// or https://"
        )));
    }

    Ok(Some(value.trim_end_matches('/').to_string()))
}
