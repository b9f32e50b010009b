//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and runs every request through the s3fs retry engine.
//! The SDK's own retry layer is disabled so that only one policy applies.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_smithy_types::retry::RetryConfig as SdkRetryConfig;
use bytes::Bytes;
use s3fs_core::{BackendError, Error, Result, Retrier, S3Options};

use crate::error::{body_error, from_sdk_error};
use crate::object::{ObjectInfo, clean_etag, timestamp};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    retrier: Retrier,
}

impl S3Client {
    /// Create a client from connection options, with credentials and any
    /// unset fields taken from the standard AWS environment
    pub async fn new(options: &S3Options, retrier: Retrier) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &options.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(options.force_path_style)
            .build();

        Self::from_conf(s3_config, retrier)
    }

    /// Create a client from a prepared SDK config
    pub fn from_conf(config: aws_sdk_s3::Config, retrier: Retrier) -> Self {
        let config = config
            .to_builder()
            .retry_config(SdkRetryConfig::disabled())
            .build();

        Self {
            inner: aws_sdk_s3::Client::from_conf(config),
            retrier,
        }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn retrier(&self) -> &Retrier {
        &self.retrier
    }

    /// Metadata of a single object
    pub async fn info(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let response = self
            .retrier
            .execute(|| async move {
                self.inner
                    .head_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(from_sdk_error)
            })
            .await?;

        let mut info = ObjectInfo::file(key, response.content_length().unwrap_or(0));
        info.last_modified = response.last_modified().and_then(timestamp);
        info.etag = response.e_tag().map(clean_etag);
        info.content_type = response.content_type().map(str::to_string);
        info.storage_class = response.storage_class().map(|sc| sc.as_str().to_string());

        Ok(info)
    }

    pub async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.info(bucket, key).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read a whole object
    ///
    /// The body is read inside the retried operation, so a stream that breaks
    /// off mid-transfer re-issues the GET.
    pub async fn cat_file(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.retrier
            .execute(|| async move {
                let response = self
                    .inner
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(from_sdk_error)?;

                let data = response.body.collect().await.map_err(body_error)?;
                Ok::<_, BackendError>(data.into_bytes())
            })
            .await
    }

    /// Write a whole object
    pub async fn pipe_file(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as i64;

        let response = self
            .retrier
            .execute(|| {
                let body = ByteStream::from(data.clone());
                async move {
                    let mut request = self.inner.put_object().bucket(bucket).key(key).body(body);
                    if let Some(ct) = content_type {
                        request = request.content_type(ct);
                    }
                    request.send().await.map_err(from_sdk_error)
                }
            })
            .await?;

        let mut info = ObjectInfo::file(key, size);
        info.etag = response.e_tag().map(clean_etag);
        info.content_type = content_type.map(str::to_string);
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    /// List the direct children of `prefix`
    ///
    /// Common prefixes are reported as directories. Follows continuation
    /// tokens until the listing is complete.
    pub async fn ls(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut items = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let token = continuation_token.take();
            let response = self
                .retrier
                .execute(|| {
                    let token = token.clone();
                    async move {
                        let mut request =
                            self.inner.list_objects_v2().bucket(bucket).delimiter("/");
                        if !prefix.is_empty() {
                            request = request.prefix(prefix);
                        }
                        if let Some(token) = token {
                            request = request.continuation_token(token);
                        }
                        request.send().await.map_err(from_sdk_error)
                    }
                })
                .await?;

            for common in response.common_prefixes() {
                if let Some(p) = common.prefix() {
                    items.push(ObjectInfo::dir(p));
                }
            }

            for object in response.contents() {
                let mut info = ObjectInfo::file(
                    object.key().unwrap_or_default(),
                    object.size().unwrap_or(0),
                );
                info.last_modified = object.last_modified().and_then(timestamp);
                info.etag = object.e_tag().map(clean_etag);
                info.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
                items.push(info);
            }

            continuation_token = response.next_continuation_token().map(str::to_string);
            if !response.is_truncated().unwrap_or(false) || continuation_token.is_none() {
                break;
            }
        }

        Ok(items)
    }

    pub async fn rm_file(&self, bucket: &str, key: &str) -> Result<()> {
        self.retrier
            .execute(|| async move {
                self.inner
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(from_sdk_error)
            })
            .await?;

        Ok(())
    }

    /// Delete several objects in one request, returning the keys deleted
    pub async fn rm_files(&self, bucket: &str, keys: &[String]) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let objects = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;

        let response = self
            .retrier
            .execute(|| {
                let delete = delete.clone();
                async move {
                    self.inner
                        .delete_objects()
                        .bucket(bucket)
                        .delete(delete)
                        .send()
                        .await
                        .map_err(from_sdk_error)
                }
            })
            .await?;

        if !response.errors().is_empty() {
            let error_keys: Vec<&str> = response.errors().iter().filter_map(|e| e.key()).collect();
            tracing::warn!(keys = ?error_keys, "Failed to delete some objects");
        }

        Ok(response
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(str::to_string))
            .collect())
    }

    /// Server-side copy; returns the metadata of the new object
    pub async fn copy_file(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<ObjectInfo> {
        let copy_source = format!("{src_bucket}/{src_key}");
        let copy_source = copy_source.as_str();

        let response = self
            .retrier
            .execute(|| async move {
                self.inner
                    .copy_object()
                    .copy_source(copy_source)
                    .bucket(dst_bucket)
                    .key(dst_key)
                    .send()
                    .await
                    .map_err(from_sdk_error)
            })
            .await?;

        // Size comes from HEAD since copy doesn't return it
        let mut info = self.info(dst_bucket, dst_key).await?;
        if let Some(etag) = response.copy_object_result().and_then(|r| r.e_tag()) {
            info.etag = Some(clean_etag(etag));
        }

        Ok(info)
    }

    /// Create a bucket
    pub async fn mkdir(&self, bucket: &str) -> Result<()> {
        self.retrier
            .execute(|| async move {
                self.inner
                    .create_bucket()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(from_sdk_error)
            })
            .await?;

        Ok(())
    }

    /// Delete an empty bucket
    pub async fn rmdir(&self, bucket: &str) -> Result<()> {
        self.retrier
            .execute(|| async move {
                self.inner
                    .delete_bucket()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(from_sdk_error)
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use s3fs_core::{ErrorKind, RetryConfig, RetryRegistry};

    /// Client pointed at a closed local port
    fn unreachable_client(max_attempts: u32) -> S3Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .credentials_provider(Credentials::new("test", "test", None, None, "s3fs-test"))
            .force_path_style(true)
            .build();
        let retry = RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..RetryConfig::default()
        };
        S3Client::from_conf(
            config,
            Retrier::with_registry(retry, Arc::new(RetryRegistry::new())),
        )
    }

    #[tokio::test]
    async fn test_connection_failure_surfaces_after_retries() {
        let client = unreachable_client(2);
        let err = client.info("bucket", "key").await.unwrap_err();
        let backend = err.backend().expect("connection errors are not remapped");
        assert_eq!(backend.kind(), &ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_rm_files_empty_is_noop() {
        let client = unreachable_client(1);
        assert!(client.rm_files("bucket", &[]).await.unwrap().is_empty());
    }
}
