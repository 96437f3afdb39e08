//! Bucket-level S3 requests
//!
//! `object_store` only works inside an existing bucket, so the ACL lookup,
//! bucket creation and bucket deletion go through the AWS SDK instead.

use crate::backend::S3Settings;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::{Client, Config as S3Config};
use bucketfs_core::client::{AclGrant, BucketAcl, ClientError, ClientResult};
use std::env;
use tracing::debug;

/// Region S3 assumes when none is configured
const DEFAULT_REGION: &str = "us-east-1";

/// SDK client for the requests that address a bucket as a whole
#[derive(Debug, Clone)]
pub(crate) struct S3Buckets {
    client: Client,
    region: String,
}

impl S3Buckets {
    /// Build a client from the settings, falling back to the same `AWS_*`
    /// variables the object client reads
    pub(crate) fn new(settings: &S3Settings) -> Self {
        let region = settings
            .region
            .clone()
            .or_else(|| env_var("AWS_REGION"))
            .or_else(|| env_var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = settings
            .endpoint
            .clone()
            .or_else(|| env_var("AWS_ENDPOINT_URL"))
            .or_else(|| env_var("AWS_ENDPOINT"));

        let mut builder = S3Config::builder()
            .region(Region::new(region.clone()))
            .behavior_version(BehaviorVersion::latest());

        if let (Some(key), Some(secret)) = (env_var("AWS_ACCESS_KEY_ID"), env_var("AWS_SECRET_ACCESS_KEY")) {
            let credentials = Credentials::new(key, secret, env_var("AWS_SESSION_TOKEN"), None, "bucketfs");
            builder = builder.credentials_provider(credentials);
        }

        // S3-compatible services are addressed by path, not virtual host
        if let Some(endpoint) = &endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            region,
        }
    }

    pub(crate) async fn acl(&self, bucket: &str) -> ClientResult<BucketAcl> {
        let output = self
            .client
            .get_bucket_acl()
            .bucket(bucket)
            .send()
            .await
            .map_err(sdk_error)?;

        let owner = output
            .owner()
            .and_then(|o| o.display_name().or(o.id()))
            .map(str::to_string);
        let grants = output
            .grants()
            .iter()
            .map(|grant| {
                let grantee = grant
                    .grantee()
                    .and_then(|g| g.display_name().or(g.id()).or(g.uri()).or(g.email_address()))
                    .unwrap_or_default();
                AclGrant {
                    grantee: grantee.to_string(),
                    permission: grant.permission().map(|p| p.as_str().to_string()).unwrap_or_default(),
                }
            })
            .collect();

        Ok(BucketAcl { owner, grants })
    }

    pub(crate) async fn create(&self, bucket: &str) -> ClientResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if let Some(constraint) = location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }
        request.send().await.map_err(sdk_error)?;
        debug!("Created S3 bucket {} in {}", bucket, self.region);
        Ok(())
    }

    pub(crate) async fn delete(&self, bucket: &str) -> ClientResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// `us-east-1` rejects an explicit location constraint
fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    (region != DEFAULT_REGION).then(|| BucketLocationConstraint::from(region))
}

/// Keep the service code and HTTP status the SDK reports
fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    let mut mapped = match code {
        Some(code) => ClientError::with_code(code, message),
        None => crate::client::from_message(message),
    };
    if let Some(status) = status {
        mapped = mapped.status(status);
    }
    mapped.caused_by(err)
}
