// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Topic creation through the object gateway's SNS-compatible API.
//!
//! `radosgw-admin` reads and removes topics but cannot create them. `CreateTopic` is a
//! form-encoded POST to the object store endpoint, signed with the S3 v2 header scheme
//! RGW accepts for SNS calls:
//!
//! ```text
//! Authorization: AWS <access key>:base64(hmac-sha1(secret, "POST\n\n<content type>\n<date>\n<path>"))
//! ```
//!
//! The request body carries the push endpoint with its credentials and is never logged.

use super::types::{S3Key, TopicParams};
use crate::constants::RGW_HTTP_TIMEOUT_SECS;
use crate::exec::CommandError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::Client as HttpClient;
use sha1::Sha1;
use std::time::Duration;
use tracing::{debug, error};
use url::{form_urlencoded, Url};

/// Content type of every SNS request, part of the signed string
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const CREATE_TOPIC: &str = "CreateTopic";

/// Form body of a `CreateTopic` call. Attributes are numbered from 1 in key order.
#[must_use]
pub fn create_topic_form(params: &TopicParams) -> String {
    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("Action", CREATE_TOPIC);
    form.append_pair("Name", &params.name);
    for (n, (key, value)) in params.attributes.iter().enumerate() {
        form.append_pair(&format!("Attributes.entry.{}.key", n + 1), key);
        form.append_pair(&format!("Attributes.entry.{}.value", n + 1), value);
    }
    form.finish()
}

/// `Authorization` header for a POST to `path` dated `date`.
///
/// # Errors
///
/// Returns [`CommandError::Http`] if the MAC rejects the key.
pub fn authorization(key: &S3Key, date: &str, path: &str) -> Result<String, CommandError> {
    let string_to_sign = format!("POST\n\n{FORM_CONTENT_TYPE}\n{date}\n{path}");
    let mut mac = Hmac::<Sha1>::new_from_slice(key.secret_key.as_bytes()).map_err(|e| {
        CommandError::Http {
            action: CREATE_TOPIC.to_string(),
            endpoint: path.to_string(),
            status: None,
            message: format!("invalid signing key: {e}"),
        }
    })?;
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());
    Ok(format!("AWS {}:{signature}", key.access_key))
}

/// The `TopicArn` element of a `CreateTopic` response.
#[must_use]
pub fn topic_arn(response: &str) -> Option<&str> {
    const OPEN: &str = "<TopicArn>";
    let start = response.find(OPEN)? + OPEN.len();
    let end = start + response[start..].find("</TopicArn>")?;
    Some(response[start..end].trim()).filter(|arn| !arn.is_empty())
}

/// SNS client for one operator, shared by every object store.
#[derive(Clone, Default)]
pub struct SnsClient {
    client: HttpClient,
}

impl SnsClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
        }
    }

    /// Creates the topic, or updates its attributes if it exists, and returns its ARN.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Http`] if the endpoint is not a URL, the request fails, RGW
    /// answers with a non-success status, or the response holds no ARN.
    pub async fn create_topic(
        &self,
        endpoint: &str,
        key: &S3Key,
        params: &TopicParams,
    ) -> Result<String, CommandError> {
        let failure = |status: Option<u16>, message: String| CommandError::Http {
            action: CREATE_TOPIC.to_string(),
            endpoint: endpoint.to_string(),
            status,
            message,
        };

        let url = Url::parse(endpoint).map_err(|e| failure(None, e.to_string()))?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S %z").to_string();
        let signature = authorization(key, &date, url.path())?;

        debug!(endpoint = %endpoint, topic = %params.name, "sending CreateTopic");
        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(RGW_HTTP_TIMEOUT_SECS))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(DATE, &date)
            .header(AUTHORIZATION, signature)
            .body(create_topic_form(params))
            .send()
            .await
            .map_err(|e| failure(None, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| failure(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            error!(endpoint = %endpoint, topic = %params.name, status = %status, "CreateTopic rejected");
            return Err(failure(Some(status.as_u16()), body));
        }

        topic_arn(&body)
            .map(str::to_string)
            .ok_or_else(|| failure(Some(status.as_u16()), "response carries no TopicArn".into()))
    }
}

#[cfg(test)]
#[path = "sns_tests.rs"]
mod sns_tests;
