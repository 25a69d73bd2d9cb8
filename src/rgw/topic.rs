// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bucket notification topic helpers: endpoint validation, push endpoint URL assembly,
//! topic attributes and ARN parsing.

use super::types::RgwTopic;
use crate::crd::{SecretKeyRef, TopicEndpointSpec};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use url::{form_urlencoded, Url};

/// Topic attribute carrying the push endpoint URL
pub const PUSH_ENDPOINT: &str = "push-endpoint";

/// Endpoint protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Http,
    Amqp,
    Kafka,
}

impl EndpointKind {
    fn schemes(self) -> &'static [&'static str] {
        match self {
            Self::Http => &["http", "https"],
            Self::Amqp => &["amqp", "amqps"],
            Self::Kafka => &["kafka"],
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Amqp => "amqp",
            Self::Kafka => "kafka",
        })
    }
}

/// The endpoint variant of a topic, borrowed from its spec.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub kind: EndpointKind,
    pub uri: &'a str,
    pub user_ref: Option<&'a SecretKeyRef>,
    pub password_ref: Option<&'a SecretKeyRef>,
}

/// Returns the single configured endpoint.
///
/// # Errors
///
/// Returns a description of the problem when zero or several endpoint kinds are set, the
/// URI is empty, or its scheme does not match the endpoint kind.
pub fn endpoint(spec: &TopicEndpointSpec) -> Result<Endpoint<'_>, String> {
    let mut found = Vec::new();
    if let Some(http) = &spec.http {
        found.push(Endpoint {
            kind: EndpointKind::Http,
            uri: &http.uri,
            user_ref: http.user_secret_ref.as_ref(),
            password_ref: http.password_secret_ref.as_ref(),
        });
    }
    if let Some(amqp) = &spec.amqp {
        found.push(Endpoint {
            kind: EndpointKind::Amqp,
            uri: &amqp.uri,
            user_ref: amqp.user_secret_ref.as_ref(),
            password_ref: amqp.password_secret_ref.as_ref(),
        });
    }
    if let Some(kafka) = &spec.kafka {
        found.push(Endpoint {
            kind: EndpointKind::Kafka,
            uri: &kafka.uri,
            user_ref: kafka.user_secret_ref.as_ref(),
            password_ref: kafka.password_secret_ref.as_ref(),
        });
    }

    let endpoint = match found.as_slice() {
        [one] => *one,
        [] => return Err("exactly one endpoint must be set, found none".to_string()),
        _ => {
            return Err(format!(
                "exactly one endpoint must be set, found {}",
                found.len()
            ))
        }
    };

    if endpoint.uri.trim().is_empty() {
        return Err(format!("{} endpoint uri must not be empty", endpoint.kind));
    }
    let scheme = endpoint
        .uri
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .unwrap_or_default();
    if !endpoint.kind.schemes().contains(&scheme.as_str()) {
        return Err(format!(
            "{} endpoint uri {:?} must use one of the schemes {:?}",
            endpoint.kind,
            redact_endpoint(endpoint.uri),
            endpoint.kind.schemes()
        ));
    }
    Ok(endpoint)
}

/// Builds the push endpoint URL, embedding credentials as userinfo.
///
/// Without credentials the URI is returned unchanged.
///
/// # Errors
///
/// Returns an error if the URI cannot be parsed or cannot carry userinfo.
pub fn push_endpoint_url(uri: &str, credentials: Option<(&str, &str)>) -> Result<String> {
    let Some((user, password)) = credentials else {
        return Ok(uri.to_string());
    };

    let mut url = Url::parse(uri).with_context(|| format!("invalid endpoint uri {uri:?}"))?;
    url.set_username(user)
        .map_err(|()| anyhow!("endpoint uri {uri:?} cannot carry a user name"))?;
    url.set_password(Some(password))
        .map_err(|()| anyhow!("endpoint uri {uri:?} cannot carry a password"))?;
    Ok(url.to_string())
}

/// Replaces the password of an endpoint URL for logging.
#[must_use]
pub fn redact_endpoint(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "***".to_string();
            }
            url.to_string()
        }
        Err(_) if endpoint.contains('@') => "***".to_string(),
        Err(_) => endpoint.to_string(),
    }
}

/// Topic attributes sent to RGW for `spec`, with `push_endpoint` as the endpoint URL.
#[must_use]
pub fn topic_attributes(
    opaque_data: Option<&str>,
    persistent: bool,
    spec: &TopicEndpointSpec,
    push_endpoint: &str,
) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    attrs.insert(
        "OpaqueData".to_string(),
        opaque_data.unwrap_or_default().to_string(),
    );
    attrs.insert("persistent".to_string(), persistent.to_string());
    attrs.insert(PUSH_ENDPOINT.to_string(), push_endpoint.to_string());

    if let Some(amqp) = &spec.amqp {
        attrs.insert("amqp-exchange".to_string(), amqp.exchange.clone());
        if let Some(ack) = &amqp.ack_level {
            attrs.insert("amqp-ack-level".to_string(), ack.clone());
        }
        attrs.insert(
            "verify-ssl".to_string(),
            (!amqp.disable_verify_ssl).to_string(),
        );
    }
    if let Some(http) = &spec.http {
        attrs.insert(
            "verify-ssl".to_string(),
            (!http.disable_verify_ssl).to_string(),
        );
        if http.send_cloud_events {
            attrs.insert("cloudevents".to_string(), "true".to_string());
        }
    }
    if let Some(kafka) = &spec.kafka {
        attrs.insert("use-ssl".to_string(), kafka.use_ssl.to_string());
        if let Some(ack) = &kafka.ack_level {
            attrs.insert("kafka-ack-level".to_string(), ack.clone());
        }
        if let Some(mechanism) = &kafka.mechanism {
            attrs.insert("mechanism".to_string(), mechanism.clone());
        }
        attrs.insert(
            "verify-ssl".to_string(),
            (!kafka.disable_verify_ssl).to_string(),
        );
    }
    attrs
}

/// Attributes of a live topic: its stored endpoint arguments, with the push endpoint,
/// opaque data and persistence taken from their dedicated fields.
#[must_use]
pub fn live_attributes(topic: &RgwTopic) -> BTreeMap<String, String> {
    let mut attrs: BTreeMap<String, String> =
        form_urlencoded::parse(topic.dest.push_endpoint_args.as_bytes())
            .into_owned()
            .collect();
    attrs.insert(PUSH_ENDPOINT.to_string(), topic.dest.push_endpoint.clone());
    attrs.insert("OpaqueData".to_string(), topic.opaque_data.clone());
    attrs.insert("persistent".to_string(), topic.dest.persistent.to_string());
    attrs
}

/// A parsed topic ARN (`arn:aws:sns:<zonegroup>:<tenant>:<topic>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicArn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource: String,
}

impl TopicArn {
    /// Parses and validates a topic ARN.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not an ARN, its service is not `sns`, or it
    /// names no topic.
    pub fn parse(arn: &str) -> Result<Self> {
        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        let [prefix, partition, service, region, account, resource] = parts.as_slice() else {
            bail!("ARN {arn:?} must have 6 sections");
        };
        if *prefix != "arn" {
            bail!("ARN {arn:?} must start with \"arn:\"");
        }
        if !service.eq_ignore_ascii_case("sns") {
            bail!("ARN {arn:?} must have 'sns' service");
        }
        if resource.is_empty() {
            bail!("ARN {arn:?} is missing a topic");
        }
        Ok(Self {
            partition: (*partition).to_string(),
            service: (*service).to_string(),
            region: (*region).to_string(),
            account: (*account).to_string(),
            resource: (*resource).to_string(),
        })
    }
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod topic_tests;
