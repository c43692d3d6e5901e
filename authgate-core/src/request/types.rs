use std::collections::BTreeMap;

use http::Method;

use rst_common::standard::serde::{self, Serialize};

/// Operation names the protocol call a descriptor was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Confirm,
    Deny,
    Revoke,
}

impl Operation {
    pub fn is_decision(&self) -> bool {
        matches!(self, Operation::Confirm | Operation::Deny)
    }
}

/// `RequestDescriptor` is a fully specified, signed, immutable outbound request
///
/// Headers are kept in an ordered map so two descriptors built from the same
/// input compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    operation: Operation,
    method: Method,
    url: String,
    headers: BTreeMap<String, String>,
    body: Option<String>,
}

impl RequestDescriptor {
    pub fn new(
        operation: Operation,
        method: Method,
        url: String,
        headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> Self {
        Self {
            operation,
            method,
            url,
            headers,
            body,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|value| value.as_str())
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// `DecisionBody` is the confirm/deny payload, field order is part of the wire format
#[derive(Debug, Serialize)]
#[serde(crate = "self::serde")]
pub struct DecisionBody<'a> {
    pub confirm: bool,
    pub authorization_code: &'a str,
}
