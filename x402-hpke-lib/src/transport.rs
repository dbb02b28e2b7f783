//! Transport model: the validated semantic message the codec seals or opens.
//!
//! A transport is the quintuple `(type, content, http_response_code?,
//! extensions?)`. Each [`TransportType`] is a distinct variant with its own
//! validation rules, enforced once at construction so that everything
//! downstream (AAD building, sealing) operates on normalized data.
//!
//! | Type             | code constraint            | headerCore              | body    |
//! |------------------|----------------------------|-------------------------|---------|
//! | OtherRequest     | must be absent             | none                    | content |
//! | OtherResponse    | required, never 402        | none                    | content |
//! | PaymentRequired  | absent or 402 (coerced)    | none                    | content |
//! | PaymentResponse  | absent or 200 (coerced)    | X-Payment-Response      | `{}`    |
//! | Payment          | must be absent             | X-Payment               | `{}`    |

use serde_json::{Map, Value};

use crate::{Result, X402Error};

/// Canonical name of the payment header.
pub const HEADER_X_PAYMENT: &str = "X-Payment";

/// Canonical name of the payment-response header.
pub const HEADER_X_PAYMENT_RESPONSE: &str = "X-Payment-Response";

/// Empty-string sentinel marking a Payment-Required body reassignment.
pub const HEADER_PAYMENT_REQUIRED_MARKER: &str = "";

/// Semantic role of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportType {
    /// A payment submission; content must carry a `payload` key.
    Payment,
    /// A settlement confirmation; always HTTP 200.
    PaymentResponse,
    /// A 402 quote; content moves into the body.
    PaymentRequired,
    /// Any non-payment request.
    OtherRequest,
    /// Any non-payment response (never 402).
    OtherResponse,
}

/// One authenticated header entry: name, JSON value, and free-form extras.
///
/// Extras ride along into the AAD but may not shadow the `name` or `value`
/// keys of the serialized entry.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderEntry {
    /// Header name (canonical casing once normalized).
    pub name: String,
    /// The header's JSON value.
    pub value: Value,
    /// Additional authenticated keys.
    pub extras: Map<String, Value>,
}

impl HeaderEntry {
    /// Create an entry with no extras.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            extras: Map::new(),
        }
    }

    /// Create an entry carrying extra authenticated keys.
    pub fn with_extras(name: impl Into<String>, value: Value, extras: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            value,
            extras,
        }
    }

    /// Serialized form used inside the AAD headers array.
    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("value".to_string(), self.value.clone());
        for (k, v) in &self.extras {
            if k != "name" && k != "value" {
                map.insert(k.clone(), v.clone());
            }
        }
        Value::Object(map)
    }

    /// Parse an entry back out of an AAD headers-array element.
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or(X402Error::InvalidEnvelope)?;
        let name = map
            .get("name")
            .and_then(Value::as_str)
            .ok_or(X402Error::InvalidEnvelope)?
            .to_string();
        let entry_value = map.get("value").ok_or(X402Error::InvalidEnvelope)?.clone();
        let mut extras = Map::new();
        for (k, v) in map {
            if k != "name" && k != "value" {
                extras.insert(k.clone(), v.clone());
            }
        }
        Ok(Self {
            name,
            value: entry_value,
            extras,
        })
    }

    /// Whether this is one of the core payment header names.
    pub(crate) fn is_core_payment(&self) -> bool {
        self.name.eq_ignore_ascii_case(HEADER_X_PAYMENT)
            || self.name.eq_ignore_ascii_case(HEADER_X_PAYMENT_RESPONSE)
    }
}

/// A validated, normalized message ready for sealing.
#[derive(Clone, Debug)]
pub struct SecureTransport {
    header_core: Option<HeaderEntry>,
    body: Map<String, Value>,
    extensions: Vec<HeaderEntry>,
    http_response_code: Option<u16>,
}

impl SecureTransport {
    /// Validate and normalize a message.
    ///
    /// `content` must be a JSON object. Extension entries are shape-checked
    /// here (non-empty object payloads); registry approval happens when the
    /// AAD is built, against the codec instance's registry.
    ///
    /// # Errors
    ///
    /// Each violated precondition maps to its own [`X402Error`] variant, so
    /// integrators can surface actionable diagnostics.
    pub fn new(
        kind: TransportType,
        content: Value,
        http_response_code: Option<u16>,
        extensions: Vec<HeaderEntry>,
    ) -> Result<Self> {
        let content = match content {
            Value::Object(map) => map,
            _ => return Err(X402Error::ContentObject),
        };

        for ext in &extensions {
            let non_empty_object = ext.value.as_object().is_some_and(|m| !m.is_empty());
            if !non_empty_object {
                return Err(X402Error::ExtensionPayload {
                    name: ext.name.clone(),
                });
            }
        }

        let (header_core, body, effective_code) = match kind {
            TransportType::OtherRequest => {
                if http_response_code.is_some() {
                    return Err(X402Error::OtherRequestHttpCode);
                }
                (None, content, None)
            }
            TransportType::OtherResponse => {
                if http_response_code == Some(402) {
                    return Err(X402Error::OtherResponse402);
                }
                (None, content, http_response_code)
            }
            TransportType::PaymentRequired => {
                if content.is_empty() {
                    return Err(X402Error::PaymentRequiredContent);
                }
                if let Some(code) = http_response_code {
                    if code != 402 {
                        tracing::warn!(code, "PAYMENT_REQUIRED coerced to HTTP 402");
                    }
                }
                (None, content, Some(402))
            }
            TransportType::PaymentResponse => {
                if content.is_empty() {
                    return Err(X402Error::PaymentResponseContent);
                }
                if http_response_code.is_some() && http_response_code != Some(200) {
                    return Err(X402Error::PaymentResponseHttpCode);
                }
                let header = HeaderEntry::new(HEADER_X_PAYMENT_RESPONSE, Value::Object(content));
                (Some(header), Map::new(), Some(200))
            }
            TransportType::Payment => {
                if http_response_code.is_some() {
                    return Err(X402Error::PaymentHttpCode);
                }
                if !content.contains_key("payload") {
                    return Err(X402Error::PaymentPayload);
                }
                let header = HeaderEntry::new(HEADER_X_PAYMENT, Value::Object(content));
                (Some(header), Map::new(), None)
            }
        };

        Ok(Self {
            header_core,
            body,
            extensions,
            http_response_code: effective_code,
        })
    }

    /// A payment submission (`content` must carry a `payload` key).
    pub fn payment(content: Value, extensions: Vec<HeaderEntry>) -> Result<Self> {
        Self::new(TransportType::Payment, content, None, extensions)
    }

    /// A settlement confirmation.
    pub fn payment_response(content: Value, extensions: Vec<HeaderEntry>) -> Result<Self> {
        Self::new(TransportType::PaymentResponse, content, None, extensions)
    }

    /// A 402 Payment Required quote.
    pub fn payment_required(content: Value, extensions: Vec<HeaderEntry>) -> Result<Self> {
        Self::new(TransportType::PaymentRequired, content, None, extensions)
    }

    /// A generic request.
    pub fn request(content: Value, extensions: Vec<HeaderEntry>) -> Result<Self> {
        Self::new(TransportType::OtherRequest, content, None, extensions)
    }

    /// A generic response with its HTTP status.
    pub fn response(content: Value, code: u16, extensions: Vec<HeaderEntry>) -> Result<Self> {
        Self::new(TransportType::OtherResponse, content, Some(code), extensions)
    }

    /// The core payment header, if this message type produces one.
    pub fn header_core(&self) -> Option<&HeaderEntry> {
        self.header_core.as_ref()
    }

    /// The normalized body object.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Extension header entries, in input order.
    pub fn extensions(&self) -> &[HeaderEntry] {
        &self.extensions
    }

    /// The effective HTTP response code after validation/coercion.
    pub fn http_response_code(&self) -> Option<u16> {
        self.http_response_code
    }

    /// All header entries: the core header (if any) followed by extensions.
    pub(crate) fn headers(&self) -> Vec<HeaderEntry> {
        let mut headers = Vec::with_capacity(self.extensions.len() + 1);
        if let Some(core) = &self.header_core {
            headers.push(core.clone());
        }
        headers.extend(self.extensions.iter().cloned());
        headers
    }
}
