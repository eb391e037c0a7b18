// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Federal Tax Service (FTS) mobile API client.
//!
//! The upstream only talks to its own mobile app, so every request carries
//! that app's device headers. Receipt lookups may answer 202 while the
//! receipt is still being processed; the client polls a bounded number of
//! times before giving up.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
    Client, Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

/// Extra receipt requests after the first one answers 202.
pub const RECEIPT_RETRIES: usize = 10;

const DEVICE_OS: &str = "Adnroid 4.4.4";
const API_VERSION: &str = "2";
const CLIENT_VERSION: &str = "1.4.1.3";
const CLIENT_USER_AGENT: &str = "okhttp/3.0.1";

#[derive(Debug, thiserror::Error)]
pub enum FtsError {
    /// Upstream answered with a non-success status.
    #[error("FTS responded with {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The receipt was still processing after every retry.
    #[error("Empty JSON response")]
    EmptyResponse,

    #[error("FTS response was invalid: {0}")]
    InvalidResponse(String),

    #[error("FTS request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("FTS client misconfigured: {0}")]
    Client(String),
}

impl FtsError {
    /// Signup failed because the phone is already registered upstream.
    pub fn is_user_exists(&self) -> bool {
        match self {
            FtsError::Upstream { status, body } => {
                *status == StatusCode::CONFLICT.as_u16() || body.trim().eq_ignore_ascii_case("user exists")
            }
            _ => false,
        }
    }
}

/// Three-part fiscal identifier printed on a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptIdentifier {
    /// Fiscal drive number (ФН)
    pub fn_number: u64,
    /// Fiscal document number (ФД)
    pub fd: u64,
    /// Fiscal sign (ФП)
    pub fp: u64,
}

/// Receipt position normalized to a unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptLineItem {
    /// Product name
    pub name: String,
    /// Number of units
    pub quantity: i64,
    /// Price of one unit
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct FtsClient {
    base_url: Url,
    http: Client,
    device_id: String,
}

impl FtsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FtsError> {
        let base_url = Url::parse(base_url).map_err(|e| FtsError::Client(format!("base url {base_url}: {e}")))?;
        let device_id = Uuid::new_v4().simple().to_string();

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(device_headers(&device_id)?)
            .build()
            .map_err(|e| FtsError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            http,
            device_id,
        })
    }

    /// Identifier presented to the upstream as `Device-Id`.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Register a phone upstream; the upstream then sends the key by SMS.
    pub async fn register_user(&self, name: &str, email: &str, phone: &str) -> Result<(), FtsError> {
        let url = self.endpoint("/v1/mobile/users/signup")?;
        let body = json!({ "name": name, "email": email, "phone": phone });
        let response = self.http.post(url).json(&body).send().await?;
        ensure_success(response).await?;
        info!(phone = %phone, "FTS signup accepted");
        Ok(())
    }

    /// Ask the upstream to resend the key by SMS.
    pub async fn restore_password(&self, phone: &str) -> Result<(), FtsError> {
        let url = self.endpoint("/v1/mobile/users/restore")?;
        let response = self.http.post(url).json(&json!({ "phone": phone })).send().await?;
        ensure_success(response).await?;
        info!(phone = %phone, "FTS password restore requested");
        Ok(())
    }

    /// Whether the upstream accepts `phone`/`key`.
    ///
    /// Any HTTP answer is a verdict; only transport failures are errors.
    pub async fn check_credentials(&self, phone: &str, key: &str) -> Result<bool, FtsError> {
        let url = self.endpoint("/v1/mobile/users/login")?;
        let response = self.http.get(url).basic_auth(phone, Some(key)).send().await?;
        let accepted = response.status().is_success();
        debug!(phone = %phone, status = %response.status(), accepted, "FTS credential check");
        Ok(accepted)
    }

    /// Fetch a receipt and normalize its positions.
    pub async fn fetch_receipt(
        &self,
        id: ReceiptIdentifier,
        phone: &str,
        key: &str,
    ) -> Result<Vec<ReceiptLineItem>, FtsError> {
        let url = self.receipt_url(id)?;
        let request = || self.http.get(url.clone()).basic_auth(phone, Some(key));

        let mut response = request().send().await?;
        let mut retries = 0;
        while response.status() == StatusCode::ACCEPTED && retries < RECEIPT_RETRIES {
            retries += 1;
            debug!(retries, fn_number = id.fn_number, fd = id.fd, "Receipt still processing");
            response = request().send().await?;
        }

        if response.status() == StatusCode::ACCEPTED {
            warn!(fn_number = id.fn_number, fd = id.fd, "Receipt not ready after all retries");
            return Err(FtsError::EmptyResponse);
        }
        if response.status() != StatusCode::OK {
            return Err(upstream_error(response).await);
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| FtsError::InvalidResponse(format!("receipt body: {e}")))?;
        normalize_items(&document)
    }

    fn endpoint(&self, path: &str) -> Result<Url, FtsError> {
        self.base_url
            .join(path)
            .map_err(|e| FtsError::Client(format!("endpoint {path}: {e}")))
    }

    fn receipt_url(&self, id: ReceiptIdentifier) -> Result<Url, FtsError> {
        let mut url = self.endpoint(&format!("/v1/inns/*/kkts/*/fss/{}/tickets/{}", id.fn_number, id.fd))?;
        url.query_pairs_mut()
            .append_pair("fiscalSign", &id.fp.to_string())
            .append_pair("sendToEmail", "no");
        Ok(url)
    }
}

fn device_headers(device_id: &str) -> Result<HeaderMap, FtsError> {
    let pairs = [
        ("device-id", device_id),
        ("device-os", DEVICE_OS),
        ("version", API_VERSION),
        ("clientversion", CLIENT_VERSION),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value).map_err(|e| FtsError::Client(format!("header {name}: {e}")))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    Ok(headers)
}

async fn ensure_success(response: Response) -> Result<(), FtsError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(upstream_error(response).await)
    }
}

async fn upstream_error(response: Response) -> FtsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(status, body = %body, "FTS request rejected");
    FtsError::Upstream { status, body }
}

/// Extract `document.receipt.items` as unit-priced line items.
///
/// Weighted goods report a fractional quantity; those become a single unit
/// priced at the position total (`sum`).
pub fn normalize_items(document: &Value) -> Result<Vec<ReceiptLineItem>, FtsError> {
    let items = document
        .pointer("/document/receipt/items")
        .and_then(Value::as_array)
        .ok_or_else(|| FtsError::InvalidResponse("missing document.receipt.items".into()))?;

    items.iter().map(normalize_item).collect()
}

fn normalize_item(item: &Value) -> Result<ReceiptLineItem, FtsError> {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| FtsError::InvalidResponse("item without name".into()))?;

    let (quantity, price_field) = match item.get("quantity").and_then(Value::as_i64) {
        Some(quantity) => (quantity, "price"),
        None => (1, "sum"),
    };
    let price = item
        .get(price_field)
        .and_then(Value::as_f64)
        .ok_or_else(|| FtsError::InvalidResponse(format!("item '{name}' without {price_field}")))?;

    Ok(ReceiptLineItem {
        name: name.to_string(),
        quantity,
        price,
    })
}
