//! # Shop Error Types
//!
//! Typed error handling for the shop module.
//! All shop operations return `Result<T, ShopError>`.

use thiserror::Error;

/// Core error type for all shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, no payment provider)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A required request or record field is blank
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// An attribute the workflow depends on is absent or blank
    #[error("Missing attribute '{attribute}' on {owner}")]
    MissingAttribute { owner: String, attribute: String },

    /// Account not found
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: u64 },

    /// Item not found in catalog
    #[error("Item not found: {item}")]
    ItemNotFound { item: String },

    /// Item file not found
    #[error("File not found: {file_id}")]
    FileNotFound { file_id: u64 },

    /// Bill not found
    #[error("Bill not found: {bill}")]
    BillNotFound { bill: String },

    /// No tax combination for the client/item classification
    #[error("No tax code for client code '{client_code}' and item code '{item_code}'")]
    TaxCodeNotFound {
        client_code: String,
        item_code: String,
    },

    /// Attempt to finalize a bill without elements
    #[error("Bill {bill} has no elements")]
    EmptyBill { bill: String },

    /// Requester is not authenticated
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Requester lacks permission or entitlement
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Checkout session creation failed
    #[error("Checkout creation failed: {0}")]
    CheckoutCreationFailed(String),

    /// Backing store failure (lock poisoning, I/O)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShopError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_) | ShopError::ProviderError { .. } | ShopError::Storage(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::MissingField { .. } => 400,
            ShopError::MissingAttribute { .. } => 422,
            ShopError::AccountNotFound { .. } => 404,
            ShopError::ItemNotFound { .. } => 404,
            ShopError::FileNotFound { .. } => 404,
            ShopError::BillNotFound { .. } => 404,
            ShopError::TaxCodeNotFound { .. } => 422,
            ShopError::EmptyBill { .. } => 422,
            ShopError::Unauthorized(_) => 401,
            ShopError::Forbidden(_) => 403,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::WebhookVerificationFailed(_) => 401,
            ShopError::WebhookParseError(_) => 400,
            ShopError::CheckoutCreationFailed(_) => 500,
            ShopError::Storage(_) => 500,
            ShopError::Internal(_) => 500,
            ShopError::Serialization(_) => 500,
        }
    }

    pub(crate) fn missing_attribute(owner: impl Into<String>, attribute: &str) -> Self {
        ShopError::MissingAttribute {
            owner: owner.into(),
            attribute: attribute.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShopError {
    fn from(err: toml::de::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::NetworkError("timeout".into()).is_retryable());
        assert!(ShopError::ProviderError {
            provider: "stripe".into(),
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(!ShopError::Forbidden("no bill".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            ShopError::ItemNotFound { item: "x".into() }.status_code(),
            404
        );
        assert_eq!(ShopError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(
            ShopError::missing_attribute("item 1", "sales_tax_code").status_code(),
            422
        );
    }

    #[test]
    fn test_missing_attribute_message() {
        let err = ShopError::missing_attribute("item 7", "one_click_pay_cc");
        assert_eq!(
            err.to_string(),
            "Missing attribute 'one_click_pay_cc' on item 7"
        );
    }
}
