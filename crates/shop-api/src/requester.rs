//! # Requester
//!
//! Identity and language of the caller as handed over by the fronting
//! platform, plus the guards routes apply to it.

use crate::handlers::{shop_error_to_response, ApiError};
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, HeaderMap},
};
use shop_core::{Account, Language, PermissionCategory, PermissionType, ShopError, SHOP_MODULE};
use std::collections::HashMap;
use tracing::debug;

pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const LANGUAGE_HEADER: &str = "x-language";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The caller of a request
#[derive(Debug, Clone)]
pub struct Requester {
    pub account_id: Option<u64>,
    pub language: Language,
    csrf_token: Option<String>,
}

impl Requester {
    pub fn anonymous(language: Language) -> Self {
        Self {
            account_id: None,
            language,
            csrf_token: None,
        }
    }

    fn from_parts(headers: &HeaderMap, query: &HashMap<String, String>, default: Language) -> Result<Self, ShopError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let account_id = header(ACCOUNT_HEADER)
            .map(|raw| {
                raw.parse::<u64>()
                    .map_err(|_| ShopError::Unauthorized(format!("Invalid account id: {}", raw)))
            })
            .transpose()?;

        let language = query
            .get("lang")
            .map(String::as_str)
            .or_else(|| header(LANGUAGE_HEADER))
            .and_then(Language::parse)
            .unwrap_or(default);

        Ok(Self {
            account_id,
            language,
            csrf_token: header(CSRF_HEADER).map(String::from),
        })
    }

    /// Account id, or `Unauthorized` for anonymous callers
    pub fn require_account(&self) -> Result<u64, ShopError> {
        self.account_id
            .ok_or_else(|| ShopError::Unauthorized("Login required".to_string()))
    }

    /// Double-submit check: the query token must equal the header token
    ///
    /// The token has to arrive twice: as the `csrf` query parameter of the
    /// buy link and as the `X-CSRF-Token` header. The storefront only echoes
    /// the header value into its links; the header itself is injected by the
    /// fronting platform on every request of a logged-in session. A bare link
    /// followed without that header, such as a bookmark or a pasted URL, is
    /// refused with 403.
    pub fn verify_csrf(&self, query_token: Option<&str>) -> Result<(), ShopError> {
        match (query_token, self.csrf_token.as_deref()) {
            (Some(q), Some(h)) if !q.is_empty() && q == h => Ok(()),
            _ => Err(ShopError::Forbidden("Invalid CSRF token".to_string())),
        }
    }

    /// Token the caller presented, for echoing into rendered links
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }
}

impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let query: HashMap<String, String> = Query::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let requester = Self::from_parts(&parts.headers, &query, state.config.default_language)
            .map_err(shop_error_to_response)?;
        debug!(account_id = ?requester.account_id, language = %requester.language, "Resolved requester");
        Ok(requester)
    }
}

/// Load the account and check it holds `Shop/{kind}/{category}`
pub async fn authorize(
    state: &AppState,
    account_id: u64,
    kind: PermissionType,
    category: PermissionCategory,
) -> Result<Account, ShopError> {
    let account = state
        .services
        .accounts
        .find_account(account_id)
        .await?
        .ok_or_else(|| ShopError::Unauthorized(format!("Unknown account {}", account_id)))?;

    if !account.has_permission(SHOP_MODULE, kind, category) {
        return Err(ShopError::Forbidden(format!(
            "Account {} lacks permission {}/{:?}/{:?}",
            account_id, SHOP_MODULE, kind, category
        )));
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_anonymous_requester() {
        let requester = Requester::from_parts(&HeaderMap::new(), &HashMap::new(), Language::De).unwrap();
        assert_eq!(requester.account_id, None);
        assert_eq!(requester.language, Language::De);
        assert!(requester.require_account().is_err());
    }

    #[test]
    fn test_language_precedence() {
        let query = HashMap::from([("lang".to_string(), "en".to_string())]);
        let requester = Requester::from_parts(
            &headers(&[(ACCOUNT_HEADER, "7"), (LANGUAGE_HEADER, "de")]),
            &query,
            Language::De,
        )
        .unwrap();
        assert_eq!(requester.account_id, Some(7));
        assert_eq!(requester.language, Language::En);

        let header_only = Requester::from_parts(&headers(&[(LANGUAGE_HEADER, "de-AT")]), &HashMap::new(), Language::En)
            .unwrap();
        assert_eq!(header_only.language, Language::De);
    }

    #[test]
    fn test_invalid_account_header() {
        let err = Requester::from_parts(&headers(&[(ACCOUNT_HEADER, "abc")]), &HashMap::new(), Language::En)
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_csrf_double_submit() {
        let requester = Requester::from_parts(&headers(&[(CSRF_HEADER, "tok")]), &HashMap::new(), Language::En)
            .unwrap();
        assert!(requester.verify_csrf(Some("tok")).is_ok());
        assert!(requester.verify_csrf(Some("other")).is_err());
        assert!(requester.verify_csrf(None).is_err());

        let without_header = Requester::anonymous(Language::En);
        let err = without_header.verify_csrf(Some("tok")).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
