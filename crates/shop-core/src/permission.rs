//! # Permissions
//!
//! Module permissions an account may hold. Routes declare which
//! `(module, type, category)` triple they require.

use serde::{Deserialize, Serialize};

/// Module name used for shop permissions
pub const SHOP_MODULE: &str = "Shop";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    Read,
    Create,
    Modify,
    Delete,
}

/// Permission categories of the shop module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Article = 1,
    Buyer = 2,
    Seller = 3,
    Shop = 4,
    Buy = 5,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub module: String,
    #[serde(rename = "type")]
    pub kind: PermissionType,
    pub category: PermissionCategory,
}

impl Permission {
    pub fn shop(kind: PermissionType, category: PermissionCategory) -> Self {
        Self {
            module: SHOP_MODULE.to_string(),
            kind,
            category,
        }
    }

    pub fn matches(&self, module: &str, kind: PermissionType, category: PermissionCategory) -> bool {
        self.module == module && self.kind == kind && self.category == category
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:?}/{:?}", self.module, self.kind, self.category)
    }
}
