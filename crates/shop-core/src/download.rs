//! # Gated Downloads
//!
//! Decides per request whether a requester may fetch an item file. Demo and
//! public files are open to everyone; purchase files require an archived
//! bill for the item. Nothing is cached between requests.

use crate::error::{ShopError, ShopResult};
use crate::item::{ItemRef, MediaFile};
use crate::media::MediaExport;
use crate::services::ShopServices;
use tracing::{info, instrument};

pub const DEMO_DOWNLOAD: &str = "item_demo_download";
pub const PUBLIC_DOWNLOAD: &str = "item_public_download";
pub const PURCHASE_DOWNLOAD: &str = "item_purchase_download";

/// Resolve the file and check the requester's entitlement to it.
#[instrument(skip(services))]
pub async fn authorize_download(
    services: &ShopServices,
    item_id: u64,
    file_id: u64,
    account_id: Option<u64>,
) -> ShopResult<MediaFile> {
    let item = services
        .items
        .find(&ItemRef::Id(item_id))
        .await?
        .ok_or_else(|| ShopError::ItemNotFound {
            item: ItemRef::Id(item_id).to_string(),
        })?;

    let file = item
        .file(file_id)
        .cloned()
        .ok_or(ShopError::FileNotFound { file_id })?;

    if file.has_type(DEMO_DOWNLOAD) || file.has_type(PUBLIC_DOWNLOAD) {
        return Ok(file);
    }

    if !file.has_type(PURCHASE_DOWNLOAD) {
        return Err(ShopError::Forbidden(format!(
            "File {} is not downloadable",
            file_id
        )));
    }

    let account_id = account_id.ok_or_else(|| {
        ShopError::Forbidden(format!("File {} requires a purchase", file_id))
    })?;

    let bills = services.billing.archived_with_item(account_id, item.id).await?;
    if bills.is_empty() {
        return Err(ShopError::Forbidden(format!(
            "No paid bill for item {} on account {}",
            item.number, account_id
        )));
    }

    info!(
        "Purchase download granted for item {} to account {} (bill {})",
        item.number, account_id, bills[0].number
    );
    Ok(file)
}

/// Authorize, then export the file contents.
pub async fn download(
    services: &ShopServices,
    item_id: u64,
    file_id: u64,
    account_id: Option<u64>,
) -> ShopResult<MediaExport> {
    let file = authorize_download(services, item_id, file_id, account_id).await?;
    services.media.export(&file).await
}
