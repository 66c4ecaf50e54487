use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LauncherError;

pub mod bundlr;
pub mod data_item;

pub use bundlr::BundlrStorage;

/// Something that takes a file and hands back a URI it can be fetched from.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    async fn upload(&self, file: &AssetFile) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The JSON document the on-chain metadata URI points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
}

impl AssetFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self, LauncherError> {
        let bytes = std::fs::read(path).map_err(|source| LauncherError::Asset {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }
}

pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

pub async fn upload_metadata(
    storage: &dyn AssetStorage,
    metadata: &OffChainMetadata,
) -> Result<String> {
    let file = AssetFile::new("metadata.json", serde_json::to_vec(metadata)?);
    storage.upload(&file).await
}

/// Uploads the image, then a metadata document pointing at it.
/// Returns `(image_uri, metadata_uri)`.
pub async fn upload_assets(
    storage: &dyn AssetStorage,
    image: &Path,
    name: &str,
    description: &str,
) -> Result<(String, String)> {
    let file = AssetFile::read(image)?;

    let image_uri = storage.upload(&file).await?;
    println!("image uri: {}", image_uri);

    let uri = upload_metadata(
        storage,
        &OffChainMetadata {
            name: name.to_string(),
            description: description.to_string(),
            image: image_uri.clone(),
        },
    )
    .await?;
    println!("metadata uri: {}", uri);

    Ok((image_uri, uri))
}
