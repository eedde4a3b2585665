//! AI image-edit collaborator contract.
//!
//! The service is a black box: one source image, optional mask and
//! reference images, and a text instruction go in; one image or a typed
//! failure comes out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiEditError {
    #[error("Layer {0} is not an image layer")]
    NotAnImage(String),

    #[error("Layer {0} has no loaded image to edit")]
    MediaNotReady(String),

    #[error("Nothing to revert on layer {0}")]
    NothingToRevert(String),

    #[error("Image service rejected the request: {0}")]
    Rejected(String),

    #[error("Image service unavailable: {0}")]
    Unavailable(String),

    #[error("Image service returned an unusable result: {0}")]
    InvalidResponse(String),
}

/// What to do with the source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageEditOperation {
    RemoveBackground,
    Instruct { instruction: String },
}

impl ImageEditOperation {
    /// Background removal keeps the original so it can be undone in place.
    pub fn is_reversible(&self) -> bool {
        matches!(self, ImageEditOperation::RemoveBackground)
    }

    pub fn instruction(&self) -> &str {
        match self {
            ImageEditOperation::RemoveBackground => "Remove the background, keep the subject.",
            ImageEditOperation::Instruct { instruction } => instruction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEditRequest {
    /// Content reference of the source image.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    pub operation: ImageEditOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEditResponse {
    /// Content reference of the produced image (`data:`, `blob:` or path).
    pub src: String,
}

#[async_trait]
pub trait ImageEditService: Send + Sync {
    async fn edit(&self, request: ImageEditRequest) -> Result<ImageEditResponse, AiEditError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json() {
        let request = ImageEditRequest {
            source: "a.png".into(),
            mask: None,
            references: vec![],
            operation: ImageEditOperation::Instruct {
                instruction: "make it blue".into(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["operation"]["kind"], "instruct");
        assert!(value.get("mask").is_none());
        assert!(!request.operation.is_reversible());
        assert!(ImageEditOperation::RemoveBackground.is_reversible());
    }
}
