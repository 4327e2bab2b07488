//! GUI renderer boundary (content parsing and preparation).

use apl_client_shared::Result;
use serde_json::Value;

/// Everything needed to render one document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Raw document JSON.
    pub document: Value,
    /// Raw data sources JSON.
    pub data: Value,
    /// Supported viewport descriptions.
    pub viewports: Value,
    /// Opaque render token.
    pub token: Box<str>,
}

/// Renderer that turns a [`RenderRequest`] into engine content.
pub trait GuiRendererPort: Send + Sync {
    /// Parse and hand a document to the engine.
    fn render_document(&self, request: &RenderRequest) -> Result<()>;

    /// Remove the displayed document.
    fn clear_document(&self);
}
