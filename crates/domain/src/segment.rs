//! Well-known rendering segments and their canonical metric names.
//!
//! The names are consumed by dashboards outside this workspace and must not
//! change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-name phase of the rendering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Segment {
    /// Directive receipt through document displayed.
    RenderDocument,
    /// Content object creation in the viewhost runtime.
    ContentCreation,
    /// Root context inflation.
    RootContextInflation,
    /// Text measurement passes.
    TextMeasure,
}

impl Segment {
    /// Every segment, in table order.
    pub const ALL: [Self; 4] = [
        Self::RenderDocument,
        Self::ContentCreation,
        Self::RootContextInflation,
        Self::TextMeasure,
    ];

    /// Wire key for the segment.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::RenderDocument => "render-document",
            Self::ContentCreation => "content-creation",
            Self::RootContextInflation => "root-context-inflation",
            Self::TextMeasure => "text-measure",
        }
    }

    /// Canonical metric name reported for the segment.
    #[must_use]
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::RenderDocument => "SmartScreenSDK.renderDocument",
            Self::ContentCreation => "APL-Web.Content.create",
            Self::RootContextInflation => "APL.rootContext.inflate",
            Self::TextMeasure => "APL-Web.RootContext.measureCount",
        }
    }

    /// Look a segment up by its wire key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|segment| segment.key() == key)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.key())
    }
}
