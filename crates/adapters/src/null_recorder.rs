//! Inert recorder used while no metrics sink is installed.

use apl_client_domain::{DocumentId, Segment};
use apl_client_ports::{
    MetricCounter, MetricTimer, MetricsRecorderPort, NullMetricCounter, NullMetricTimer,
};

/// Recorder whose every operation does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricsRecorder;

impl MetricsRecorderPort for NullMetricsRecorder {
    fn register_document(&self) -> DocumentId {
        DocumentId::UNKNOWN
    }

    fn add_metadata(&self, _document: DocumentId, _key: &str, _value: &str) -> bool {
        false
    }

    fn invalidate_document(&self, _document: DocumentId) {}

    fn current_displayed_document(&self) -> DocumentId {
        DocumentId::UNKNOWN
    }

    fn latest_document(&self) -> DocumentId {
        DocumentId::UNKNOWN
    }

    fn resolve_document(&self, document: DocumentId) -> DocumentId {
        if document.is_sentinel() {
            DocumentId::UNKNOWN
        } else {
            document
        }
    }

    fn create_timer(
        &self,
        _document: DocumentId,
        _name: &str,
        _zero: bool,
    ) -> Box<dyn MetricTimer> {
        Box::new(NullMetricTimer)
    }

    fn create_segment_timer(
        &self,
        _document: DocumentId,
        _segment: Segment,
        _zero: bool,
    ) -> Box<dyn MetricTimer> {
        Box::new(NullMetricTimer)
    }

    fn create_counter(
        &self,
        _document: DocumentId,
        _name: &str,
        _zero: bool,
    ) -> Box<dyn MetricCounter> {
        Box::new(NullMetricCounter)
    }

    fn flush(&self) {}

    fn on_rendering_started(&self, _document: DocumentId) {}

    fn on_rendering_ended(&self, _document: DocumentId) {}

    fn invalidate_inactive_documents(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_is_inert() {
        let recorder = NullMetricsRecorder;
        let document = recorder.register_document();
        assert_eq!(document, DocumentId::UNKNOWN);
        assert!(!recorder.add_metadata(DocumentId::LATEST, "k", "v"));
        assert!(
            !recorder
                .create_segment_timer(document, Segment::RenderDocument, true)
                .start()
        );
        assert!(!recorder.create_counter(document, "c", true).increment());
        assert_eq!(
            recorder.resolve_document(DocumentId::CURRENT),
            DocumentId::UNKNOWN
        );
    }
}
