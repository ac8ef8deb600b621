//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod annotation_policy_evaluator;
mod annotation_signature_verifier;
mod file_scan_report_source;
mod in_memory_registry_transport;
mod json_file_registry_transport;
mod registry_document;

pub use annotation_policy_evaluator::{
    AnnotationPolicyEvaluator, POLICY_COMPLIANT_ANNOTATION, POLICY_VIOLATIONS_ANNOTATION,
};
pub use annotation_signature_verifier::{AnnotationSignatureVerifier, SIGNATURE_BUNDLE_ANNOTATION};
pub use file_scan_report_source::FileScanReportSource;
pub use in_memory_registry_transport::InMemoryRegistryTransport;
pub use json_file_registry_transport::JsonFileRegistryTransport;
