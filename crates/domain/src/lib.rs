//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod artifact;
mod environment;
mod gate;
mod record;
pub mod tag;
mod vulnerability;

pub use artifact::ArtifactReference;
pub use environment::{AuthorizationRule, Environment, EnvironmentLock, PromotionConfig};
pub use gate::{GateKind, GateResult, GateStatus};
pub use record::{
    AuthorizationDecision, AuthorizedVia, EnvironmentStatus, NewPromotionRecord,
    NewRollbackRecord, PromotionRecord, PromotionStatusResponse, RollbackRecord,
};
pub use tag::SemanticVersionTag;
pub use vulnerability::{
    ScannerFormat, SecurityGateConfig, SecurityGateDecision, Severity, VulnerabilitySummary,
};
