//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_engine;
mod circuit_breaker;
mod gate_ports;
mod gate_runner;
mod promotion_controller;
mod registry_facade;
mod registry_ports;
mod security_gate_evaluator;

pub use authorization_engine::AuthorizationEngine;
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerRegistry, CircuitBreakerSettings, CircuitBreakerState,
    CircuitState,
};
pub use gate_ports::{
    PolicyEvaluator, PolicyOutcome, ScanReportSource, SignatureStatus, SignatureVerification,
    SignatureVerifier,
};
pub use gate_runner::{GateReport, GateRunMode, GateRunner};
pub use promotion_controller::{
    ControllerSettings, GateEvaluation, PROMOTION_ANNOTATION, PROMOTION_HISTORY_ANNOTATION,
    PromoteInput, PromotionController, ROLLBACK_ANNOTATION, ROLLBACK_HISTORY_ANNOTATION,
    RollbackInput,
};
pub use registry_facade::RegistryFacade;
pub use registry_ports::{RegistryTransport, TransportError};
pub use security_gate_evaluator::{ScanFinding, ScanReportParser, SecurityGateEvaluator, parser_for};
