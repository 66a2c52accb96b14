//! [`ConsoleError`] – the single error taxonomy for the console core.
//!
//! Three classes, per the error-handling design:
//!
//! * transport failures (connection lost, channel closed) – the only class
//!   that forces an immediate operator takeover;
//! * protocol failures (a service reported a code outside its enum) – shown
//!   to the operator with the raw code, UI reverted;
//! * client-side rejections (required capability, last-active-while-engaged)
//!   – reported before any bus call is made. Readiness-budget exhaustion is
//!   an outcome, not an error; the gate reports it and halts.

use thiserror::Error;

/// Error type spanning bus transport, service protocol, and local guard
/// rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("bus transport failure: {0}")]
    Transport(String),

    #[error("bus channel error: {0}")]
    Channel(String),

    #[error("service '{service}' returned unexpected code {code}")]
    Service { service: String, code: i32 },

    #[error("no routes are available")]
    NoRoutes,

    #[error("no capabilities are registered")]
    NoCapabilities,

    #[error("unknown capability id '{0}'")]
    UnknownCapability(String),

    #[error("capability '{0}' is required and cannot be deactivated")]
    RequiredCapability(String),

    #[error("at least one capability must stay active while guidance is engaged")]
    LastActiveCapability,

    #[error("guidance refused the requested state (requested active={requested})")]
    GuidanceToggleRejected { requested: bool },
}
