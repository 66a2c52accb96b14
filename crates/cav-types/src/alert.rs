//! System-alert stream classification.
//!
//! The vehicle stack publishes `SystemAlert` messages carrying a small numeric
//! code. The console only ever acts on the classified [`SystemAlertKind`];
//! unrecognized codes are kept (with their raw value) and treated as
//! not-ready by the readiness gate, which is the fail-safe default.

use serde::{Deserialize, Serialize};

/// Classification of a single system alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemAlertKind {
    Caution,
    Warning,
    /// Irrecoverable fault. The alert stream is unsubscribed permanently and
    /// the operator is told to take manual control.
    Fatal,
    NotReady,
    Ready,
    /// System is shutting down. Terminal, like [`SystemAlertKind::Fatal`].
    Shutdown,
    /// A code outside the published enum. Treated as not-ready.
    Unknown(u8),
}

impl SystemAlertKind {
    /// Map the wire code to a classification.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Caution,
            2 => Self::Warning,
            3 => Self::Fatal,
            4 => Self::NotReady,
            5 => Self::Ready,
            6 => Self::Shutdown,
            other => Self::Unknown(other),
        }
    }

    /// Terminal alerts halt the workflow and are never resumed automatically.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fatal | Self::Shutdown)
    }
}

/// A decoded system-alert message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAlert {
    pub kind: SystemAlertKind,
    pub description: String,
}

impl SystemAlert {
    /// Decode from the raw wire code and free-text description.
    pub fn from_code(code: u8, description: impl Into<String>) -> Self {
        Self {
            kind: SystemAlertKind::from_code(code),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_classify() {
        assert_eq!(SystemAlertKind::from_code(1), SystemAlertKind::Caution);
        assert_eq!(SystemAlertKind::from_code(2), SystemAlertKind::Warning);
        assert_eq!(SystemAlertKind::from_code(3), SystemAlertKind::Fatal);
        assert_eq!(SystemAlertKind::from_code(4), SystemAlertKind::NotReady);
        assert_eq!(SystemAlertKind::from_code(5), SystemAlertKind::Ready);
        assert_eq!(SystemAlertKind::from_code(6), SystemAlertKind::Shutdown);
    }

    #[test]
    fn unknown_code_is_preserved() {
        assert_eq!(SystemAlertKind::from_code(42), SystemAlertKind::Unknown(42));
    }

    #[test]
    fn only_fatal_and_shutdown_are_terminal() {
        for code in 0..=10u8 {
            let kind = SystemAlertKind::from_code(code);
            assert_eq!(kind.is_terminal(), code == 3 || code == 6, "code {code}");
        }
    }

    #[test]
    fn alert_serde_roundtrip() {
        let alert = SystemAlert::from_code(5, "System is ready.");
        let json = serde_json::to_string(&alert).unwrap();
        let back: SystemAlert = serde_json::from_str(&json).unwrap();
        assert_eq!(alert, back);
    }
}
