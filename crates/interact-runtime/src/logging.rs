//! Log output for embedding applications
//!
//! The crates only emit `tracing` events. Applications that already install a
//! subscriber need nothing from this module; everyone else calls [`init`].

use tracing_subscriber::EnvFilter;

/// Verbosity of the SDK's own log output
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DebugLevel {
    None,
    Error,
    #[default]
    Warning,
    Info,
    Trace,
}

const CRATES: [&str; 6] = [
    "interact_core",
    "interact_wire",
    "interact_time",
    "interact_state",
    "interact_transport",
    "interact_runtime",
];

impl DebugLevel {
    /// `tracing` level name for this verbosity
    pub fn level_name(self) -> &'static str {
        match self {
            DebugLevel::None => "off",
            DebugLevel::Error => "error",
            DebugLevel::Warning => "warn",
            DebugLevel::Info => "info",
            DebugLevel::Trace => "trace",
        }
    }

    /// Filter directives scoping this level to the SDK crates
    pub fn directives(self) -> String {
        let level = self.level_name();
        CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::new(self.directives())
    }
}

/// Install a fmt subscriber at `level`. `RUST_LOG` wins when set.
///
/// Returns false if a global subscriber was already installed.
pub fn init(level: DebugLevel) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.filter()))
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Like [`init`], emitting one JSON object per event
pub fn init_json(level: DebugLevel) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.filter()))
        .try_init()
        .is_ok()
}
