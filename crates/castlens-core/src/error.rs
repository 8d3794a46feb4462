use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    DatasetNotFound,
    DatasetParseError,
    TraitNotFound,
    TraitAlreadyExists,
    InvalidTraitName,
    InvalidFilterValue,
    PredicateCompileFailed,
    StoreUnavailable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::DatasetNotFound => "E1003",
            Self::DatasetParseError => "E1004",
            Self::TraitNotFound => "E2001",
            Self::TraitAlreadyExists => "E2002",
            Self::InvalidTraitName => "E2003",
            Self::InvalidFilterValue => "E2005",
            Self::PredicateCompileFailed => "E3001",
            Self::StoreUnavailable => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::DatasetNotFound => "Dataset file not found",
            Self::DatasetParseError => "Dataset file is not valid item JSON",
            Self::TraitNotFound => "Trait not found",
            Self::TraitAlreadyExists => "Trait already exists",
            Self::InvalidTraitName => "Invalid trait name",
            Self::InvalidFilterValue => "Invalid search filter value",
            Self::PredicateCompileFailed => "Trait predicate failed to compile",
            Self::StoreUnavailable => "Key-value store unavailable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .castlens/config.toml and retry."),
            Self::DatasetNotFound => {
                Some("Pass --data <file> or set [dataset] path in .castlens/config.toml.")
            }
            Self::DatasetParseError => {
                Some("Provide a JSON array of items or an object with an `items` array.")
            }
            Self::TraitNotFound => Some("Run `castlens traits list` to see known trait names."),
            Self::TraitAlreadyExists => Some("Use `castlens traits edit` to change an existing trait."),
            Self::InvalidTraitName => Some("Trait names must be non-empty and not only whitespace."),
            Self::InvalidFilterValue => Some("Check the value against `castlens search --help`."),
            Self::PredicateCompileFailed => {
                Some("Run `castlens traits check '<code>'` to see the compile error.")
            }
            Self::StoreUnavailable => Some("Check write permissions on the store directory."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
