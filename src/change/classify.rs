use std::fmt;

/// Category of a change request's component, deciding whether it gets a CI build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentCategory {
    Config,
    Backend,
    Frontend,
    /// The change request URL did not name a repository.
    Invalid,
    /// The change request could not be fetched.
    Error,
}

impl ComponentCategory {
    /// Backend and frontend components are built; configuration needs no build.
    pub fn is_buildable(&self) -> bool {
        matches!(self, ComponentCategory::Backend | ComponentCategory::Frontend)
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentCategory::Config => write!(f, "config"),
            ComponentCategory::Backend => write!(f, "back"),
            ComponentCategory::Frontend => write!(f, "front"),
            ComponentCategory::Invalid => write!(f, "invalid"),
            ComponentCategory::Error => write!(f, "error"),
        }
    }
}

/// Keyword rules, checked in order. Config keywords win over everything else.
const RULES: &[(&[&str], ComponentCategory)] = &[
    (&["config", "properties", "customizationfile"], ComponentCategory::Config),
    (&["back"], ComponentCategory::Backend),
    (&["front", "afph-paet-auth"], ComponentCategory::Frontend),
];

/// Classify a component (repository slug) by case-sensitive keyword match.
///
/// Total: anything no rule matches, the empty string included, is a backend.
pub fn classify(component: &str) -> ComponentCategory {
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| component.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(ComponentCategory::Backend)
}
