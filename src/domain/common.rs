use uuid::Uuid;

/// Identifies records that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Supplies a presentation-ready label for CLI output or logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Normalizes a free-text name for case-insensitive comparisons.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}
