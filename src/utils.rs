// Utility functions

/// Interprets the usual truthy form-field spellings ("1", "true", "yes", "y", "on").
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
