//! Shared serde default helpers for domain configs

/// Default function returning true, for use with serde defaults
pub fn default_true() -> bool {
    true
}
