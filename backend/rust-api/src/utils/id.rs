use uuid::Uuid;

/// `<prefix>_<uuid v4>`, e.g. `sess_…` for sessions and `lvltest_…` for level tests.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4())
}
