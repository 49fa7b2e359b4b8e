use uuid::Uuid;

/// Generates a new opaque id: a v4 UUID with dashes stripped, 32 lowercase
/// hex characters. Not a stable external identifier across deployments.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
