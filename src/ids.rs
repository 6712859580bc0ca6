use uuid::Uuid;

/// Source of opaque identifiers for new exercises.
pub trait IdGenerator {
    fn generate(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
