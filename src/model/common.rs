use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// True when the id is a plain 8-4-4-4-12 UUID.
pub fn is_uuid(id: &str) -> bool {
    id.len() == 36 && Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_uuids() {
        assert!(is_uuid(&generate_id()));
    }

    #[test]
    fn rejects_non_uuid_strings() {
        assert!(!is_uuid("not-a-uuid"));
        assert!(!is_uuid(""));
        // Simple form without hyphens is not an item id
        assert!(!is_uuid("8b95ab80a3c144f3b0b0dfc53c7f2b2e"));
    }
}
