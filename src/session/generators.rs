use uuid::Uuid;

/// Pet name used when a guest does not pick a display name
pub fn generate_display_name() -> String {
    petname::Petnames::default().generate_one(2, "-")
}

pub fn generate_user_id() -> String {
    format!("user-{}", Uuid::new_v4().simple())
}
