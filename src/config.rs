pub const APP_NAME: &str = "Banter";
