use std::collections::HashMap;

/// Flat key/value credentials for a connector (`access_token`, `refresh_token`,
/// `client_id`, `expires_at`, ...).
pub type AuthDetails = HashMap<String, String>;
