use serde::{Deserialize, Serialize};

/// Credential fields a connector accepts, as shown to setup UIs.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ConnectorConfigSchema {
    pub fields: Vec<Field>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: &str, label: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            required: false,
            description: Some(description.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub enum FieldType {
    Text,
    Secret, // tokens, client secrets
    Number,
    Boolean,
}
