use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeaponError {
    #[error("Unknown weapon key: {0}")]
    UnknownKey(String),

    #[error("Weapon already equipped: {0}")]
    AlreadyEquipped(String),

    #[error("Weapon not equipped: {0}")]
    NotEquipped(String),

    #[error("Weapon not allowed in this loadout: {0}")]
    NotAllowed(String),

    #[error("Invalid weapon definition '{key}': {reason}")]
    InvalidDefinition { key: String, reason: String },

    #[error("Invalid definition table: {0}")]
    InvalidTable(String),

    #[error("Definition table parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WeaponError>;
