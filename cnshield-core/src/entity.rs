// cnshield-core/src/entity.rs
//! The canonical entity taxonomy.
//!
//! Entity types serialize as their upper-case tag (`PHONE`, `ID_CARD`, ...).
//! Parsing also accepts the `CN_` prefixed aliases used by older rule files,
//! so `CN_PHONE` and `phone` both resolve to [`EntityType::Phone`].
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ShieldError;

/// A canonical entity tag. The fixed variants cover the builtin catalog and the
/// statistical recognizer; `Custom` carries any other user-defined tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityType {
    IdCard,
    Phone,
    BankCard,
    Email,
    Passport,
    SocialCreditCode,
    VehiclePlate,
    IpAddress,
    PostalCode,
    DriverLicense,
    MilitaryId,
    MedicalLicense,
    MacAddress,
    JdbcConnection,
    Jwt,
    CloudKey,
    WechatId,
    SensitiveField,
    Person,
    Location,
    Organization,
    DateTime,
    Custom(String),
}

const KNOWN: &[(&str, EntityType)] = &[
    ("ID_CARD", EntityType::IdCard),
    ("PHONE", EntityType::Phone),
    ("BANK_CARD", EntityType::BankCard),
    ("EMAIL", EntityType::Email),
    ("PASSPORT", EntityType::Passport),
    ("SOCIAL_CREDIT_CODE", EntityType::SocialCreditCode),
    ("VEHICLE_PLATE", EntityType::VehiclePlate),
    ("IP_ADDRESS", EntityType::IpAddress),
    ("POSTAL_CODE", EntityType::PostalCode),
    ("DRIVER_LICENSE", EntityType::DriverLicense),
    ("MILITARY_ID", EntityType::MilitaryId),
    ("MEDICAL_LICENSE", EntityType::MedicalLicense),
    ("MAC_ADDRESS", EntityType::MacAddress),
    ("JDBC_CONNECTION", EntityType::JdbcConnection),
    ("JWT", EntityType::Jwt),
    ("CLOUD_KEY", EntityType::CloudKey),
    ("WECHAT_ID", EntityType::WechatId),
    ("SENSITIVE_FIELD", EntityType::SensitiveField),
    ("PERSON", EntityType::Person),
    ("LOCATION", EntityType::Location),
    ("ORGANIZATION", EntityType::Organization),
    ("DATE_TIME", EntityType::DateTime),
];

impl EntityType {
    /// The serialized tag.
    pub fn as_str(&self) -> &str {
        if let EntityType::Custom(tag) = self {
            return tag;
        }
        KNOWN
            .iter()
            .find(|(_, known)| known == self)
            .map(|(tag, _)| *tag)
            .unwrap_or("CUSTOM")
    }

    /// All builtin (non-custom) entity types, in taxonomy order.
    pub fn builtin() -> impl Iterator<Item = EntityType> {
        KNOWN.iter().map(|(_, e)| e.clone())
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, EntityType::Custom(_))
    }

    fn lookup(tag: &str) -> Option<EntityType> {
        KNOWN.iter().find(|(known, _)| *known == tag).map(|(_, e)| e.clone())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ShieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        if tag.is_empty() {
            return Err(ShieldError::InvalidConfig("entity type must not be empty".to_string()));
        }
        if let Some(known) = Self::lookup(&tag) {
            return Ok(known);
        }
        if let Some(known) = tag.strip_prefix("CN_").and_then(Self::lookup) {
            return Ok(known);
        }
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ShieldError::InvalidConfig(format!(
                "entity type '{}' may only contain ASCII letters, digits and '_'",
                s.trim()
            )));
        }
        Ok(EntityType::Custom(tag))
    }
}

impl TryFrom<String> for EntityType {
    type Error = ShieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}
