//! Claimed parcels and their token metadata.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{Address, Coordinates, LandgrabError, TokenId};

/// Prefix of the data URI the token contract returns from `tokenURI`.
pub const TOKEN_URI_PREFIX: &str = "data:application/json;base64,";

/// One `{trait_type, value}` entry of the metadata document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParcelAttribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

/// The JSON document embedded in a parcel's token URI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParcelMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<ParcelAttribute>,
}

impl ParcelMetadata {
    /// Decode a token URI. The `data:` prefix is optional.
    pub fn from_token_uri(uri: &str) -> Result<Self, LandgrabError> {
        let payload = uri.strip_prefix(TOKEN_URI_PREFIX).unwrap_or(uri);
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| LandgrabError::InvalidMetadata(format!("base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LandgrabError::InvalidMetadata(format!("json: {e}")))
    }

    /// Encode as a token URI the way the contract does.
    pub fn to_token_uri(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!("{TOKEN_URI_PREFIX}{}", STANDARD.encode(json))
    }

    pub fn attribute(&self, trait_type: &str) -> Option<&serde_json::Value> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.attribute("latitude").and_then(numeric)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.attribute("longitude").and_then(numeric)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude()?, self.longitude()?))
    }
}

// The contract writes coordinates as strings; accept plain numbers too.
fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A live parcel as read back from the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub token_id: TokenId,
    pub code: String,
    pub owner: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ParcelMetadata>,
}
