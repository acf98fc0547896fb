use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceId(pub String);

/// One geocoder suggestion, as returned by the autocomplete capability.
/// Coordinates are only known after a `place_details` lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: PlaceId,
    pub main_text: String,
    pub secondary_text: String,
}

impl PlaceCandidate {
    pub fn display(&self) -> String {
        if self.secondary_text.is_empty() {
            self.main_text.clone()
        } else {
            format!("{}, {}", self.main_text, self.secondary_text)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub place_id: PlaceId,
    pub latitude: f64,
    pub longitude: f64,
    pub formatted: String,
    #[serde(default)]
    pub components: AddressComponents,
}
