//! Google Places client behind the geocoder port. Parsing is kept in
//! plain functions so the wire mapping stays testable without a server.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use comanda_core::config::GeocodeConfig;
use comanda_core::domain::address::{AddressComponents, PlaceCandidate, PlaceId, ResolvedAddress};
use comanda_core::errors::ApplicationError;
use comanda_core::ports::{GeocodeBias, GeocodeClient};

pub struct GooglePlacesClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl GooglePlacesClient {
    pub fn new(client: Client, config: &GeocodeConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApplicationError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(|error| {
                ApplicationError::Integration(format!("geocode request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApplicationError::Integration(format!(
                "geocode request rejected with status {status}"
            )));
        }

        response.json::<T>().await.map_err(|error| {
            ApplicationError::Integration(format!("geocode response malformed: {error}"))
        })
    }
}

#[async_trait]
impl GeocodeClient for GooglePlacesClient {
    async fn autocomplete(
        &self,
        input: &str,
        bias: &GeocodeBias,
    ) -> Result<Vec<PlaceCandidate>, ApplicationError> {
        let biased_input = bias_input(input, bias);
        let body: AutocompleteResponse = self
            .fetch(
                "/place/autocomplete/json",
                &[
                    ("input", biased_input.as_str()),
                    ("types", "address"),
                    ("components", "country:br"),
                    ("language", "pt-BR"),
                ],
            )
            .await?;

        check_status(&body.status, &body.error_message)?;
        Ok(candidates_from(body))
    }

    async fn place_details(&self, place_id: &PlaceId) -> Result<ResolvedAddress, ApplicationError> {
        let body: DetailsResponse = self
            .fetch(
                "/place/details/json",
                &[
                    ("place_id", place_id.0.as_str()),
                    ("fields", "geometry,formatted_address,address_component"),
                    ("language", "pt-BR"),
                ],
            )
            .await?;

        check_status(&body.status, &body.error_message)?;
        resolved_from(place_id.clone(), body)
    }
}

/// The customer types only street and number; the store's city and
/// state are appended so the geocoder resolves locally.
fn bias_input(input: &str, bias: &GeocodeBias) -> String {
    let mut biased = input.trim().to_owned();
    if !bias.city.is_empty() {
        biased.push_str(", ");
        biased.push_str(&bias.city);
    }
    if !bias.state.is_empty() {
        biased.push_str(", ");
        biased.push_str(&bias.state);
    }
    biased
}

fn check_status(status: &str, error_message: &Option<String>) -> Result<(), ApplicationError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(ApplicationError::Integration(format!(
            "geocoder returned status {other}: {}",
            error_message.as_deref().unwrap_or("no detail")
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    #[serde(default)]
    structured_formatting: StructuredFormatting,
}

#[derive(Debug, Default, Deserialize)]
struct StructuredFormatting {
    #[serde(default)]
    main_text: String,
    #[serde(default)]
    secondary_text: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    geometry: Geometry,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    types: Vec<String>,
}

fn candidates_from(body: AutocompleteResponse) -> Vec<PlaceCandidate> {
    body.predictions
        .into_iter()
        .map(|prediction| PlaceCandidate {
            place_id: PlaceId(prediction.place_id),
            main_text: prediction.structured_formatting.main_text,
            secondary_text: prediction.structured_formatting.secondary_text,
        })
        .collect()
}

fn resolved_from(
    place_id: PlaceId,
    body: DetailsResponse,
) -> Result<ResolvedAddress, ApplicationError> {
    let details = body.result.ok_or_else(|| {
        ApplicationError::Integration(format!("geocoder returned no details for {}", place_id.0))
    })?;

    Ok(ResolvedAddress {
        place_id,
        latitude: details.geometry.location.lat,
        longitude: details.geometry.location.lng,
        formatted: details.formatted_address,
        components: components_from(&details.address_components),
    })
}

fn components_from(raw: &[AddressComponent]) -> AddressComponents {
    let mut components = AddressComponents::default();
    for component in raw {
        let types: Vec<&str> = component.types.iter().map(String::as_str).collect();
        if types.contains(&"route") {
            components.street = Some(component.long_name.clone());
        } else if types.contains(&"street_number") {
            components.number = Some(component.long_name.clone());
        } else if types.contains(&"sublocality") || types.contains(&"neighborhood") {
            components.neighborhood = Some(component.long_name.clone());
        } else if types.contains(&"locality") || types.contains(&"administrative_area_level_2") {
            components.city = Some(component.long_name.clone());
        } else if types.contains(&"administrative_area_level_1") {
            components.state = Some(component.short_name.clone());
        } else if types.contains(&"postal_code") {
            components.zip = Some(component.long_name.clone());
        }
    }
    components
}
