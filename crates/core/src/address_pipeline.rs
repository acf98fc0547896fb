//! Free-text address resolution: autocomplete biased toward the store's
//! city, then place-detail lookup with a short-lived cache so a customer
//! re-confirming a candidate does not hit the geocoder twice.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::address::{PlaceCandidate, PlaceId, ResolvedAddress};
use crate::errors::ApplicationError;
use crate::ports::{GeocodeBias, GeocodeClient};

const PLACE_DETAILS_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone, Debug, PartialEq)]
pub enum LookupOutcome {
    /// Nothing plausible; ask the customer to retype the address.
    NoMatch,
    Single(PlaceCandidate),
    /// Ranked candidates for the customer to pick from.
    Multiple(Vec<PlaceCandidate>),
}

struct CachedDetails {
    resolved: ResolvedAddress,
    fetched_at: Instant,
}

pub struct AddressResolutionPipeline {
    geocode: Arc<dyn GeocodeClient>,
    bias: GeocodeBias,
    details_cache: Mutex<HashMap<PlaceId, CachedDetails>>,
}

impl AddressResolutionPipeline {
    pub fn new(geocode: Arc<dyn GeocodeClient>, bias: GeocodeBias) -> Self {
        Self { geocode, bias, details_cache: Mutex::new(HashMap::new()) }
    }

    pub async fn lookup(&self, input: &str) -> Result<LookupOutcome, ApplicationError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(LookupOutcome::NoMatch);
        }

        let mut candidates = self.geocode.autocomplete(input, &self.bias).await?;
        tracing::debug!(
            event_name = "address_autocomplete",
            input,
            candidates = candidates.len(),
        );

        Ok(match candidates.len() {
            0 => LookupOutcome::NoMatch,
            1 => LookupOutcome::Single(candidates.remove(0)),
            _ => LookupOutcome::Multiple(candidates),
        })
    }

    /// Fetches the full coordinates for a confirmed candidate, consulting
    /// the cache first.
    pub async fn resolve(&self, place_id: &PlaceId) -> Result<ResolvedAddress, ApplicationError> {
        if let Some(cached) = self.cached(place_id) {
            return Ok(cached);
        }

        let resolved = self.geocode.place_details(place_id).await?;
        let mut cache = self.details_cache.lock().map_err(poisoned)?;
        cache.retain(|_, entry| entry.fetched_at.elapsed() < PLACE_DETAILS_TTL);
        cache.insert(
            place_id.clone(),
            CachedDetails { resolved: resolved.clone(), fetched_at: Instant::now() },
        );
        Ok(resolved)
    }

    fn cached(&self, place_id: &PlaceId) -> Option<ResolvedAddress> {
        let cache = self.details_cache.lock().ok()?;
        let entry = cache.get(place_id)?;
        if entry.fetched_at.elapsed() < PLACE_DETAILS_TTL {
            Some(entry.resolved.clone())
        } else {
            None
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ApplicationError {
    ApplicationError::Integration("address cache lock poisoned".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::domain::address::{AddressComponents, PlaceCandidate, PlaceId, ResolvedAddress};
    use crate::errors::ApplicationError;
    use crate::ports::{GeocodeBias, GeocodeClient};

    use super::{AddressResolutionPipeline, LookupOutcome};

    struct FakeGeocoder {
        candidates: Vec<PlaceCandidate>,
        detail_calls: AtomicUsize,
    }

    #[async_trait]
    impl GeocodeClient for FakeGeocoder {
        async fn autocomplete(
            &self,
            _input: &str,
            _bias: &GeocodeBias,
        ) -> Result<Vec<PlaceCandidate>, ApplicationError> {
            Ok(self.candidates.clone())
        }

        async fn place_details(
            &self,
            place_id: &PlaceId,
        ) -> Result<ResolvedAddress, ApplicationError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResolvedAddress {
                place_id: place_id.clone(),
                latitude: -23.5505,
                longitude: -46.6333,
                formatted: "Rua Augusta, 100 - São Paulo".to_owned(),
                components: AddressComponents::default(),
            })
        }
    }

    fn candidate(id: &str) -> PlaceCandidate {
        PlaceCandidate {
            place_id: PlaceId(id.to_owned()),
            main_text: "Rua Augusta, 100".to_owned(),
            secondary_text: "São Paulo - SP".to_owned(),
        }
    }

    fn pipeline(candidates: Vec<PlaceCandidate>) -> (AddressResolutionPipeline, Arc<FakeGeocoder>) {
        let geocoder =
            Arc::new(FakeGeocoder { candidates, detail_calls: AtomicUsize::new(0) });
        let bias = GeocodeBias { city: "São Paulo".to_owned(), state: "SP".to_owned() };
        (AddressResolutionPipeline::new(geocoder.clone(), bias), geocoder)
    }

    #[tokio::test]
    async fn empty_input_never_calls_the_geocoder() {
        let (pipeline, _) = pipeline(vec![candidate("p1")]);
        let outcome = pipeline.lookup("   ").await.expect("lookup");
        assert_eq!(outcome, LookupOutcome::NoMatch);
    }

    #[tokio::test]
    async fn single_candidate_is_returned_directly() {
        let (pipeline, _) = pipeline(vec![candidate("p1")]);
        let outcome = pipeline.lookup("rua augusta 100").await.expect("lookup");
        assert!(matches!(outcome, LookupOutcome::Single(c) if c.place_id.0 == "p1"));
    }

    #[tokio::test]
    async fn several_candidates_are_offered_for_disambiguation() {
        let (pipeline, _) = pipeline(vec![candidate("p1"), candidate("p2")]);
        let outcome = pipeline.lookup("rua augusta").await.expect("lookup");
        assert!(matches!(outcome, LookupOutcome::Multiple(list) if list.len() == 2));
    }

    #[tokio::test]
    async fn place_details_are_cached_within_the_ttl() {
        let (pipeline, geocoder) = pipeline(vec![candidate("p1")]);
        let id = PlaceId("p1".to_owned());

        let first = pipeline.resolve(&id).await.expect("resolve");
        let second = pipeline.resolve(&id).await.expect("resolve");

        assert_eq!(first, second);
        assert_eq!(geocoder.detail_calls.load(Ordering::SeqCst), 1);
    }
}
