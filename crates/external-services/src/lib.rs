//! Client-side interfaces to the black-box collaborators named in spec.md
//! §6.3: the identity provider, the AI provider (primary + fallback), the
//! reverse geocoder, and the three routing providers.
//!
//! Every trait here is deliberately thin — the core only depends on the
//! shape of the response, never on a specific vendor's wire format, mirroring
//! how `ground-station-wasm::weather_api::WeatherApi` abstracts over
//! Open-Meteo/Tomorrow.io/OpenWeatherMap behind one `WeatherApiProvider` enum.

pub mod ai;
pub mod geocoder;
pub mod identity;
pub mod routing;
pub mod shelter;

pub use ai::{AiError, AiProvider, AiProviderChain, AiPromptContext, AiResult};
pub use geocoder::{BoundingBoxGeocoder, GeocodeError, Geocoder, HttpGeocoder, ReverseGeocodeResult};
pub use identity::{HttpIdentityProvider, IdentityError, IdentityProvider, Principal, RegisteredAccount};
pub use routing::{ProviderRoute, RouteRequest, RoutingError, RoutingProvider};
pub use shelter::{ExternalShelter, HifldShelterProvider, ShelterProvider, ShelterProviderError};
