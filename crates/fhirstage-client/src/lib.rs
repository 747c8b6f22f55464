//! Paginated FHIR search client.
//!
//! [`FhirClient`] issues `GET {base}/{ResourceType}?_count=N` and then follows
//! each Bundle's `next` link verbatim. The pipeline depends on the
//! [`PageSource`] trait rather than the client so tests can feed fixed pages.

mod auth;
mod client;
mod error;

pub use auth::AuthHeader;
pub use client::{DEFAULT_PAGE_SIZE, FhirClient, PageSource};
pub use error::FetchError;
