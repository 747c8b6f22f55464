//! Pipeline over a mocked FHIR server into the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use fhirstage_client::{AuthHeader, FhirClient};
use fhirstage_core::{ConceptValue, ResourceKind};
use fhirstage_ingest::{IngestOptions, IngestPipeline, Stage};
use fhirstage_storage::InMemoryStagingStore;
use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> FhirClient {
    FhirClient::new(
        &server.uri(),
        Some(AuthHeader::basic("etl", "s3cret")),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_patients_across_two_pages() {
    let server = MockServer::start().await;
    let next = format!("{}/Patient?_count=2&_page_token=xyz", server.uri());

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("_count", "2"))
        .and(basic_auth("etl", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                {"resource": {
                    "resourceType": "Patient", "id": "p1", "gender": "female",
                    "birthDate": "1990",
                    "managingOrganization": {"reference": "Organization/f1"}
                }},
                {"resource": {
                    "resourceType": "Patient", "id": "p2", "gender": "male",
                    "birthDate": "1985-03-12"
                }}
            ],
            "link": [
                {"relation": "self", "url": server.uri()},
                {"relation": "next", "url": next}
            ]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("_page_token", "xyz"))
        .and(basic_auth("etl", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                {"resource": {
                    "resourceType": "Patient", "id": "p1", "gender": "female",
                    "birthDate": "1990-01-01", "deceasedBoolean": true,
                    "managingOrganization": {"reference": "Organization/f2"}
                }}
            ],
            "link": [{"relation": "self", "url": server.uri()}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = InMemoryStagingStore::new();
    let report = IngestPipeline::new(
        client(&server),
        Arc::new(store.clone()),
        IngestOptions::default().with_page_size(2),
    )
    .run(ResourceKind::Patient)
    .await
    .unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.dropped, 1);
    assert_eq!(store.patient_count(), 1);

    let p1 = store.patient("p1").unwrap();
    assert_eq!(p1.facility_id, "f2");
    assert_eq!(p1.deceased, Some(true));
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn test_observations_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Observation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                {"resource": {
                    "resourceType": "Observation", "id": "o1",
                    "subject": {"reference": "Patient/p1"},
                    "encounter": {"reference": "Encounter/e1"},
                    "code": {"coding": [{"code": "8310-5", "display": "Body temperature"}]},
                    "valueQuantity": {"value": 98.6},
                    "effectiveDateTime": "2023-01-01T10:00:00Z"
                }},
                {"resource": {
                    "resourceType": "Observation", "id": "o2",
                    "subject": {"reference": "Patient/p1"},
                    "encounter": {"reference": "Encounter/e1"},
                    "code": {"coding": [{"code": "smoker", "display": "Smoker"}]},
                    "valueBoolean": false
                }}
            ]
        })))
        .mount(&server)
        .await;

    let store = InMemoryStagingStore::new();
    let report = IngestPipeline::new(
        client(&server),
        Arc::new(store.clone()),
        IngestOptions::default(),
    )
    .run(ResourceKind::Observation)
    .await
    .unwrap();

    assert_eq!(report.pages, 1);
    assert_eq!(report.written, 2);

    let rows = store.observations().await;
    assert_eq!(rows[0].concept_value.to_text().as_deref(), Some("98.6"));
    assert_eq!(rows[1].concept_value, ConceptValue::Boolean(false));
}

#[tokio::test]
async fn test_upstream_failure_reports_fetch_stage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = InMemoryStagingStore::new();
    let err = IngestPipeline::new(
        client(&server),
        Arc::new(store.clone()),
        IngestOptions::default(),
    )
    .run(ResourceKind::Patient)
    .await
    .unwrap_err();

    assert_eq!(err.stage, Stage::Fetch);
    assert_eq!(err.pages_completed, 0);
    assert_eq!(
        err.to_string(),
        "Fetch stage failed after 0 page(s): HTTP 503: Service Unavailable"
    );
    assert_eq!(store.open_sessions(), 0);
}
