//! Adapter test harness.
//!
//! Provides an in-memory versioned resource store implementing
//! [`InteractionHandler`] and a test server running it behind the standard
//! pipeline.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use helios_fhir_http::extractors::query::QueryParams;
use helios_fhir_http::{
    AdapterConfig, ConditionalRequestExt, FhirRequest, FhirResponse, InteractionHandler,
    InteractionKind, QueryParamsExt, Resource, ResourceKey, RestError, RestResult,
    create_app_with_config,
};

/// One resource instance with all its versions. A `None` version is a
/// deletion.
type History = Vec<Option<Value>>;

/// In-memory versioned store.
#[derive(Default)]
pub struct MemoryStore {
    resources: Mutex<HashMap<(String, String), History>>,
    next_id: Mutex<u64>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new version and returns it.
    fn put(&self, resource_type: &str, id: &str, mut resource: Value) -> Value {
        let mut resources = self.resources.lock().unwrap();
        let history = resources
            .entry((resource_type.to_string(), id.to_string()))
            .or_default();
        let version_id = (history.len() + 1).to_string();

        resource["id"] = json!(id);
        resource["meta"] = json!({
            "versionId": version_id,
            "lastUpdated": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        });
        history.push(Some(resource.clone()));
        resource
    }

    fn history(&self, resource_type: &str, id: &str) -> Option<History> {
        self.resources
            .lock()
            .unwrap()
            .get(&(resource_type.to_string(), id.to_string()))
            .cloned()
    }

    fn current(&self, resource_type: &str) -> Vec<Value> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .filter(|((ty, _), _)| ty == resource_type)
            .filter_map(|(_, history)| history.last().cloned().flatten())
            .collect()
    }

    fn generate_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("gen-{}", next)
    }

    fn read(&self, request: &FhirRequest, ty: &str, id: &str) -> RestResult<FhirResponse> {
        let history = self.history(ty, id).ok_or_else(|| not_found(ty, id))?;
        let version_id = history.len().to_string();

        let Some(Some(current)) = history.last().cloned() else {
            return Ok(FhirResponse::gone(
                ResourceKey::new(ty, id).with_version(version_id),
            ));
        };
        let resource = Resource::new(current);

        if request.if_none_match().any(|tag| tag == "*" || tag == version_id) {
            return Ok(FhirResponse::not_modified(
                ResourceKey::new(ty, id).with_version(version_id),
            ));
        }
        if let (Some(since), Some(last_updated)) =
            (request.if_modified_since(), resource.last_updated())
        {
            if last_updated <= since {
                return Ok(FhirResponse::not_modified(
                    ResourceKey::new(ty, id).with_version(version_id),
                ));
            }
        }

        if request.request_summary() {
            return Ok(FhirResponse::ok(summarize(&resource)));
        }
        Ok(FhirResponse::ok(resource))
    }

    fn vread(&self, ty: &str, id: &str, vid: &str) -> RestResult<FhirResponse> {
        let history = self.history(ty, id).ok_or_else(|| not_found(ty, id))?;
        let version = vid
            .parse::<usize>()
            .ok()
            .and_then(|v| v.checked_sub(1))
            .and_then(|index| history.get(index).cloned())
            .ok_or_else(|| RestError::VersionNotFound {
                resource_type: ty.to_string(),
                id: id.to_string(),
                version_id: vid.to_string(),
            })?;

        match version {
            Some(resource) => Ok(FhirResponse::ok(Resource::new(resource))),
            None => Ok(FhirResponse::gone(
                ResourceKey::new(ty, id).with_version(vid),
            )),
        }
    }

    fn create(&self, request: &FhirRequest, ty: &str) -> RestResult<FhirResponse> {
        let resource = require_resource(request, ty)?;

        if let Some(criteria) = request.if_none_exist() {
            let criteria = QueryParams::parse(criteria);
            if let Some(existing_id) = criteria.get("_id") {
                if let Some(Some(Some(existing))) =
                    self.history(ty, existing_id).map(|h| h.last().cloned())
                {
                    return Ok(FhirResponse::ok(Resource::new(existing)));
                }
            }
        }

        let id = self.generate_id();
        Ok(FhirResponse::created(Resource::new(
            self.put(ty, &id, resource.into_value()),
        )))
    }

    fn update(&self, request: &FhirRequest, ty: &str, id: &str) -> RestResult<FhirResponse> {
        let resource = require_resource(request, ty)?;
        let existing = self.history(ty, id);

        if let Some(expected) = request.if_match_version() {
            let current = existing.as_ref().map(|h| h.len().to_string());
            if current.as_deref() != Some(expected.as_str()) {
                return Err(RestError::PreconditionFailed {
                    message: format!(
                        "If-Match version {} does not match current version {}",
                        expected,
                        current.unwrap_or_else(|| "none".to_string())
                    ),
                });
            }
        }

        let stored = Resource::new(self.put(ty, id, resource.into_value()));
        if existing.is_some() {
            Ok(FhirResponse::ok(stored))
        } else {
            Ok(FhirResponse::created(stored))
        }
    }

    fn delete(&self, ty: &str, id: &str) -> RestResult<FhirResponse> {
        let mut resources = self.resources.lock().unwrap();
        let history = resources
            .get_mut(&(ty.to_string(), id.to_string()))
            .ok_or_else(|| not_found(ty, id))?;
        if history.last().is_some_and(Option::is_some) {
            history.push(None);
        }
        Ok(FhirResponse::no_content())
    }

    fn search(&self, request: &FhirRequest, ty: &str) -> RestResult<FhirResponse> {
        let mut matches = self.current(ty);
        if let Some(count) = request.get_int("_count") {
            matches.truncate(usize::try_from(count).unwrap_or(0));
        }

        let entries: Vec<Value> = matches
            .into_iter()
            .map(|resource| json!({ "resource": resource }))
            .collect();
        Ok(FhirResponse::ok(Resource::new(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": entries.len(),
            "entry": entries
        }))))
    }
}

#[async_trait]
impl InteractionHandler for MemoryStore {
    async fn handle(&self, request: &FhirRequest) -> RestResult<FhirResponse> {
        let interaction = request.interaction().clone();
        let ty = interaction.target_type().unwrap_or_default();
        let id = interaction.target_id().unwrap_or_default();

        match interaction.kind() {
            InteractionKind::Capabilities => Ok(FhirResponse::ok(Resource::new(json!({
                "resourceType": "CapabilityStatement",
                "status": "active",
                "kind": "instance",
                "fhirVersion": "4.0.1",
                "format": ["json"]
            })))),
            InteractionKind::Read => self.read(request, ty, id),
            InteractionKind::VRead => {
                self.vread(ty, id, interaction.target_version().unwrap_or_default())
            }
            InteractionKind::Create => self.create(request, ty),
            InteractionKind::Update if !id.is_empty() => self.update(request, ty, id),
            InteractionKind::Delete if !id.is_empty() => self.delete(ty, id),
            InteractionKind::SearchType => self.search(request, ty),
            kind => Err(RestError::NotImplemented {
                feature: format!("{} interaction", kind),
            }),
        }
    }
}

fn not_found(ty: &str, id: &str) -> RestError {
    RestError::NotFound {
        resource_type: ty.to_string(),
        id: id.to_string(),
    }
}

fn require_resource(request: &FhirRequest, ty: &str) -> RestResult<Resource> {
    let resource = request.resource()?.ok_or_else(|| RestError::BadRequest {
        message: "Request body is required".to_string(),
    })?;
    if resource.resource_type() != Some(ty) {
        return Err(RestError::BadRequest {
            message: format!(
                "Resource type {} does not match {}",
                resource.resource_type().unwrap_or_default(),
                ty
            ),
        });
    }
    Ok(resource)
}

/// Keeps the elements of the summary view this store knows about.
fn summarize(resource: &Resource) -> Resource {
    let value = resource.as_value();
    let mut summary = json!({
        "resourceType": value["resourceType"],
        "id": value["id"],
        "meta": value["meta"]
    });
    summary["meta"]["tag"] = json!([{
        "system": "http://terminology.hl7.org/CodeSystem/v3-ObservationValue",
        "code": "SUBSETTED"
    }]);
    Resource::new(summary)
}

/// Creates a test server running a fresh store with the testing config.
pub fn test_server() -> TestServer {
    test_server_with_config(AdapterConfig::for_testing())
}

/// Creates a test server running a fresh store with the given config.
pub fn test_server_with_config(config: AdapterConfig) -> TestServer {
    let app = create_app_with_config(MemoryStore::new(), config);
    TestServer::new(app).expect("Failed to create test server")
}
