//! Interaction resolution.
//!
//! Classifies an inbound request into the FHIR
//! [interaction](https://hl7.org/fhir/http.html) it performs, based on the
//! HTTP method and the shape of the path:
//!
//! | Method | Path | Interaction |
//! |--------|------|-------------|
//! | GET | `/metadata` | capabilities |
//! | POST | `/` | batch/transaction |
//! | GET | `/` or `/_search` | system search |
//! | GET | `/_history` | system history |
//! | GET/POST | `/[type]` / `/[type]/_search` | type search / create |
//! | GET | `/[type]/_history` | type history |
//! | GET/PUT/PATCH/DELETE | `/[type]/[id]` | read / update / patch / delete |
//! | GET | `/[type]/[id]/_history` | instance history |
//! | GET | `/[type]/[id]/_history/[vid]` | vread |
//! | any | `.../$[name]` | operation |

use std::fmt;

use axum::http::Method;

use crate::fhir_types::ResourceKey;

/// The kind of FHIR interaction a request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// `GET [base]/[type]/[id]`
    Read,
    /// `GET [base]/[type]/[id]/_history/[vid]`
    VRead,
    /// `PUT [base]/[type]/[id]` (or conditional `PUT [base]/[type]?...`)
    Update,
    /// `PATCH [base]/[type]/[id]`
    Patch,
    /// `DELETE [base]/[type]/[id]` (or conditional `DELETE [base]/[type]?...`)
    Delete,
    /// `POST [base]/[type]`
    Create,
    /// `GET [base]/[type]` or `POST [base]/[type]/_search`
    SearchType,
    /// `GET [base]` or `POST [base]/_search`
    SearchSystem,
    /// `GET [base]/[type]/[id]/_history`
    HistoryInstance,
    /// `GET [base]/[type]/_history`
    HistoryType,
    /// `GET [base]/_history`
    HistorySystem,
    /// `GET [base]/metadata`
    Capabilities,
    /// `POST [base]`
    Batch,
    /// `[base]/($name|[type]/$name|[type]/[id]/$name)`
    Operation,
}

impl InteractionKind {
    /// Returns the FHIR code for this interaction.
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Read => "read",
            InteractionKind::VRead => "vread",
            InteractionKind::Update => "update",
            InteractionKind::Patch => "patch",
            InteractionKind::Delete => "delete",
            InteractionKind::Create => "create",
            InteractionKind::SearchType => "search-type",
            InteractionKind::SearchSystem => "search-system",
            InteractionKind::HistoryInstance => "history-instance",
            InteractionKind::HistoryType => "history-type",
            InteractionKind::HistorySystem => "history-system",
            InteractionKind::Capabilities => "capabilities",
            InteractionKind::Batch => "batch",
            InteractionKind::Operation => "operation",
        }
    }

    /// Returns true for interactions that may change server state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            InteractionKind::Update
                | InteractionKind::Patch
                | InteractionKind::Delete
                | InteractionKind::Create
                | InteractionKind::Batch
        )
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The interaction a single request resolved to.
///
/// Created when the request enters the endpoint and updated with the
/// resulting [`ResourceKey`] once the handler has produced its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    kind: InteractionKind,
    resource_type: Option<String>,
    id: Option<String>,
    version_id: Option<String>,
    operation: Option<String>,
    key: Option<ResourceKey>,
}

impl Interaction {
    /// Creates an interaction of the given kind with no target.
    pub fn new(kind: InteractionKind) -> Self {
        Self {
            kind,
            resource_type: None,
            id: None,
            version_id: None,
            operation: None,
            key: None,
        }
    }

    /// Resolves the interaction for a method and request path.
    ///
    /// Returns `None` when the combination does not name a FHIR interaction.
    pub fn resolve(method: &Method, path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let interaction = match (method, segments.as_slice()) {
            (&Method::POST, []) => Self::new(InteractionKind::Batch),
            (&Method::GET, []) => Self::new(InteractionKind::SearchSystem),
            (&Method::GET, ["metadata"]) => Self::new(InteractionKind::Capabilities),
            (&Method::GET, ["_history"]) => Self::new(InteractionKind::HistorySystem),
            (&Method::GET | &Method::POST, ["_search"]) => {
                Self::new(InteractionKind::SearchSystem)
            }
            (_, [op]) if is_operation(op) => Self::new(InteractionKind::Operation).operation(op),

            (_, [ty, op]) if is_operation(op) => Self::new(InteractionKind::Operation)
                .resource_type(ty)
                .operation(op),
            (&Method::GET | &Method::POST, [ty, "_search"]) => {
                Self::new(InteractionKind::SearchType).resource_type(ty)
            }
            (&Method::GET, [ty, "_history"]) => {
                Self::new(InteractionKind::HistoryType).resource_type(ty)
            }
            (&Method::GET, [ty]) => Self::new(InteractionKind::SearchType).resource_type(ty),
            (&Method::POST, [ty]) => Self::new(InteractionKind::Create).resource_type(ty),
            (&Method::PUT, [ty]) => Self::new(InteractionKind::Update).resource_type(ty),
            (&Method::DELETE, [ty]) => Self::new(InteractionKind::Delete).resource_type(ty),

            (_, [ty, id, op]) if is_operation(op) => Self::new(InteractionKind::Operation)
                .resource_type(ty)
                .id(id)
                .operation(op),
            (&Method::GET, [ty, id, "_history"]) => Self::new(InteractionKind::HistoryInstance)
                .resource_type(ty)
                .id(id),
            (&Method::GET, [ty, id, "_history", vid]) => Self::new(InteractionKind::VRead)
                .resource_type(ty)
                .id(id)
                .version_id(vid),
            (&Method::GET, [ty, id]) => Self::new(InteractionKind::Read).resource_type(ty).id(id),
            (&Method::PUT, [ty, id]) => {
                Self::new(InteractionKind::Update).resource_type(ty).id(id)
            }
            (&Method::PATCH, [ty, id]) => {
                Self::new(InteractionKind::Patch).resource_type(ty).id(id)
            }
            (&Method::DELETE, [ty, id]) => {
                Self::new(InteractionKind::Delete).resource_type(ty).id(id)
            }
            _ => return None,
        };

        Some(interaction)
    }

    /// Returns the methods for which a path names an interaction.
    ///
    /// An empty result means the path itself is unknown.
    pub fn allowed_methods(path: &str) -> Vec<Method> {
        [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ]
        .into_iter()
        .filter(|method| Self::resolve(method, path).is_some())
        .collect()
    }

    fn resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self
    }

    fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    fn version_id(mut self, version_id: &str) -> Self {
        self.version_id = Some(version_id.to_string());
        self
    }

    fn operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.trim_start_matches('$').to_string());
        self
    }

    /// Records the key of the resource the interaction produced.
    pub fn with_key(mut self, key: Option<ResourceKey>) -> Self {
        self.key = key;
        self
    }

    /// Returns the interaction kind.
    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    /// Returns the target resource type from the URL.
    pub fn target_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    /// Returns the target resource id from the URL.
    pub fn target_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the version id from the URL (vread only).
    pub fn target_version(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    /// Returns the operation name without its `$` prefix.
    pub fn operation_name(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Returns the key of the resource produced by the interaction.
    pub fn key(&self) -> Option<&ResourceKey> {
        self.key.as_ref()
    }
}

fn is_operation(segment: &str) -> bool {
    segment.len() > 1 && segment.starts_with('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(method: Method, path: &str) -> Option<InteractionKind> {
        Interaction::resolve(&method, path).map(|i| i.kind())
    }

    #[test]
    fn test_instance_level() {
        assert_eq!(kind(Method::GET, "/Patient/1"), Some(InteractionKind::Read));
        assert_eq!(kind(Method::PUT, "/Patient/1"), Some(InteractionKind::Update));
        assert_eq!(kind(Method::PATCH, "/Patient/1"), Some(InteractionKind::Patch));
        assert_eq!(
            kind(Method::DELETE, "/Patient/1"),
            Some(InteractionKind::Delete)
        );
        assert_eq!(
            kind(Method::GET, "/Patient/1/_history"),
            Some(InteractionKind::HistoryInstance)
        );
    }

    #[test]
    fn test_vread_targets() {
        let interaction = Interaction::resolve(&Method::GET, "/Patient/1/_history/3").unwrap();
        assert_eq!(interaction.kind(), InteractionKind::VRead);
        assert_eq!(interaction.target_type(), Some("Patient"));
        assert_eq!(interaction.target_id(), Some("1"));
        assert_eq!(interaction.target_version(), Some("3"));
    }

    #[test]
    fn test_type_and_system_level() {
        assert_eq!(kind(Method::POST, "/Patient"), Some(InteractionKind::Create));
        assert_eq!(kind(Method::GET, "/Patient"), Some(InteractionKind::SearchType));
        assert_eq!(
            kind(Method::POST, "/Patient/_search"),
            Some(InteractionKind::SearchType)
        );
        assert_eq!(
            kind(Method::GET, "/Patient/_history"),
            Some(InteractionKind::HistoryType)
        );
        assert_eq!(kind(Method::GET, "/metadata"), Some(InteractionKind::Capabilities));
        assert_eq!(kind(Method::POST, "/"), Some(InteractionKind::Batch));
        assert_eq!(kind(Method::GET, "/_history"), Some(InteractionKind::HistorySystem));
    }

    #[test]
    fn test_operations() {
        let op = Interaction::resolve(&Method::GET, "/Patient/1/$everything").unwrap();
        assert_eq!(op.kind(), InteractionKind::Operation);
        assert_eq!(op.operation_name(), Some("everything"));
        assert_eq!(op.target_id(), Some("1"));

        let op = Interaction::resolve(&Method::POST, "/$export").unwrap();
        assert_eq!(op.operation_name(), Some("export"));
        assert_eq!(op.target_type(), None);
    }

    #[test]
    fn test_unresolvable() {
        assert_eq!(kind(Method::POST, "/Patient/1"), None);
        assert_eq!(kind(Method::GET, "/Patient/1/_history/3/extra"), None);
        assert_eq!(kind(Method::PUT, "/Patient/1/_history"), None);
    }

    #[test]
    fn test_allowed_methods() {
        assert_eq!(
            Interaction::allowed_methods("/Patient/1"),
            vec![Method::GET, Method::PUT, Method::PATCH, Method::DELETE]
        );
        assert_eq!(Interaction::allowed_methods("/metadata"), vec![Method::GET]);
        assert!(Interaction::allowed_methods("/Patient/1/nonsense").is_empty());
        assert!(Interaction::allowed_methods("/Patient/1/_history/3/extra").is_empty());
    }

    #[test]
    fn test_with_key() {
        let key = ResourceKey::new("Patient", "1").with_version("2");
        let interaction = Interaction::new(InteractionKind::Create).with_key(Some(key.clone()));
        assert_eq!(interaction.key(), Some(&key));
        assert!(interaction.kind().is_write());
    }
}
