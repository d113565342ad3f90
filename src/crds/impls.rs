use super::defs::{
    Archive, Checksum, EnvironmentReference, FunctionDefinition, IntoServiceError,
    NamespacedReference, ReferenceDefinition, Service, SourceDefinition, SourceKind,
};
use crate::consts::{CHECKSUM_TYPE_SHA256, DEFAULT_NAMESPACE, SERVERLESS_GROUP, SERVICE_KIND};
use kube::CustomResourceExt;
use serde_json::Value;
use std::collections::BTreeMap;

impl From<&str> for SourceKind {
    fn from(value: &str) -> Self {
        match value {
            "literal" => SourceKind::Literal,
            "url" => SourceKind::Url,
            other => SourceKind::Other(other.to_string()),
        }
    }
}

impl SourceKind {
    /// Classifies a source block. Checked in order, first hit wins:
    ///
    /// 1. an explicit `type`
    /// 2. a `literal` field
    /// 3. a `url` field
    ///
    /// Returns `None` when none of them is present.
    pub fn infer(source: &SourceDefinition) -> Option<Self> {
        if let Some(source_type) = source.source_type.as_deref() {
            return Some(SourceKind::from(source_type));
        }

        if source.literal.is_some() {
            return Some(SourceKind::Literal);
        }

        if source.url.is_some() {
            return Some(SourceKind::Url);
        }

        None
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::Literal => "literal",
            SourceKind::Url => "url",
            SourceKind::Other(other) => other,
        }
    }
}

impl Checksum {
    pub fn sha256(sum: String) -> Self {
        Self {
            checksum_type: Some(String::from(CHECKSUM_TYPE_SHA256)),
            sum: Some(sum),
            extra: BTreeMap::new(),
        }
    }

    fn with_default_type(&self) -> Self {
        let mut checksum = self.clone();
        if checksum.checksum_type.is_none() {
            checksum.checksum_type = Some(String::from(CHECKSUM_TYPE_SHA256));
        }
        checksum
    }
}

impl Archive {
    /// Archive holding code packaged by this crate. Nothing from the user's
    /// source block survives, the checksum is always the one we computed.
    pub fn packaged_literal(payload: String, sum: String) -> Self {
        Self {
            archive_type: SourceKind::Literal.as_str().to_string(),
            literal: Some(payload),
            url: None,
            checksum: Some(Checksum::sha256(sum)),
            extra: BTreeMap::new(),
        }
    }

    /// Copy of a user source block with `type` filled in (falling back to
    /// `url`) and an untyped checksum defaulted to sha256.
    pub fn referenced(source: &SourceDefinition, kind: Option<&SourceKind>) -> Self {
        let archive_type = source
            .source_type
            .clone()
            .unwrap_or_else(|| kind.unwrap_or(&SourceKind::Url).as_str().to_string());

        Self {
            archive_type,
            literal: source.literal.clone(),
            url: source.url.clone(),
            checksum: source.checksum.as_ref().map(Checksum::with_default_type),
            extra: source.extra.clone(),
        }
    }
}

impl ReferenceDefinition {
    pub fn to_namespaced(&self, default_namespace: &str) -> NamespacedReference {
        NamespacedReference {
            name: self.name.clone(),
            namespace: self
                .namespace
                .clone()
                .unwrap_or_else(|| default_namespace.to_string()),
        }
    }
}

impl FunctionDefinition {
    pub fn to_short_name(&self, service_name: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| service_name.to_string())
    }

    pub fn is_unnamed(&self) -> bool {
        self.name.is_none()
    }

    /// Resource name of the generated Function.
    ///
    /// An unnamed function keeps the bare service name, a named one is
    /// prefixed with it.
    pub fn to_resource_name(&self, service_name: &str) -> String {
        match self.name.as_deref() {
            None => service_name.to_string(),
            Some(short_name) => format!("{service_name}-{short_name}"),
        }
    }
}

impl Service {
    pub fn to_name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    pub fn to_namespace(&self) -> String {
        self.metadata
            .namespace
            .clone()
            .unwrap_or_else(|| String::from(DEFAULT_NAMESPACE))
    }

    /// Labels copied onto every generated resource, `None` when the service
    /// has none.
    pub fn to_labels(&self) -> Option<BTreeMap<String, String>> {
        self.metadata
            .labels
            .clone()
            .filter(|labels| !labels.is_empty())
    }

    pub fn to_package_name(&self) -> String {
        self.spec
            .package
            .name
            .clone()
            .unwrap_or_else(|| self.to_name())
    }

    pub fn to_environment_reference(&self) -> EnvironmentReference {
        let environment = &self.spec.environment;
        EnvironmentReference {
            name: environment.name.clone(),
            namespace: environment
                .namespace
                .clone()
                .unwrap_or_else(|| self.to_namespace()),
        }
    }

    pub fn generate_crd_yaml() -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&Service::crd())
    }
}

/// Checks `kind` and the API group before decoding, so a foreign document is
/// reported as such instead of as a missing field.
impl TryFrom<&Value> for Service {
    type Error = IntoServiceError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let kind = value.get("kind").and_then(Value::as_str);
        let api_version = value.get("apiVersion").and_then(Value::as_str);

        let is_service = kind == Some(SERVICE_KIND)
            && api_version.is_some_and(|api_version| api_version.starts_with(SERVERLESS_GROUP));

        if !is_service {
            return Err(IntoServiceError::NotAService {
                kind: kind.map(str::to_string),
                api_version: api_version.map(str::to_string),
            });
        }

        let service: Service =
            serde_json::from_value(value.clone()).map_err(IntoServiceError::Decode)?;

        if service.metadata.name.is_none() {
            return Err(IntoServiceError::MissingName);
        }

        Ok(service)
    }
}
