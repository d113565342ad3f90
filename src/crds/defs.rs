use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

/// A group of functions sharing one source package and one environment.
///
/// Expanded into a Fission `Package`, one `Function` per entry of `functions`
/// and one `HTTPTrigger` per trigger.
#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "serverless.krm.kubed.io",
    version = "v1alpha1",
    kind = "Service",
    plural = "services",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// package describes where the function code comes from
    #[serde(default)]
    pub package: PackageDefinition,

    /// environment is the Fission environment the functions run in
    pub environment: EnvironmentDefinition,

    /// functionTemplate holds defaults applied to every function
    #[serde(default)]
    pub function_template: FunctionConfig,

    /// functions to generate, in order
    #[serde(default)]
    pub functions: Vec<FunctionDefinition>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
pub struct PackageDefinition {
    /// name of the generated package, defaults to the service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// include lists wildcard patterns of files to pack
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceDefinition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildcmd: Option<String>,
}

/// Source block as written by the user. Either embedded code (`literal`)
/// or a reference to an uploaded archive (`url`).
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
pub struct SourceDefinition {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
pub struct Checksum {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub checksum_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct EnvironmentDefinition {
    pub name: String,

    /// namespace of the environment, defaults to the service namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    /// short name of the function, defaults to the service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// functionName is the entry point inside the package, e.g. `main.handler`
    pub function_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub config: FunctionConfig,
}

/// Per-function settings. Used both for `spec.functionTemplate` and for the
/// overrides carried by each function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoke_strategy: Option<InvokeStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_pod: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_pods: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_timeout: Option<i32>,

    #[serde(rename = "idletimeout", skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub once_only: Option<bool>,

    /// resources (requests and limits) are passed to Fission untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,

    /// podspec is passed to Fission untouched
    #[serde(rename = "podspec", skip_serializing_if = "Option::is_none")]
    pub pod_spec: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<ReferenceDefinition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub configmaps: Option<Vec<ReferenceDefinition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<TriggerDefinition>>,
}

/// Secret or config map reference, namespace defaults to the service namespace.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct ReferenceDefinition {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
pub struct TriggerDefinition {
    #[serde(default)]
    pub http: HttpTriggerDefinition,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
pub struct HttpTriggerDefinition {
    /// path overrides the inferred `/<service>[/<function>]` route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// host to match, empty or absent matches any host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// InvokeStrategy in the field casing of the Fission CRD.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct InvokeStrategy {
    #[serde(rename = "StrategyType")]
    pub strategy_type: String,

    #[serde(rename = "ExecutionStrategy", skip_serializing_if = "Option::is_none")]
    pub execution_strategy: Option<ExecutionStrategy>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct ExecutionStrategy {
    #[serde(rename = "ExecutorType")]
    pub executor_type: String,

    #[serde(rename = "MinScale", skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<i32>,

    #[serde(rename = "MaxScale", skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<i32>,

    #[serde(rename = "TargetCPUPercent", skip_serializing_if = "Option::is_none")]
    pub target_cpu_percent: Option<i32>,

    #[serde(rename = "SpecializationTimeout", skip_serializing_if = "Option::is_none")]
    pub specialization_timeout: Option<i32>,
}

/// How a package source was classified, see [`SourceKind::infer`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SourceKind {
    /// Embedded code that has to be zipped into the package
    Literal,
    /// Reference to an already uploaded archive
    Url,
    /// Any other explicit `type`, kept as written
    Other(String),
}

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "fission.io",
    version = "v1",
    kind = "Package",
    plural = "packages",
    derive = "PartialEq",
    status = "PackageStatus",
    namespaced
)]
pub struct PackageSpec {
    pub environment: EnvironmentReference,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Archive>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildcmd: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct PackageStatus {
    pub buildstatus: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct EnvironmentReference {
    pub name: String,
    pub namespace: String,
}

/// Archive as stored in `Package.spec.source`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct Archive {
    #[serde(rename = "type")]
    pub archive_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "fission.io",
    version = "v1",
    kind = "Function",
    plural = "functions",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    pub environment: EnvironmentReference,

    pub package: FunctionPackageRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<NamespacedReference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configmaps: Vec<NamespacedReference>,

    #[serde(rename = "InvokeStrategy")]
    pub invoke_strategy: InvokeStrategy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_pod: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_pods: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_timeout: Option<i32>,

    #[serde(rename = "idletimeout", skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub once_only: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,

    #[serde(rename = "podspec", skip_serializing_if = "Option::is_none")]
    pub pod_spec: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct FunctionPackageRef {
    pub packageref: NamespacedReference,

    #[serde(rename = "functionName")]
    pub function_name: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct NamespacedReference {
    pub name: String,
    pub namespace: String,
}

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "fission.io",
    version = "v1",
    kind = "HTTPTrigger",
    plural = "httptriggers",
    derive = "PartialEq",
    namespaced
)]
pub struct HTTPTriggerSpec {
    pub host: String,
    pub method: String,
    pub relativeurl: String,
    pub functionref: FunctionReference,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct FunctionReference {
    #[serde(rename = "type")]
    pub reference_type: String,
    pub name: String,
}

#[derive(ThisError, Debug)]
pub enum IntoServiceError {
    #[error("File is not a serverless Service resource (kind: {kind:?}, apiVersion: {api_version:?})")]
    NotAService {
        kind: Option<String>,
        api_version: Option<String>,
    },
    #[error("Service has no metadata.name")]
    MissingName,
    #[error("Failed to decode Service: {0}")]
    Decode(#[source] serde_json::Error),
}
