use super::errors::PackageError;
use crate::{
    archive::package_literal,
    consts::{
        DEFAULT_ENTRY_FILENAME, DEFAULT_HTTP_METHOD, DESCRIPTION_ANNOTATION,
        PACKAGE_BUILD_STATUS_PENDING,
    },
    crds::defs::{
        Archive, EnvironmentReference, ExecutionStrategy, Function, FunctionConfig,
        FunctionPackageRef, FunctionReference, FunctionSpec, HTTPTrigger, HTTPTriggerSpec,
        HttpTriggerDefinition, InvokeStrategy, NamespacedReference, Package, PackageDefinition,
        PackageSpec, PackageStatus, SourceKind,
    },
};
use kube::core::ObjectMeta;
use std::collections::BTreeMap;

pub const DEFAULT_STRATEGY_TYPE: &str = "execution";
pub const DEFAULT_EXECUTOR_TYPE: &str = "poolmgr";

/// Invocation strategy of functions that do not set one.
pub fn default_invoke_strategy() -> InvokeStrategy {
    InvokeStrategy {
        strategy_type: String::from(DEFAULT_STRATEGY_TYPE),
        execution_strategy: Some(ExecutionStrategy {
            executor_type: String::from(DEFAULT_EXECUTOR_TYPE),
            min_scale: None,
            max_scale: None,
            target_cpu_percent: None,
            specialization_timeout: None,
        }),
    }
}

fn to_meta(name: &str, namespace: &str, labels: Option<&BTreeMap<String, String>>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: labels.cloned(),
        ..Default::default()
    }
}

pub struct PackageBuilder<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub labels: Option<&'a BTreeMap<String, String>>,
    pub package: &'a PackageDefinition,
    pub environment: &'a EnvironmentReference,
}

impl PackageBuilder<'_> {
    fn to_source(&self) -> Result<Option<Archive>, PackageError> {
        let Some(source) = self.package.source.as_ref() else {
            return Ok(None);
        };

        let kind = SourceKind::infer(source);

        match (&kind, source.literal.as_deref()) {
            (Some(SourceKind::Literal), Some(code)) => {
                let packaged = package_literal(code, DEFAULT_ENTRY_FILENAME)
                    .map_err(PackageError::Literal)?;

                tracing::debug!(checksum = %packaged.checksum, "Packaged literal source");

                Ok(Some(Archive::packaged_literal(
                    packaged.payload,
                    packaged.checksum,
                )))
            }
            _ => Ok(Some(Archive::referenced(source, kind.as_ref()))),
        }
    }

    fn to_buildcmd(&self) -> Option<String> {
        self.package
            .buildcmd
            .clone()
            .filter(|buildcmd| !buildcmd.is_empty())
    }
}

impl TryFrom<&PackageBuilder<'_>> for Package {
    type Error = PackageError;

    fn try_from(value: &PackageBuilder<'_>) -> Result<Self, Self::Error> {
        Ok(Package {
            metadata: to_meta(value.name, value.namespace, value.labels),
            spec: PackageSpec {
                environment: value.environment.clone(),
                source: value.to_source()?,
                buildcmd: value.to_buildcmd(),
            },
            status: Some(PackageStatus {
                buildstatus: String::from(PACKAGE_BUILD_STATUS_PENDING),
            }),
        })
    }
}

pub struct FunctionBuilder<'a> {
    /// Generated resource name
    pub name: &'a str,
    pub namespace: &'a str,
    pub labels: Option<&'a BTreeMap<String, String>>,
    pub description: Option<&'a str>,
    /// Entry point inside the package
    pub function_name: &'a str,
    pub package_name: &'a str,
    pub environment: &'a EnvironmentReference,
    pub secrets: Vec<NamespacedReference>,
    pub configmaps: Vec<NamespacedReference>,
    /// Template merged with the function's own settings
    pub config: &'a FunctionConfig,
}

impl FunctionBuilder<'_> {
    fn to_meta(&self) -> ObjectMeta {
        let mut meta = to_meta(self.name, self.namespace, self.labels);

        if let Some(description) = self.description.filter(|description| !description.is_empty()) {
            meta.annotations = Some(BTreeMap::from([(
                String::from(DESCRIPTION_ANNOTATION),
                description.to_string(),
            )]));
        }

        meta
    }
}

impl From<&FunctionBuilder<'_>> for Function {
    fn from(value: &FunctionBuilder<'_>) -> Self {
        let config = value.config;

        Function {
            metadata: value.to_meta(),
            spec: FunctionSpec {
                environment: value.environment.clone(),
                package: FunctionPackageRef {
                    packageref: NamespacedReference {
                        name: value.package_name.to_string(),
                        namespace: value.namespace.to_string(),
                    },
                    function_name: value.function_name.to_string(),
                },
                secrets: value.secrets.clone(),
                configmaps: value.configmaps.clone(),
                invoke_strategy: config
                    .invoke_strategy
                    .clone()
                    .unwrap_or_else(default_invoke_strategy),
                requests_per_pod: config.requests_per_pod,
                retain_pods: config.retain_pods,
                concurrency: config.concurrency,
                function_timeout: config.function_timeout,
                idle_timeout: config.idle_timeout,
                once_only: config.once_only,
                resources: config.resources.clone(),
                pod_spec: config.pod_spec.clone(),
            },
        }
    }
}

/// Route of a trigger without an explicit `path`.
pub fn infer_relative_url(service_name: &str, short_name: &str) -> String {
    if short_name == service_name {
        format!("/{service_name}")
    } else {
        format!("/{service_name}/{short_name}")
    }
}

pub struct HttpTriggerBuilder<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub labels: Option<&'a BTreeMap<String, String>>,
    /// Generated resource name of the owning function
    pub function_name: &'a str,
    pub service_name: &'a str,
    pub short_name: &'a str,
    pub http: &'a HttpTriggerDefinition,
}

impl HttpTriggerBuilder<'_> {
    fn to_relative_url(&self) -> String {
        self.http
            .path
            .clone()
            .unwrap_or_else(|| infer_relative_url(self.service_name, self.short_name))
    }
}

impl From<&HttpTriggerBuilder<'_>> for HTTPTrigger {
    fn from(value: &HttpTriggerBuilder<'_>) -> Self {
        HTTPTrigger {
            metadata: to_meta(value.name, value.namespace, value.labels),
            spec: HTTPTriggerSpec {
                host: value.http.host.clone().unwrap_or_default(),
                method: value
                    .http
                    .method
                    .clone()
                    .unwrap_or_else(|| String::from(DEFAULT_HTTP_METHOD)),
                relativeurl: value.to_relative_url(),
                functionref: FunctionReference {
                    reference_type: String::from("name"),
                    name: value.function_name.to_string(),
                },
            },
        }
    }
}
