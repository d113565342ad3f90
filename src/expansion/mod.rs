mod builders;
mod errors;
mod merge;

pub use builders::{
    default_invoke_strategy, infer_relative_url, FunctionBuilder, HttpTriggerBuilder,
    PackageBuilder, DEFAULT_EXECUTOR_TYPE, DEFAULT_STRATEGY_TYPE,
};
pub use errors::{PackageError, TransformError};
pub use merge::{NoMergeField, CONFIGMAPS, SECRETS, TRIGGERS};

use crate::{
    crds::defs::{Function, FunctionDefinition, HTTPTrigger, Package, Service},
    krm::ResourceList,
};
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use tracing::trace_span;

/// Appends the resources generated from `functionConfig` to `items`.
///
/// Nothing is appended unless the whole expansion succeeds.
pub fn transform(mut resource_list: ResourceList) -> Result<ResourceList, TransformError> {
    let service = resource_list
        .service()
        .map_err(TransformError::ResourceList)?;

    let generated = expand(&service)?;
    resource_list.items.extend(generated);

    Ok(resource_list)
}

/// Package first, then every function followed by its triggers, in the
/// order the functions are declared.
pub fn expand(service: &Service) -> Result<Vec<Value>, TransformError> {
    let service_name = service.to_name();
    let namespace = service.to_namespace();
    let labels = service.to_labels();
    let environment = service.to_environment_reference();
    let package_name = service.to_package_name();
    let template = &service.spec.function_template;

    let _span = trace_span!("Expand", service = %service_name, %namespace).entered();

    let mut generated = Vec::new();

    let package = Package::try_from(&PackageBuilder {
        name: &package_name,
        namespace: &namespace,
        labels: labels.as_ref(),
        package: &service.spec.package,
        environment: &environment,
    })
    .map_err(TransformError::Package)?;

    tracing::debug!(package = %package_name, "Generated package");
    generated.push(to_item(&package)?);

    validate_functions(&service.spec.functions, &service_name)?;

    for definition in &service.spec.functions {
        let short_name = definition.to_short_name(&service_name);
        let function_name = definition.to_resource_name(&service_name);

        let _span = trace_span!("Function", function = %function_name).entered();

        let config = template.merge(&definition.config);

        let secrets = SECRETS
            .resolve(&definition.config, template)
            .iter()
            .map(|secret| secret.to_namespaced(&namespace))
            .collect();

        let configmaps = CONFIGMAPS
            .resolve(&definition.config, template)
            .iter()
            .map(|configmap| configmap.to_namespaced(&namespace))
            .collect();

        let function = Function::from(&FunctionBuilder {
            name: &function_name,
            namespace: &namespace,
            labels: labels.as_ref(),
            description: definition.description.as_deref(),
            function_name: &definition.function_name,
            package_name: &package_name,
            environment: &environment,
            secrets,
            configmaps,
            config: &config,
        });

        tracing::debug!("Generated function");
        generated.push(to_item(&function)?);

        let triggers = TRIGGERS.resolve(&definition.config, template);

        for (index, trigger) in triggers.iter().enumerate() {
            let trigger_name = to_trigger_name(&function_name, index);

            let http_trigger = HTTPTrigger::from(&HttpTriggerBuilder {
                name: &trigger_name,
                namespace: &namespace,
                labels: labels.as_ref(),
                function_name: &function_name,
                service_name: &service_name,
                short_name: &short_name,
                http: &trigger.http,
            });

            tracing::debug!(
                trigger = %trigger_name,
                path = %http_trigger.spec.relativeurl,
                "Generated http trigger"
            );
            generated.push(to_item(&http_trigger)?);
        }
    }

    tracing::info!(
        service = %service_name,
        resources = generated.len(),
        "Expanded service"
    );

    Ok(generated)
}

fn validate_functions(
    functions: &[FunctionDefinition],
    service_name: &str,
) -> Result<(), TransformError> {
    if functions.is_empty() {
        return Err(TransformError::NoFunctions);
    }

    if functions.iter().filter(|function| function.is_unnamed()).count() > 1 {
        return Err(TransformError::AmbiguousFunctionNames);
    }

    if let Some(name) = functions
        .iter()
        .map(|function| function.to_short_name(service_name))
        .duplicates()
        .next()
    {
        return Err(TransformError::DuplicateFunctionName(name));
    }

    Ok(())
}

/// The first trigger of a function shares its name, later ones are numbered
/// from 2.
fn to_trigger_name(function_name: &str, index: usize) -> String {
    match index {
        0 => function_name.to_string(),
        index => format!("{}-{}", function_name, index + 1),
    }
}

fn to_item<T: Serialize>(resource: &T) -> Result<Value, TransformError> {
    serde_json::to_value(resource).map_err(TransformError::Serialize)
}
