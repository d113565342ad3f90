use crate::crds::defs::{FunctionConfig, ReferenceDefinition, TriggerDefinition};

impl FunctionConfig {
    /// Overlays the mergeable settings of `overrides` on `self`.
    ///
    /// A setting present in `overrides` replaces the default as a whole, it is
    /// never merged further. `secrets`, `configmaps` and `triggers` are kept
    /// from `self`, see [`NoMergeField`] for how those are chosen.
    pub fn merge(&self, overrides: &FunctionConfig) -> FunctionConfig {
        FunctionConfig {
            invoke_strategy: pick(&overrides.invoke_strategy, &self.invoke_strategy),
            requests_per_pod: overrides.requests_per_pod.or(self.requests_per_pod),
            retain_pods: overrides.retain_pods.or(self.retain_pods),
            concurrency: overrides.concurrency.or(self.concurrency),
            function_timeout: overrides.function_timeout.or(self.function_timeout),
            idle_timeout: overrides.idle_timeout.or(self.idle_timeout),
            once_only: overrides.once_only.or(self.once_only),
            resources: pick(&overrides.resources, &self.resources),
            pod_spec: pick(&overrides.pod_spec, &self.pod_spec),
            secrets: self.secrets.clone(),
            configmaps: self.configmaps.clone(),
            triggers: self.triggers.clone(),
        }
    }
}

fn pick<T: Clone>(preferred: &Option<T>, fallback: &Option<T>) -> Option<T> {
    preferred.as_ref().or(fallback.as_ref()).cloned()
}

/// A list setting chosen all-or-nothing: the function's own value if it
/// declares one (even an empty list), else the template's, else nothing.
pub struct NoMergeField<T: 'static> {
    pub name: &'static str,
    get: fn(&FunctionConfig) -> Option<&[T]>,
}

pub const SECRETS: NoMergeField<ReferenceDefinition> = NoMergeField {
    name: "secrets",
    get: secrets_of,
};

pub const CONFIGMAPS: NoMergeField<ReferenceDefinition> = NoMergeField {
    name: "configmaps",
    get: configmaps_of,
};

pub const TRIGGERS: NoMergeField<TriggerDefinition> = NoMergeField {
    name: "triggers",
    get: triggers_of,
};

fn secrets_of(config: &FunctionConfig) -> Option<&[ReferenceDefinition]> {
    config.secrets.as_deref()
}

fn configmaps_of(config: &FunctionConfig) -> Option<&[ReferenceDefinition]> {
    config.configmaps.as_deref()
}

fn triggers_of(config: &FunctionConfig) -> Option<&[TriggerDefinition]> {
    config.triggers.as_deref()
}

impl<T: 'static> NoMergeField<T> {
    pub fn resolve<'a>(&self, function: &'a FunctionConfig, template: &'a FunctionConfig) -> &'a [T] {
        if let Some(values) = (self.get)(function) {
            tracing::trace!(field = self.name, "Using function value");
            return values;
        }

        if let Some(values) = (self.get)(template) {
            tracing::trace!(field = self.name, "Using template value");
            return values;
        }

        &[]
    }
}
