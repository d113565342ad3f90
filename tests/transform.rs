use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use serverless_krm::{
    consts::{FISSION_API_VERSION, SERVERLESS_API_VERSION},
    expansion::{transform, TransformError},
    krm::{ResourceList, ResourceListError},
};
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn resource_list(function_config: &str) -> ResourceList {
    let function_config: Value = serde_yaml::from_str(function_config).expect("valid yaml");
    ResourceList::new(function_config, Vec::new())
}

fn kinds(items: &[Value]) -> Vec<&str> {
    items
        .iter()
        .map(|item| item["kind"].as_str().unwrap_or_default())
        .collect()
}

fn names(items: &[Value], kind: &str) -> Vec<String> {
    items
        .iter()
        .filter(|item| item["kind"] == kind)
        .map(|item| item["metadata"]["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

const HELLO: &str = r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  environment:
    name: python
  functions:
    - functionName: main.handler
      triggers:
        - http: {}
"#;

#[test]
fn single_unnamed_function_uses_service_name() {
    let output = transform(resource_list(HELLO)).expect("transforms");

    assert_eq!(kinds(&output.items), vec!["Package", "Function", "HTTPTrigger"]);

    let package = &output.items[0];
    for item in &output.items {
        assert_eq!(item["apiVersion"], FISSION_API_VERSION);
    }
    assert_eq!(package["metadata"]["name"], "hello");
    assert_eq!(package["metadata"]["namespace"], "default");
    assert_eq!(package["status"]["buildstatus"], "pending");
    assert_eq!(
        package["spec"]["environment"],
        json!({"name": "python", "namespace": "default"})
    );

    let function = &output.items[1];
    assert_eq!(function["metadata"]["name"], "hello");
    assert_eq!(function["spec"]["package"]["functionName"], "main.handler");
    assert_eq!(
        function["spec"]["package"]["packageref"],
        json!({"name": "hello", "namespace": "default"})
    );
    assert_eq!(function["spec"]["InvokeStrategy"]["StrategyType"], "execution");
    assert_eq!(
        function["spec"]["InvokeStrategy"]["ExecutionStrategy"]["ExecutorType"],
        "poolmgr"
    );

    let trigger = &output.items[2];
    assert_eq!(trigger["metadata"]["name"], "hello");
    assert_eq!(trigger["spec"]["relativeurl"], "/hello");
    assert_eq!(trigger["spec"]["method"], "GET");
    assert_eq!(trigger["spec"]["host"], "");
    assert_eq!(
        trigger["spec"]["functionref"],
        json!({"type": "name", "name": "hello"})
    );
}

#[test]
fn named_functions_are_prefixed_with_service_name() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: api
spec:
  environment:
    name: python
  functions:
    - name: list
      functionName: api.list
      triggers:
        - http: {}
    - name: get
      functionName: api.get
      triggers:
        - http:
            method: POST
"#,
    ))
    .expect("transforms");

    assert_eq!(
        kinds(&output.items),
        vec!["Package", "Function", "HTTPTrigger", "Function", "HTTPTrigger"]
    );
    assert_eq!(names(&output.items, "Function"), vec!["api-list", "api-get"]);

    let paths: Vec<&Value> = output
        .items
        .iter()
        .filter(|item| item["kind"] == "HTTPTrigger")
        .map(|item| &item["spec"]["relativeurl"])
        .collect();
    assert_eq!(paths, vec!["/api/list", "/api/get"]);

    assert_eq!(output.items[4]["spec"]["method"], "POST");
    assert_eq!(output.items[4]["spec"]["functionref"]["name"], "api-get");
}

#[test]
fn literal_source_is_packaged() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  package:
    source:
      literal: "print('hi')"
      checksum:
        sum: not-trusted
  environment:
    name: python
  functions:
    - functionName: main.handler
"#,
    ))
    .expect("transforms");

    let source = &output.items[0]["spec"]["source"];
    assert_eq!(source["type"], "literal");
    assert_eq!(source["checksum"]["type"], "sha256");
    assert_ne!(source["checksum"]["sum"], "not-trusted");

    let bytes = STANDARD
        .decode(source["literal"].as_str().expect("payload"))
        .expect("base64");
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip");
    assert_eq!(archive.len(), 1);

    let mut file = archive.by_index(0).expect("entry");
    assert_eq!(file.name(), "main.py");
    let mut content = String::new();
    file.read_to_string(&mut content).expect("utf-8");
    assert_eq!(content, "print('hi')");
}

#[test]
fn url_source_is_copied_with_defaults() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  package:
    buildcmd: ./build.sh
    source:
      url: https://storage.googleapis.com/functions/hello.zip
      checksum:
        sum: abc
  environment:
    name: python
    namespace: fission
  functions:
    - functionName: main.handler
"#,
    ))
    .expect("transforms");

    let package = &output.items[0];
    assert_eq!(
        package["spec"]["source"],
        json!({
            "type": "url",
            "url": "https://storage.googleapis.com/functions/hello.zip",
            "checksum": {"type": "sha256", "sum": "abc"}
        })
    );
    assert_eq!(package["spec"]["buildcmd"], "./build.sh");
    assert_eq!(package["spec"]["environment"]["namespace"], "fission");
}

#[test]
fn several_unnamed_functions_fail_without_output() {
    let result = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  environment:
    name: python
  functions:
    - functionName: a.handler
    - functionName: b.handler
"#,
    ));

    assert!(matches!(result, Err(TransformError::AmbiguousFunctionNames)));
}

#[test]
fn empty_functions_fail() {
    let result = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  environment:
    name: python
  functions: []
"#,
    ));

    assert!(matches!(result, Err(TransformError::NoFunctions)));
}

#[test]
fn duplicate_short_names_fail() {
    let result = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: api
spec:
  environment:
    name: python
  functions:
    - name: list
      functionName: a.handler
    - name: list
      functionName: b.handler
"#,
    ));

    assert!(matches!(
        result,
        Err(TransformError::DuplicateFunctionName(name)) if name == "list"
    ));
}

#[test]
fn rejects_foreign_function_config() {
    let result = transform(resource_list(
        r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: hello
"#,
    ));

    assert!(matches!(
        result,
        Err(TransformError::ResourceList(ResourceListError::FunctionConfig(_)))
    ));
}

#[test]
fn transform_is_deterministic() {
    let input = r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  package:
    source:
      literal: "print('hi')"
  environment:
    name: python
  functions:
    - functionName: main.handler
      triggers:
        - http: {}
"#;

    let first = transform(resource_list(input))
        .expect("transforms")
        .to_yaml_string()
        .expect("serializes");
    let second = transform(resource_list(input))
        .expect("transforms")
        .to_yaml_string()
        .expect("serializes");

    assert_eq!(first, second);
}

#[test]
fn existing_items_are_kept_in_front() {
    let input = ResourceList::from_yaml_str(
        r#"
apiVersion: config.kubernetes.io/v1
kind: ResourceList
results: []
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: keep-me
functionConfig:
  apiVersion: serverless.krm.kubed.io/v1alpha1
  kind: Service
  metadata:
    name: hello
  spec:
    environment:
      name: python
    functions:
      - functionName: main.handler
"#,
    )
    .expect("parses");

    assert_eq!(input.function_config["apiVersion"], SERVERLESS_API_VERSION);

    let output = transform(input).expect("transforms");

    assert_eq!(kinds(&output.items), vec!["ConfigMap", "Package", "Function"]);
    assert_eq!(output.items[0]["metadata"]["name"], "keep-me");
    assert_eq!(output.extra.get("results"), Some(&json!([])));
}

#[test]
fn labels_and_namespace_reach_every_resource() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
  namespace: team
  labels:
    app: hello
    tier: backend
spec:
  environment:
    name: python
  functions:
    - functionName: main.handler
      description: Says hello
      triggers:
        - http: {}
"#,
    ))
    .expect("transforms");

    for item in &output.items {
        assert_eq!(item["metadata"]["namespace"], "team");
        assert_eq!(
            item["metadata"]["labels"],
            json!({"app": "hello", "tier": "backend"})
        );
    }

    assert_eq!(
        output.items[1]["metadata"]["annotations"]["kubernetes.io/description"],
        "Says hello"
    );
    assert_eq!(output.items[1]["spec"]["environment"]["namespace"], "team");
}

#[test]
fn template_is_merged_and_lists_are_not() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: api
  namespace: team
spec:
  environment:
    name: python
  functionTemplate:
    concurrency: 5
    functionTimeout: 60
    secrets:
      - name: shared
    configmaps:
      - name: settings
        namespace: config
    triggers:
      - http: {}
  functions:
    - name: list
      functionName: api.list
      functionTimeout: 10
    - name: get
      functionName: api.get
      secrets: []
      triggers: []
"#,
    ))
    .expect("transforms");

    assert_eq!(
        kinds(&output.items),
        vec!["Package", "Function", "HTTPTrigger", "Function"]
    );

    let list = &output.items[1];
    assert_eq!(list["spec"]["concurrency"], 5);
    assert_eq!(list["spec"]["functionTimeout"], 10);
    assert_eq!(
        list["spec"]["secrets"],
        json!([{"name": "shared", "namespace": "team"}])
    );
    assert_eq!(
        list["spec"]["configmaps"],
        json!([{"name": "settings", "namespace": "config"}])
    );

    let get = &output.items[3];
    assert_eq!(get["spec"]["concurrency"], 5);
    assert_eq!(get["spec"]["functionTimeout"], 60);
    assert!(get["spec"].get("secrets").is_none());
    assert_eq!(
        get["spec"]["configmaps"],
        json!([{"name": "settings", "namespace": "config"}])
    );
}

#[test]
fn extra_triggers_are_numbered() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: api
spec:
  environment:
    name: python
  functions:
    - name: items
      functionName: api.items
      triggers:
        - http: {}
        - http:
            path: /items/{id}
            method: DELETE
            host: example.com
"#,
    ))
    .expect("transforms");

    assert_eq!(names(&output.items, "HTTPTrigger"), vec!["api-items", "api-items-2"]);

    let second = &output.items[3];
    assert_eq!(second["spec"]["relativeurl"], "/items/{id}");
    assert_eq!(second["spec"]["method"], "DELETE");
    assert_eq!(second["spec"]["host"], "example.com");
}

#[test]
fn resources_pass_through_unchanged() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: hello
spec:
  environment:
    name: python
  functions:
    - functionName: main.handler
      resources:
        limits:
          cpu: 1
          memory: 256Mi
"#,
    ))
    .expect("transforms");

    assert_eq!(
        output.items[1]["spec"]["resources"],
        json!({"limits": {"cpu": 1, "memory": "256Mi"}})
    );
}

#[test]
fn one_unnamed_function_next_to_a_named_one() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: svc
spec:
  environment:
    name: python
  functions:
    - functionName: main.handler
      triggers:
        - http: {}
    - name: x
      functionName: x.handler
      triggers:
        - http: {}
"#,
    ))
    .expect("transforms");

    assert_eq!(names(&output.items, "Function"), vec!["svc", "svc-x"]);

    let paths: Vec<&Value> = output
        .items
        .iter()
        .filter(|item| item["kind"] == "HTTPTrigger")
        .map(|item| &item["spec"]["relativeurl"])
        .collect();
    assert_eq!(paths, vec!["/svc", "/svc/x"]);
}

#[test]
fn function_named_like_the_service_keeps_prefix() {
    let output = transform(resource_list(
        r#"
apiVersion: serverless.krm.kubed.io/v1alpha1
kind: Service
metadata:
  name: svc
spec:
  environment:
    name: python
  functions:
    - name: svc
      functionName: main.handler
      triggers:
        - http: {}
"#,
    ))
    .expect("transforms");

    assert_eq!(names(&output.items, "Function"), vec!["svc-svc"]);
    assert_eq!(names(&output.items, "HTTPTrigger"), vec!["svc-svc"]);
    assert_eq!(output.items[2]["spec"]["relativeurl"], "/svc");
    assert_eq!(output.items[2]["spec"]["functionref"]["name"], "svc-svc");
}
