use const_format::concatcp;

pub const SERVERLESS_GROUP: &str = "serverless.krm.kubed.io";
pub const SERVERLESS_VERSION: &str = "v1alpha1";
pub const SERVERLESS_API_VERSION: &str = concatcp!(SERVERLESS_GROUP, "/", SERVERLESS_VERSION);
pub const SERVICE_KIND: &str = "Service";

pub const FISSION_GROUP: &str = "fission.io";
pub const FISSION_VERSION: &str = "v1";
pub const FISSION_API_VERSION: &str = concatcp!(FISSION_GROUP, "/", FISSION_VERSION);

pub const RESOURCE_LIST_API_VERSION: &str = "config.kubernetes.io/v1";
pub const RESOURCE_LIST_KIND: &str = "ResourceList";

pub const DEFAULT_NAMESPACE: &str = "default";

/// File name given to embedded literal source inside a package archive.
pub const DEFAULT_ENTRY_FILENAME: &str = "main.py";

pub const DESCRIPTION_ANNOTATION: &str = "kubernetes.io/description";

pub const DEFAULT_HTTP_METHOD: &str = "GET";

pub const PACKAGE_BUILD_STATUS_PENDING: &str = "pending";

pub const CHECKSUM_TYPE_SHA256: &str = "sha256";

pub const BUCKET_ENV_VAR: &str = "FX_BUCKET";
pub const DEFAULT_BUCKET: &str = "serverless-functions";

pub const GCS_PUBLIC_BASE_URL: &str = "https://storage.googleapis.com/";
