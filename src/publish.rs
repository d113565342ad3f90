use crate::{
    consts::{CHECKSUM_TYPE_SHA256, GCS_PUBLIC_BASE_URL},
    util::to_bucket_name,
};
use serde_yaml::{Mapping, Value};
use std::{io, path::Path};
use thiserror::Error as ThisError;
use url::Url;

#[derive(ThisError, Debug)]
pub enum PublishError {
    #[error("Failed to run gsutil: {0}")]
    Spawn(#[source] io::Error),
    #[error("Error uploading to GCS: {0}")]
    Upload(String),
    #[error("Could not set public ACL: {0}")]
    Acl(String),
    #[error("Archive path has no file name")]
    ArchiveName,
    #[error("Invalid public URL: {0}")]
    Url(#[source] url::ParseError),
    #[error("Failed to read service file: {0}")]
    Read(#[source] io::Error),
    #[error("Failed to parse service file: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("Failed to serialize service file: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("Failed to write service file: {0}")]
    Write(#[source] io::Error),
    #[error("Service field {0} is not a mapping")]
    NotAMapping(String),
}

/// Where an archive lives in the object store.
#[derive(Debug, PartialEq, Clone)]
pub struct ObjectLocation {
    pub bucket: String,
    pub object: String,
}

impl ObjectLocation {
    pub fn new(bucket: &str, archive: &Path) -> Result<Self, PublishError> {
        let object = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(PublishError::ArchiveName)?;

        Ok(Self {
            bucket: to_bucket_name(bucket),
            object,
        })
    }

    pub fn to_gs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.object)
    }

    pub fn to_public_url(&self) -> Result<Url, PublishError> {
        Url::parse(GCS_PUBLIC_BASE_URL)
            .and_then(|base| base.join(&format!("{}/{}", self.bucket, self.object)))
            .map_err(PublishError::Url)
    }
}

/// Points `spec.package.source` of a Service document at the uploaded
/// archive. Other checksum fields survive, every other source field is
/// replaced. The rest of the document is left as it was.
pub fn record_published_source(
    document: &mut Value,
    url: &str,
    checksum: &str,
) -> Result<(), PublishError> {
    let root = document
        .as_mapping_mut()
        .ok_or_else(|| PublishError::NotAMapping(String::from("document")))?;
    let spec = child_mapping(root, "spec")?;
    let package = child_mapping(spec, "package")?;

    let mut checksum_fields = package
        .get("source")
        .and_then(|source| source.get("checksum"))
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();
    checksum_fields.insert(key("type"), key(CHECKSUM_TYPE_SHA256));
    checksum_fields.insert(key("sum"), key(checksum));

    let mut source = Mapping::new();
    source.insert(key("type"), key("url"));
    source.insert(key("url"), key(url));
    source.insert(key("checksum"), Value::Mapping(checksum_fields));

    package.insert(key("source"), Value::Mapping(source));

    Ok(())
}

fn key(value: &str) -> Value {
    Value::String(value.to_string())
}

fn child_mapping<'a>(parent: &'a mut Mapping, name: &str) -> Result<&'a mut Mapping, PublishError> {
    let child = parent
        .entry(key(name))
        .or_insert(Value::Mapping(Mapping::new()));

    if child.is_null() {
        *child = Value::Mapping(Mapping::new());
    }

    child
        .as_mapping_mut()
        .ok_or_else(|| PublishError::NotAMapping(name.to_string()))
}
