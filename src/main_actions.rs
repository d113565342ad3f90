use crate::{
    archive::{default_archive_path, load_service_file, PackPlan, PackedArchive},
    crds::defs::Service,
    expansion::transform,
    gsutil_actions,
    krm::ResourceList,
    publish::{record_published_source, ObjectLocation, PublishError},
};
use anyhow::{Context, Result as AnyResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{trace_span, Instrument};

pub async fn transform_resource_list(file: Option<PathBuf>) -> AnyResult<()> {
    let input = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read resource list from {}", path.display()))?,
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Failed to read resource list from stdin")?;
            input
        }
    };

    let resource_list = ResourceList::from_yaml_str(&input)?;
    let items_before = resource_list.items.len();

    let resource_list = transform(resource_list).context("Failed to transform resource list")?;

    tracing::info!(
        generated = resource_list.items.len() - items_before,
        "Transformed resource list"
    );

    let output = resource_list.to_yaml_string()?;

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(output.as_bytes())
        .await
        .context("Failed to write resource list")?;
    stdout.flush().await.context("Failed to write resource list")?;

    Ok(())
}

pub async fn pack_service(service_file: PathBuf, out: Option<PathBuf>, quiet: bool) -> AnyResult<()> {
    let packed = pack(&service_file, out)?;

    if !quiet {
        print_pack_summary(&packed);
    }

    Ok(())
}

pub async fn publish_service(service_file: PathBuf, bucket: String) -> AnyResult<()> {
    let packed = pack(&service_file, None)?;

    let span = trace_span!("Publish", archive = %packed.path.display(), %bucket);
    let published = upload_and_record(&service_file, &bucket, &packed)
        .instrument(span)
        .await;

    if let Err(error) = tokio::fs::remove_file(&packed.path).await {
        tracing::warn!(%error, path = %packed.path.display(), "Failed to remove archive");
    }

    let public_url = published?;

    println!("Published {}", public_url);
    println!("Updated {}", service_file.display());

    Ok(())
}

async fn upload_and_record(
    service_file: &Path,
    bucket: &str,
    packed: &PackedArchive,
) -> AnyResult<String> {
    let location = ObjectLocation::new(bucket, &packed.path)?;
    let destination = location.to_gs_uri();
    let public_url = location.to_public_url()?;

    tracing::info!(%destination, "Uploading archive");
    gsutil_actions::upload(&packed.path, &destination)
        .await
        .context("Failed to upload archive")?;

    if let Err(error) = gsutil_actions::grant_public_read(&destination).await {
        tracing::warn!(%error, %destination, "Failed to make archive publicly readable");
    }

    let content = tokio::fs::read_to_string(service_file)
        .await
        .map_err(PublishError::Read)?;
    let mut document: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(PublishError::Parse)?;

    record_published_source(&mut document, public_url.as_str(), &packed.checksum)?;

    let updated = serde_yaml::to_string(&document).map_err(PublishError::Serialize)?;
    tokio::fs::write(service_file, updated)
        .await
        .map_err(PublishError::Write)?;

    tracing::info!(url = %public_url, "Recorded published source");

    Ok(public_url.to_string())
}

fn pack(service_file: &Path, out: Option<PathBuf>) -> AnyResult<PackedArchive> {
    let service = load_service_file(service_file).context("Failed to load service")?;
    let source_dir = to_source_dir(service_file);

    let plan = PackPlan::from_service(&service, source_dir)?;
    let output =
        out.unwrap_or_else(|| default_archive_path(&service.to_package_name(), Utc::now()));

    let packed = plan
        .write_to(&output)
        .with_context(|| format!("Failed to pack {}", output.display()))?;

    tracing::info!(
        path = %packed.path.display(),
        entries = packed.entries.len(),
        checksum = %packed.checksum,
        "Packed archive"
    );

    Ok(packed)
}

/// Source files live next to the service file.
fn to_source_dir(service_file: &Path) -> &Path {
    service_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn print_pack_summary(packed: &PackedArchive) {
    println!("Packed {} file(s):", packed.entries.len());
    for entry in &packed.entries {
        if entry.embedded {
            println!("  {} (embedded)", entry.name);
        } else {
            println!("  {}", entry.name);
        }
    }
    println!("Archive: {}", packed.path.display());
    println!("Size: {} bytes", packed.size);
    println!("SHA-256: {}", packed.checksum);
}

pub fn print_crd() -> AnyResult<()> {
    println!(
        "{}",
        Service::generate_crd_yaml().context("Failed to generate crd")?
    );
    Ok(())
}

pub async fn write_crd_to_file(path: PathBuf) -> AnyResult<()> {
    let crds = Service::generate_crd_yaml().context("Failed to generate crd")?;
    tokio::fs::write(path, crds)
        .await
        .context("Failed to write crd to file")?;
    Ok(())
}
