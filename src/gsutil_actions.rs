use crate::publish::PublishError;
use std::path::Path;
use tokio::process::Command;

/// `gsutil cp <archive> <destination>`
pub async fn upload(archive: &Path, destination: &str) -> Result<(), PublishError> {
    let output = Command::new("gsutil")
        .arg("cp")
        .arg(archive)
        .arg(destination)
        .output()
        .await
        .map_err(PublishError::Spawn)?;

    if !output.status.success() {
        return Err(PublishError::Upload(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(())
}

/// `gsutil acl ch -u AllUsers:R <destination>`
pub async fn grant_public_read(destination: &str) -> Result<(), PublishError> {
    let output = Command::new("gsutil")
        .arg("acl")
        .arg("ch")
        .arg("-u")
        .arg("AllUsers:R")
        .arg(destination)
        .output()
        .await
        .map_err(PublishError::Spawn)?;

    if !output.status.success() {
        return Err(PublishError::Acl(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(())
}
