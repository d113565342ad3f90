use crate::{
    consts::DEFAULT_ENTRY_FILENAME,
    crds::defs::{IntoServiceError, Service},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    io::{self, Cursor, Seek, Write},
    path::{Component, Path, PathBuf},
};
use thiserror::Error as ThisError;
use wildmatch::WildMatch;
use zip::{result::ZipError, write::FileOptions, CompressionMethod, DateTime as ZipDateTime, ZipWriter};

#[derive(ThisError, Debug)]
pub enum ArchiveError {
    #[error("Service file not found: {0}")]
    ServiceFileNotFound(PathBuf),
    #[error("Failed to read service file: {0}")]
    ReadServiceFile(#[source] io::Error),
    #[error("Failed to parse service file: {0}")]
    ParseServiceFile(#[source] serde_yaml::Error),
    #[error("{0}")]
    NotAService(#[source] IntoServiceError),
    #[error("Failed to list source files: {0}")]
    ListSourceFiles(#[source] io::Error),
    #[error("Failed to read source file {path:?}: {error}")]
    ReadSourceFile {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("No files to pack (no include patterns matched and no embedded source)")]
    NothingToPack,
    #[error("Failed to build archive: {0}")]
    Zip(#[source] ZipError),
    #[error("Failed to write archive: {0}")]
    Write(#[source] io::Error),
    #[error("Failed to checksum archive: {0}")]
    Checksum(#[source] io::Error),
}

/// Embedded code zipped, base64 encoded and checksummed.
#[derive(Debug, PartialEq, Clone)]
pub struct PackagedLiteral {
    /// Base64 of the archive bytes
    pub payload: String,
    /// Hex SHA-256 of the archive bytes
    pub checksum: String,
}

/// Zips `code` as the only member `entry_filename`.
///
/// Same input, same bytes: entries carry a fixed timestamp and mode, so the
/// checksum is stable between runs.
pub fn package_literal(code: &str, entry_filename: &str) -> Result<PackagedLiteral, ArchiveError> {
    let bytes = write_zip(Cursor::new(Vec::new()), [(entry_filename, code.as_bytes())])?
        .into_inner();

    Ok(PackagedLiteral {
        payload: STANDARD.encode(&bytes),
        checksum: sha256_hex(&bytes),
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(ZipDateTime::default())
        .unix_permissions(0o644)
}

fn write_zip<W, N, B>(writer: W, entries: impl IntoIterator<Item = (N, B)>) -> Result<W, ArchiveError>
where
    W: Write + Seek,
    N: Into<String>,
    B: AsRef<[u8]>,
{
    let mut zip = ZipWriter::new(writer);

    for (name, content) in entries {
        zip.start_file(name, entry_options())
            .map_err(ArchiveError::Zip)?;
        zip.write_all(content.as_ref())
            .map_err(ArchiveError::Write)?;
    }

    zip.finish().map_err(ArchiveError::Zip)
}

pub fn load_service_file(path: &Path) -> Result<Service, ArchiveError> {
    if !path.is_file() {
        return Err(ArchiveError::ServiceFileNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(ArchiveError::ReadServiceFile)?;
    let document: serde_json::Value =
        serde_yaml::from_str(&content).map_err(ArchiveError::ParseServiceFile)?;

    Service::try_from(&document).map_err(ArchiveError::NotAService)
}

/// `<tmp>/<package>-<UTC timestamp>.zip`
pub fn default_archive_path(package_name: &str, now: DateTime<Utc>) -> PathBuf {
    std::env::temp_dir().join(format!(
        "{}-{}.zip",
        package_name,
        now.format("%Y%m%d%H%M%S")
    ))
}

#[derive(Debug, PartialEq, Clone)]
pub struct EmbeddedFile {
    pub name: String,
    pub content: String,
}

/// What goes into an on-disk package, decided before anything is written.
#[derive(Debug, PartialEq, Clone)]
pub struct PackPlan {
    pub source_dir: PathBuf,
    pub embedded: Vec<EmbeddedFile>,
    /// Paths relative to `source_dir`
    pub files: Vec<PathBuf>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct PackedEntry {
    pub name: String,
    pub embedded: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct PackedArchive {
    pub path: PathBuf,
    pub checksum: String,
    pub size: u64,
    pub entries: Vec<PackedEntry>,
}

impl PackPlan {
    /// Files are taken from `source_dir` when their relative path or bare
    /// name matches an include pattern. Embedded literal code always comes
    /// first and shadows a file of the same name on disk. An existing
    /// `buildcmd` file is added even when no pattern matches it.
    pub fn from_service(service: &Service, source_dir: &Path) -> Result<Self, ArchiveError> {
        let package = &service.spec.package;

        let embedded: Vec<EmbeddedFile> = package
            .source
            .as_ref()
            .and_then(|source| source.literal.as_deref())
            .filter(|code| !code.is_empty())
            .map(|code| EmbeddedFile {
                name: String::from(DEFAULT_ENTRY_FILENAME),
                content: code.to_string(),
            })
            .into_iter()
            .collect();

        let is_embedded = |name: &str| embedded.iter().any(|file| file.name == name);

        let patterns: Vec<WildMatch> = package
            .include
            .iter()
            .map(|pattern| WildMatch::new(pattern))
            .collect();

        let mut files = Vec::new();

        if !patterns.is_empty() {
            for relative in list_files(source_dir).map_err(ArchiveError::ListSourceFiles)? {
                let name = to_archive_name(&relative);
                if is_embedded(&name) {
                    tracing::debug!(file = %name, "Skipping file shadowed by embedded source");
                    continue;
                }

                let file_name = relative
                    .file_name()
                    .map(|file_name| file_name.to_string_lossy().into_owned())
                    .unwrap_or_default();

                if patterns
                    .iter()
                    .any(|pattern| pattern.matches(&name) || pattern.matches(&file_name))
                {
                    files.push(relative);
                }
            }
        }

        if let Some(buildcmd) = package.buildcmd.as_deref() {
            match to_relative_path(buildcmd) {
                Some(relative) => {
                    let name = to_archive_name(&relative);

                    if source_dir.join(&relative).is_file()
                        && !files.contains(&relative)
                        && !is_embedded(&name)
                    {
                        tracing::debug!(file = %name, "Including build command");
                        files.push(relative);
                    }
                }
                None => {
                    tracing::warn!(
                        %buildcmd,
                        "Build command is outside the source directory, not including it"
                    );
                }
            }
        }

        if files.is_empty() && embedded.is_empty() {
            return Err(ArchiveError::NothingToPack);
        }

        Ok(Self {
            source_dir: source_dir.to_path_buf(),
            embedded,
            files,
        })
    }

    pub fn entries(&self) -> Vec<PackedEntry> {
        let embedded = self.embedded.iter().map(|file| PackedEntry {
            name: file.name.clone(),
            embedded: true,
        });

        let files = self.files.iter().map(|relative| PackedEntry {
            name: to_archive_name(relative),
            embedded: false,
        });

        embedded.chain(files).collect()
    }

    /// Writes the archive (embedded entries first) and checksums the file
    /// as it ended up on disk.
    pub fn write_to(&self, output: &Path) -> Result<PackedArchive, ArchiveError> {
        let mut contents: Vec<(String, Vec<u8>)> = self
            .embedded
            .iter()
            .map(|file| (file.name.clone(), file.content.clone().into_bytes()))
            .collect();

        for relative in &self.files {
            let path = self.source_dir.join(relative);
            let content = fs::read(&path).map_err(|error| ArchiveError::ReadSourceFile {
                path: path.clone(),
                error,
            })?;
            contents.push((to_archive_name(relative), content));
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::Write)?;
        }

        let file = File::create(output).map_err(ArchiveError::Write)?;
        write_zip(file, contents)?;

        let mut file = File::open(output).map_err(ArchiveError::Checksum)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(ArchiveError::Checksum)?;
        let size = file
            .metadata()
            .map_err(ArchiveError::Checksum)?
            .len();

        Ok(PackedArchive {
            path: output.to_path_buf(),
            checksum: format!("{:x}", hasher.finalize()),
            size,
            entries: self.entries(),
        })
    }
}

/// Regular files below `root`, relative to it, sorted.
fn list_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            collect_files(root, &path, files)?;
        } else if path.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
    }

    Ok(())
}

/// `None` when `path` is absolute or climbs out with `..`.
fn to_relative_path(path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();

    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!relative.as_os_str().is_empty()).then_some(relative)
}

fn to_archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .join("/")
}
