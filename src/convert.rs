use crate::api::client::{ConvertClient, Submission};
use crate::config::Config;
use crate::error::ConvertError;
use crate::progress::{ProgressTracker, StatusSink};
use crate::types::{ConversionKind, ConversionMode, JobId};
use std::path::{Path, PathBuf};
use tracing::info;

/// One file to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub kind: ConversionKind,
    pub mode: ConversionMode,
    /// Exact output file; wins over `output_dir`.
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, kind: ConversionKind) -> Self {
        Self {
            source: source.into(),
            kind,
            mode: ConversionMode::default(),
            output: None,
            output_dir: None,
        }
    }

    /// Builds a request whose kind follows the source extension.
    pub fn detect(source: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let source = source.into();
        match ConversionKind::detect(&source) {
            Some(kind) => Ok(Self::new(source, kind)),
            None => Err(ConvertError::UnsupportedFile {
                path: source,
                expected: "PDF or Word",
            }),
        }
    }

    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => self
                .kind
                .output_path(&self.source, self.output_dir.as_deref()),
        }
    }

    pub fn display_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub output: PathBuf,
    pub bytes_written: u64,
    /// Set when the service converted in the background.
    pub job_id: Option<JobId>,
}

/// Upload flow: validate, submit, follow progress when queued, save the result.
#[derive(Clone)]
pub struct Converter {
    client: ConvertClient,
    tracker: ProgressTracker<ConvertClient>,
    max_upload_bytes: u64,
}

impl Converter {
    pub fn new(config: &Config) -> Result<Self, ConvertError> {
        let client = ConvertClient::new(config)?;
        let tracker = ProgressTracker::new(client.clone(), config.progress_settings());
        Ok(Self {
            client,
            tracker,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn tracker(&self) -> &ProgressTracker<ConvertClient> {
        &self.tracker
    }

    /// Checks type and size before anything is uploaded. Returns the size.
    pub async fn validate(&self, request: &ConversionRequest) -> Result<u64, ConvertError> {
        check_source(&request.source, request.kind, self.max_upload_bytes).await
    }

    pub async fn convert_file<K>(
        &self,
        request: &ConversionRequest,
        sink: &mut K,
    ) -> Result<ConversionOutcome, ConvertError>
    where
        K: StatusSink + ?Sized,
    {
        self.validate(request).await?;

        sink.on_status(&format!("submitting {}", request.display_name()));
        let submission = self
            .client
            .submit(request.kind, &request.source, request.mode)
            .await?;

        let (bytes, job_id) = match submission {
            Submission::Converted { bytes } => (bytes, None),
            Submission::Queued { job_id } => {
                self.tracker.track(job_id.as_str(), sink).await?;
                let bytes = self.client.download(&job_id).await?;
                (bytes, Some(job_id))
            }
        };

        let output = request.output_path();
        write_output(&output, &bytes).await?;
        info!(
            source = %request.source.display(),
            output = %output.display(),
            bytes = bytes.len(),
            "conversion saved"
        );
        sink.on_status(&format!("saved {}", output.display()));

        Ok(ConversionOutcome {
            output,
            bytes_written: bytes.len() as u64,
            job_id,
        })
    }
}

async fn check_source(path: &Path, kind: ConversionKind, limit: u64) -> Result<u64, ConvertError> {
    if !kind.accepts(path) {
        return Err(ConvertError::UnsupportedFile {
            path: path.to_path_buf(),
            expected: kind.source_label(),
        });
    }

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|error| ConvertError::io(format!("cannot read {}", path.display()), error))?;
    if !metadata.is_file() {
        return Err(ConvertError::io(
            format!("cannot read {}", path.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let size = metadata.len();
    if size > limit {
        return Err(ConvertError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }

    Ok(size)
}

async fn write_output(path: &Path, contents: &[u8]) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| ConvertError::io(format!("cannot create {}", parent.display()), error))?;
    }

    tokio::fs::write(path, contents)
        .await
        .map_err(|error| ConvertError::io(format!("cannot write {}", path.display()), error))
}
