use crate::util::lowercase_extension;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOC_MIME: &str = "application/msword";
const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    PdfToWord,
    WordToPdf,
}

impl ConversionKind {
    /// Path segment under `/convert/`.
    pub fn route(self) -> &'static str {
        match self {
            Self::PdfToWord => "pdf-to-word",
            Self::WordToPdf => "word-to-pdf",
        }
    }

    pub fn source_label(self) -> &'static str {
        match self {
            Self::PdfToWord => "PDF",
            Self::WordToPdf => "Word",
        }
    }

    pub fn output_extension(self) -> &'static str {
        match self {
            Self::PdfToWord => "docx",
            Self::WordToPdf => "pdf",
        }
    }

    pub fn accepts(self, path: &Path) -> bool {
        matches!(
            (self, lowercase_extension(path).as_deref()),
            (Self::PdfToWord, Some("pdf")) | (Self::WordToPdf, Some("doc" | "docx"))
        )
    }

    /// Picks the conversion from the source file's extension.
    pub fn detect(path: &Path) -> Option<Self> {
        [Self::PdfToWord, Self::WordToPdf]
            .into_iter()
            .find(|kind| kind.accepts(path))
    }

    /// `report.pdf` becomes `report.docx`, `memo.doc`/`memo.docx` becomes `memo.pdf`.
    pub fn output_path(self, source: &Path, output_dir: Option<&Path>) -> PathBuf {
        let file_name = source
            .with_extension(self.output_extension())
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("converted.{}", self.output_extension())));

        match output_dir {
            Some(dir) => dir.join(file_name),
            None => source.with_extension(self.output_extension()),
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

impl FromStr for ConversionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf-to-word" => Ok(Self::PdfToWord),
            "word-to-pdf" => Ok(Self::WordToPdf),
            other => Err(format!(
                "unknown conversion '{other}': expected pdf-to-word or word-to-pdf"
            )),
        }
    }
}

/// Layout fidelity requested for word-to-pdf conversions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    #[default]
    Accurate,
    Standard,
}

impl ConversionMode {
    /// Value of the multipart `mode` field, if one is sent at all.
    pub fn form_value(self) -> Option<&'static str> {
        match self {
            Self::Accurate => Some("accurate"),
            Self::Standard => None,
        }
    }
}

pub fn source_mime(path: &Path) -> &'static str {
    match lowercase_extension(path).as_deref() {
        Some("pdf") => PDF_MIME,
        Some("docx") => DOCX_MIME,
        Some("doc") => DOC_MIME,
        _ => "application/octet-stream",
    }
}
