use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use docbridge::logging;
use docbridge::types::{ConversionKind, ConversionMode};
use docbridge::{Config, ConversionRequest, Converter};
use futures::future::join_all;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "docbridge",
    version,
    about = "Convert PDF and Word documents through a conversion server"
)]
struct Cli {
    /// Conversion server base URL (overrides DOCBRIDGE_SERVER_URL).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one or more files. Each file is converted independently.
    Convert {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Force a conversion instead of picking it from the file extension.
        #[arg(long)]
        kind: Option<ConversionKind>,

        /// Directory for converted files (defaults to next to the source).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Do not request accurate layout for Word documents.
        #[arg(long)]
        standard: bool,
    },
    /// Follow the progress stream of a job that is already queued.
    Track { job_id: String },
}

fn build_requests(
    files: Vec<PathBuf>,
    kind: Option<ConversionKind>,
    output_dir: Option<PathBuf>,
    standard: bool,
) -> (Vec<ConversionRequest>, usize) {
    let mode = if standard {
        ConversionMode::Standard
    } else {
        ConversionMode::Accurate
    };
    let mut rejected = 0;
    let mut requests = Vec::with_capacity(files.len());

    for file in files {
        let request = match kind {
            Some(kind) => Ok(ConversionRequest::new(file, kind)),
            None => ConversionRequest::detect(file),
        };
        match request {
            Ok(request) => requests.push(
                request
                    .with_mode(mode)
                    .with_output_dir(output_dir.clone()),
            ),
            Err(error) => {
                eprintln!("error: {error}");
                rejected += 1;
            }
        }
    }

    (requests, rejected)
}

async fn run_convert(converter: &Converter, requests: Vec<ConversionRequest>) -> usize {
    let results = join_all(requests.iter().map(|request| async move {
        let label = request.display_name();
        let mut sink = |status: &str| println!("[{label}] {status}");
        let result = converter.convert_file(request, &mut sink).await;
        (label, result)
    }))
    .await;

    let mut failed = 0;
    for (label, result) in results {
        match result {
            Ok(outcome) => println!(
                "[{label}] done: {} ({} bytes)",
                outcome.output.display(),
                outcome.bytes_written
            ),
            Err(error) => {
                eprintln!("[{label}] error: {error}");
                failed += 1;
            }
        }
    }
    failed
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing()?;

    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config = config.with_server_url(server);
    }
    config.validate()?;
    let converter = Converter::new(&config)?;

    match cli.command {
        Command::Convert {
            files,
            kind,
            output_dir,
            standard,
        } => {
            let total = files.len();
            let (requests, rejected) = build_requests(files, kind, output_dir, standard);
            let failed = rejected + run_convert(&converter, requests).await;
            if failed > 0 {
                bail!("{failed} of {total} conversions failed");
            }
        }
        Command::Track { job_id } => {
            let mut sink = |status: &str| println!("{status}");
            converter.tracker().track(&job_id, &mut sink).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_requests_detects_kinds_and_counts_rejections() {
        let files = vec![
            PathBuf::from("a.pdf"),
            PathBuf::from("b.docx"),
            PathBuf::from("c.png"),
        ];
        let (requests, rejected) = build_requests(files, None, Some(PathBuf::from("out")), true);

        assert_eq!(rejected, 1);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].kind, ConversionKind::PdfToWord);
        assert_eq!(requests[1].kind, ConversionKind::WordToPdf);
        assert_eq!(requests[1].mode, ConversionMode::Standard);
        assert_eq!(requests[1].output_path(), PathBuf::from("out/b.pdf"));
    }

    #[test]
    fn test_convert_parses_forced_kind() {
        let cli = Cli::try_parse_from([
            "docbridge",
            "--server",
            "http://127.0.0.1:5000",
            "convert",
            "--kind",
            "word-to-pdf",
            "memo.docx",
        ])
        .expect("valid arguments");
        assert_eq!(cli.server.as_deref(), Some("http://127.0.0.1:5000"));
        match cli.command {
            Command::Convert { kind, files, .. } => {
                assert_eq!(kind, Some(ConversionKind::WordToPdf));
                assert_eq!(files, vec![PathBuf::from("memo.docx")]);
            }
            Command::Track { .. } => panic!("expected convert"),
        }
    }
}
