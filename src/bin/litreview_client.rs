use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use litreview::client::{
    HttpTransport, PaperAnalysis, ReviewSession, SessionState, collect_pdf_files,
};
use litreview::logging;
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Parser)]
#[command(
    name = "litreview-client",
    about = "Analyze research papers against a topic, one file at a time"
)]
struct Cli {
    /// Research topic the papers are judged against.
    #[arg(long)]
    topic: String,
    /// Base URL of the analysis server.
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,
    /// Also write the results as JSON to this file.
    #[arg(long)]
    output: Option<PathBuf>,
    /// PDF files or directories containing them.
    paths: Vec<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    topic: &'a str,
    time: String,
    papers: &'a [PaperAnalysis],
}

#[tokio::main]
async fn main() {
    logging::init_cli_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let files = collect_pdf_files(&cli.paths).context("failed to collect PDF files")?;
    let transport = HttpTransport::new(&cli.server).context("failed to build HTTP client")?;
    let mut session = ReviewSession::new(transport, cli.topic.clone(), files);

    let state = session
        .submit(|state| {
            if let SessionState::Uploading { index, total } = state {
                eprintln!("Analyzing paper {}/{}...", index + 1, total);
            }
        })
        .await;

    for notification in session.notifications() {
        eprintln!("{notification}");
    }
    if state != SessionState::Done {
        bail!("analysis did not complete");
    }

    let mut stdout = io::stdout().lock();
    for paper in session.results() {
        write_card(&mut stdout, paper)?;
    }

    if let Some(path) = cli.output {
        let report = Report {
            topic: &cli.topic,
            time: OffsetDateTime::now_utc().format(&Rfc3339)?,
            papers: session.results(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn write_card(out: &mut impl Write, paper: &PaperAnalysis) -> io::Result<()> {
    let analysis = &paper.analysis;
    writeln!(out, "== {} ==", paper.file_name)?;
    for (label, value) in [
        ("Aim", &analysis.aim),
        ("Methodology", &analysis.methodology),
        ("Results", &analysis.results),
        ("Scope", &analysis.scope),
        ("Relevance", &analysis.relevance),
    ] {
        writeln!(out, "{label}: {value}")?;
    }
    writeln!(out)
}
