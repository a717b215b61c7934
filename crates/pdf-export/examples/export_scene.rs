//! Export a JSON scene document to PDF
//! Run with: cargo run --example export_scene -- <document.json> <output.pdf> [config.json]
//!
//! Set RUST_LOG=debug to see every object as it is written.

use std::env;
use std::fs;

use pdf_export::{ExportConfig, ExportJob, ExportStatus, Exporter};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <document.json> <output.pdf> [config.json]", args[0]);
        std::process::exit(2);
    }

    let document = scene::load_document(&args[1])?;
    let mut config = match args.get(3) {
        Some(path) => ExportConfig::from_json(&fs::read_to_string(path)?)?,
        None => ExportConfig::default(),
    };
    config.filename = Some(args[2].clone().into());

    println!(
        "Exporting \"{}\": {} pages, {} spreads",
        document.name,
        document.pages.len(),
        document.num_spreads()
    );
    let report = Exporter::new(config).run(&ExportJob::document(&document))?;

    for message in report.log.messages() {
        println!(
            "  {:?} (object {}): {}",
            message.severity, message.object_id, message.message
        );
    }
    for file in &report.files {
        println!("Wrote {}", file.display());
    }
    if report.status == ExportStatus::PartialSuccess {
        println!("Finished with {} warnings", report.log.len());
    }
    Ok(())
}
