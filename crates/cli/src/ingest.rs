use anyhow::Result;
use argo_rag::{
    config::AppConfig,
    ingest::{export_tables, load_records, write_records},
    providers::{db::sqlite::SqliteProvider, factory::build_ingestion_pipeline},
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// The SQLite database to read every table from
    #[arg(long, required = true)]
    source_db: String,
    /// Where to write the export. Defaults to `OUTPUT_DIR/argo_data.json`
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// The export to upload. Defaults to `OUTPUT_DIR/argo_data.json`
    #[arg(long)]
    source: Option<PathBuf>,
}

pub async fn handle_export(args: &ExportArgs, config: &AppConfig) -> Result<()> {
    let out = args.out.clone().unwrap_or_else(|| config.export_path());
    info!("Exporting '{}' to '{}'", args.source_db, out.display());

    let provider = SqliteProvider::new(&args.source_db).await?;
    let records = export_tables(&provider).await?;
    write_records(&out, &records).await?;

    println!("Exported {} rows to '{}'.", records.len(), out.display());
    Ok(())
}

pub async fn handle_upload(args: &UploadArgs, config: &AppConfig) -> Result<()> {
    let source = args.source.clone().unwrap_or_else(|| config.export_path());
    let records = load_records(&source).await?;
    println!("Loaded {} rows from '{}'.", records.len(), source.display());

    let pipeline = build_ingestion_pipeline(config).await?;
    let report = pipeline.upload_all(&records).await?;

    if report.resumed_from > 0 {
        println!("Resumed from chunk {}.", report.resumed_from);
    }
    println!(
        "Uploaded {} batch(es), {}/{} chunks stored.",
        report.batches_uploaded, report.next_index, report.total_chunks
    );

    match report.failure {
        Some(failure) => {
            println!(
                "Checkpoint kept at '{}'; run upload again to resume.",
                pipeline.checkpoint().path().display()
            );
            Err(failure.into_error().into())
        }
        None => Ok(()),
    }
}
