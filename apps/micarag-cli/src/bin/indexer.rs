use clap::Parser;
use std::path::PathBuf;

use micarag_cli::indexer::{index_records, progress_bar};
use micarag_cli::{init_tracing, load_settings};
use micarag_core::records::load_chunk_records;
use micarag_embed::get_default_embedder;
use micarag_vector::LanceWriter;

/// Embed chunk records from JSONL files and upsert them into the index.
#[derive(Parser, Debug)]
#[command(name = "micarag-indexer", version)]
struct Cli {
    /// Directory of `*.jsonl` chunk files; defaults to `processed_dir`.
    data_dir: Option<PathBuf>,

    /// Override the embedding batch size.
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let settings = load_settings()?;

    let data_dir = cli.data_dir.unwrap_or_else(|| settings.processed_path());
    let batch_size = cli.batch_size.unwrap_or(settings.index_batch_size);
    let records = load_chunk_records(&data_dir)?;
    if records.is_empty() {
        println!("No chunk records found in {}", data_dir.display());
        return Ok(());
    }

    let embedder = get_default_embedder(&settings)?;
    let writer = LanceWriter::open(&settings.index_location(), &settings.collection_name).await?;
    println!(
        "Indexing {} chunks from {} into '{}' (dim={})",
        records.len(),
        data_dir.display(),
        settings.collection_name,
        embedder.dim()
    );

    let pb = progress_bar(records.len());
    let stats = index_records(embedder, &writer, &records, batch_size, &pb).await?;
    pb.finish_with_message("done");

    println!("Indexed {} chunks, skipped {}", stats.indexed, stats.skipped);
    println!("Collection '{}' now holds {} chunks", settings.collection_name, writer.count().await?);
    Ok(())
}
