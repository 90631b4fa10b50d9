use clap::Parser;
use micarag_cli::{init_tracing, load_settings};
use micarag_pipeline::RagPipeline;

/// Ask one question against the indexed whitepapers and MiCA.
#[derive(Parser, Debug)]
#[command(name = "micarag-query", version)]
struct Cli {
    /// The question, e.g. "Cos'è un e-money token?"
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,

    /// Print the raw result as JSON.
    #[arg(long)]
    json: bool,

    /// Override the number of retrieved candidates.
    #[arg(long)]
    top_k: Option<usize>,

    /// Override the number of chunks passed to the generator.
    #[arg(long)]
    top_n: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = load_settings()?;
    if let Some(k) = cli.top_k {
        settings.top_k = k;
    }
    if let Some(n) = cli.top_n {
        settings.top_n = n;
    }
    let pipeline = RagPipeline::from_settings(&settings).await?;

    let question = cli.question.join(" ");
    let result = pipeline.answer(&question).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!("\nFonti:");
        for s in &result.sources {
            let title = s.title.as_deref().unwrap_or("?");
            match s.chunk_id {
                Some(id) => println!("• {title} (chunk {id})"),
                None => println!("• {title}"),
            }
        }
    }
    Ok(())
}
