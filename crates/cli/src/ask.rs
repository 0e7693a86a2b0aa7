use anyhow::Result;
use argo_rag::{
    config::AppConfig,
    providers::factory::{build_prompt_client, build_rag_engine},
    RagQueryEngine,
};
use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question. Omit it to start an interactive session
    question: Option<String>,
    /// How many chunks to retrieve. Defaults to `TOP_K`
    #[arg(long)]
    top_k: Option<usize>,
    /// Print the retrieved chunks after the answer
    #[arg(long)]
    show_sources: bool,
}

#[derive(Parser, Debug)]
pub struct SqlArgs {
    /// The question to answer from the observation table
    #[arg(required = true)]
    question: String,
    /// Print the generated SQL and the raw result
    #[arg(long)]
    show_sql: bool,
}

pub async fn handle_ask(args: &AskArgs, config: &AppConfig) -> Result<()> {
    let top_k = args.top_k.filter(|k| *k > 0).unwrap_or(config.top_k);
    let engine = build_rag_engine(config).await?;

    match &args.question {
        Some(question) => ask_once(&engine, question, top_k, args.show_sources).await,
        None => interactive(&engine, top_k, args.show_sources).await,
    }
}

async fn ask_once(
    engine: &RagQueryEngine,
    question: &str,
    top_k: usize,
    show_sources: bool,
) -> Result<()> {
    let answer = engine.answer(question, top_k).await?;
    println!("{}", answer.text());
    if show_sources {
        for source in answer.sources() {
            println!("--- {} (distance {:.4})\n{}", source.id, source.distance, source.content);
        }
    }
    Ok(())
}

async fn interactive(engine: &RagQueryEngine, top_k: usize, show_sources: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nAsk a question (or type 'exit'): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        // One bad question should not end the session.
        if let Err(e) = ask_once(engine, question, top_k, show_sources).await {
            eprintln!("Ask failed: {e:#}");
        }
    }
    Ok(())
}

pub async fn handle_sql(args: &SqlArgs, config: &AppConfig) -> Result<()> {
    let client = build_prompt_client(config).await?;
    let result = client.answer(&args.question).await?;

    if args.show_sql {
        println!("SQL: {}", result.generated_sql);
        println!("Result: {}", result.database_result);
    }
    println!("{}", result.text);
    Ok(())
}
