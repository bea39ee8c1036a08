use std::collections::HashSet;

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    #[arg(long, default_value_t = 100)]
    requests: usize,

    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    #[arg(long, default_value_t = 3000.0)]
    amount: f64,

    /// Draw this many winners once issuing is done.
    #[arg(long)]
    winners: Option<u32>,
}

#[derive(Deserialize)]
struct Numbers {
    numbers: Vec<u32>,
}

#[derive(Deserialize)]
struct Winners {
    ganadores: Vec<u32>,
}

async fn issue_worker(
    client: Client,
    url: String,
    amount: f64,
    requests: usize,
    pb: ProgressBar,
) -> Result<Vec<u32>> {
    let mut issued = Vec::new();

    for _ in 0..requests {
        let response = client
            .post(format!("{url}/api/generate-number"))
            .json(&json!({ "monto": amount }))
            .send()
            .await?
            .error_for_status()?;

        issued.extend(response.json::<Numbers>().await?.numbers);
        pb.inc(1);
    }

    Ok(issued)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::new();

    let pb = ProgressBar::new(args.requests as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );
    pb.set_message("Issuing");

    let concurrency = args.concurrency.max(1);
    let mut workers = JoinSet::new();

    for worker in 0..concurrency {
        let share = args.requests / concurrency + usize::from(worker < args.requests % concurrency);

        workers.spawn(issue_worker(
            client.clone(),
            args.url.clone(),
            args.amount,
            share,
            pb.clone(),
        ));
    }

    let mut issued = Vec::new();
    while let Some(result) = workers.join_next().await {
        issued.extend(result??);
    }

    pb.finish_with_message("Done");

    let unique: HashSet<u32> = issued.iter().copied().collect();
    println!("Issued Numbers: {}", issued.len());
    println!("Unique Numbers: {}\n", unique.len());

    if unique.len() != issued.len() {
        bail!("Server handed out {} duplicate numbers", issued.len() - unique.len());
    }

    let pool = client
        .get(format!("{}/api/numbers", args.url))
        .send()
        .await?
        .error_for_status()?
        .json::<Numbers>()
        .await?
        .numbers;

    let pool_set: HashSet<u32> = pool.iter().copied().collect();
    println!("Pool Size: {}", pool.len());

    if pool_set.len() != pool.len() {
        bail!("Pool contains duplicate numbers");
    }

    if let Some(missing) = unique.iter().find(|n| !pool_set.contains(n)) {
        bail!("Issued number {missing} is missing from the pool");
    }

    if let Some(winners) = args.winners {
        let response = client
            .post(format!("{}/api/realizar-sorteo", args.url))
            .json(&json!({ "cantidadGanadores": winners }))
            .send()
            .await?
            .error_for_status()?
            .json::<Winners>()
            .await?;

        println!("Winners: {:?}", response.ganadores);
    }

    Ok(())
}
