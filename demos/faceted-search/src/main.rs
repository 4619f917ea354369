//! # Faceted Search Demo
//!
//! Runs one disjunctive faceted search and prints the aggregated result as
//! JSON. Credentials come from the environment:
//!
//! ```bash
//! export SEARCHLANE_APP_ID=APP
//! export SEARCHLANE_API_KEY=key
//! # optional, comma separated
//! export SEARCHLANE_HOSTS=http://127.0.0.1:7700
//!
//! faceted-search -i hotels -q paris -d stars -d facilities \
//!     -r stars='****' -r stars='*****' -r city=Paris -f city
//! ```
//!
//! Set `RUST_LOG=debug` to see every host attempt.

use anyhow::{bail, Context, Result};
use argh::FromArgs;
use searchlane_client::{CancellationToken, ClientConfig, Refinements, SearchClient, WaitOptions};
use searchlane_common::SearchQuery;

#[derive(FromArgs)]
/// Run a disjunctive faceted search against a Searchlane application
struct Args {
    /// index to search
    #[argh(option, short = 'i')]
    index: String,

    /// full-text query
    #[argh(option, short = 'q', default = "String::new()")]
    query: String,

    /// facet whose selected values are OR-ed together (repeatable)
    #[argh(option, short = 'd')]
    disjunctive: Vec<String>,

    /// refinement as facet=value (repeatable)
    #[argh(option, short = 'r')]
    refine: Vec<String>,

    /// regular facet to count on the hits (repeatable)
    #[argh(option, short = 'f')]
    facet: Vec<String>,

    /// number of hits to return
    #[argh(option, default = "20")]
    hits_per_page: u32,

    /// wait for this task of the index to be published before searching
    #[argh(option)]
    wait_task: Option<u64>,

    /// print the client metrics to stderr when done
    #[argh(switch)]
    metrics: bool,
}

/// Parses `facet=value` pairs, grouping values by facet in input order.
fn parse_refinements(pairs: &[String]) -> Result<Refinements> {
    let mut refinements = Refinements::new();
    for pair in pairs {
        let Some((facet, value)) = pair.split_once('=') else {
            bail!("Invalid refinement '{}': expected facet=value", pair);
        };
        if facet.trim().is_empty() {
            bail!("Invalid refinement '{}': facet name is empty", pair);
        }
        refinements
            .entry(facet.trim().to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(refinements)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let refinements = parse_refinements(&args.refine)?;
    let config = ClientConfig::from_env().context("Failed to read client configuration")?;
    let client = SearchClient::new(config).context("Failed to create client")?;
    let index = client.index(args.index.as_str());

    if let Some(task_id) = args.wait_task {
        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        tracing::info!("Waiting for task {} on {}", task_id, index.name());
        index
            .wait_task(task_id, &WaitOptions::default(), Some(&cancel))
            .await
            .with_context(|| format!("Task {} did not complete", task_id))?;
    }

    let mut query = SearchQuery::new(args.query).with_hits_per_page(args.hits_per_page);
    if !args.facet.is_empty() {
        query = query.with_facets(args.facet);
    }

    let result = index
        .search_disjunctive_faceting(&query, args.disjunctive, &refinements)
        .await
        .context("Search failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.metrics {
        eprintln!("{}", serde_json::to_string_pretty(&client.metrics())?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refinements_groups_by_facet() {
        let pairs = vec![
            "stars=****".to_string(),
            "city=Paris".to_string(),
            "stars=*****".to_string(),
            "note=a=b".to_string(),
        ];
        let refinements = parse_refinements(&pairs).unwrap();
        assert_eq!(refinements["stars"], vec!["****", "*****"]);
        assert_eq!(refinements["city"], vec!["Paris"]);
        assert_eq!(refinements["note"], vec!["a=b"]);
    }

    #[test]
    fn test_parse_refinements_rejects_malformed() {
        assert!(parse_refinements(&["stars".to_string()]).is_err());
        assert!(parse_refinements(&[" =x".to_string()]).is_err());
    }
}
