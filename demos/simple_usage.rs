//! Alertdex API Demo
//!
//! Demonstrates the main store operations:
//! - Loading a retention window from an NDJSON alert log
//! - Filtered listing and pagination
//! - Full-text search over dotted field paths
//! - Aggregate metrics (severity, agents, timeline)
//! - Cache statistics

use std::io::Write;

use alertdex::core::config::Config;
use alertdex::query::filter::FilterParams;
use alertdex::store::store::AlertStore;
use chrono::{Duration, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔═══════════════════════════════════════════════╗");
    println!("║        Alertdex - Alert Store Demo            ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    // Step 1: Write a small demo log
    println!("Step 1: Writing demo alert log...");
    let mut file = tempfile::NamedTempFile::new()?;
    let now = Utc::now();
    for (i, (agent, rule, level, desc)) in [
        ("001", "5710", 5, "sshd: Attempt to login using a non-existent user"),
        ("001", "5712", 10, "sshd: brute force trying to get access"),
        ("002", "31101", 3, "Web server 400 error code"),
        ("002", "31151", 12, "Multiple web server 400 error codes"),
    ]
    .iter()
    .enumerate()
    {
        let ts = (now - Duration::minutes(30 - i as i64 * 5)).format("%Y-%m-%dT%H:%M:%SZ");
        writeln!(
            file,
            r#"{{"timestamp":"{ts}","agent":{{"id":"{agent}","name":"host-{agent}"}},"rule":{{"id":"{rule}","level":{level},"description":"{desc}","groups":["syslog"]}}}}"#
        )?;
    }
    file.flush()?;
    println!("Done!\n");

    // Step 2: Load the last 24 hours
    println!("Step 2: Loading alerts...");
    let config = Config {
        alerts_path: file.path().to_path_buf(),
        ..Default::default()
    };
    let store = AlertStore::new(&config)?;
    let loaded = store.load(config.load_window())?;
    println!("  Loaded {loaded} alerts\n");

    // Step 3: List newest-first
    println!("Step 3: LIST - newest first...");
    let (alerts, total) = store.list(None, 10, 0);
    for alert in &alerts {
        println!(
            "  [{}] level {:2}  {}",
            alert.source.name, alert.classification.level, alert.classification.description
        );
    }
    println!("  ({total} total)\n");

    // Step 4: Filtered listing
    println!("Step 4: FILTER - severity >= 10...");
    let filters = FilterParams {
        severity_min: Some(10),
        ..Default::default()
    };
    let (high, _) = store.list(Some(&filters), 10, 0);
    println!("  {} high-severity alerts\n", high.len());

    // Step 5: Search
    println!("Step 5: SEARCH - 'brute' in rule descriptions...");
    let fields = vec!["classification.description".to_string()];
    let (hits, _) = store.search("brute", &fields, None, 10, 0);
    for alert in &hits {
        println!("  {}", alert.classification.description);
    }
    println!();

    // Step 6: Metrics
    println!("Step 6: METRICS...");
    let severity = store.severity_distribution(None, None);
    println!(
        "  severity: low={} medium={} high={} critical={}",
        severity.low, severity.medium, severity.high, severity.critical
    );
    for metric in store.agent_metrics(None, None, 3) {
        println!("  agent {}: {} alerts", metric.agent_name, metric.alert_count);
    }
    println!("  timeline buckets: {}", store.timeline(None, None, "5m").len());

    let stats = store.cache_stats();
    println!(
        "  cache: {}/{} entries, hit rate {:.1}%\n",
        stats.size,
        stats.capacity,
        stats.hit_rate() * 100.0
    );

    Ok(())
}
