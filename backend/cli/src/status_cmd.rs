//! CLI Status Command
//!
//! Reports health and registry counts of a running relay.

use anyhow::Result;

pub async fn run(base_url: &str) -> Result<()> {
    let base = base_url.trim_end_matches('/');
    let client = reqwest::Client::new();

    let health = match client.get(format!("{base}/api/health")).send().await {
        Ok(resp) => resp.error_for_status()?.json::<serde_json::Value>().await?,
        Err(_) => {
            println!("Relay is not reachable at {base}");
            return Ok(());
        }
    };
    let stats: serde_json::Value = client
        .get(format!("{base}/api/stats"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    println!("Relay status at {base}\n");
    println!("  status:      {}", health["status"].as_str().unwrap_or("unknown"));
    println!("  uptime:      {}s", health["uptimeSeconds"]);
    println!("  channels:    {}", stats["channels"]);
    println!("  connections: {}", stats["connections"]);
    Ok(())
}
