// Dump stored servers and a recent metrics window as JSON.
//
// Usage: cargo run --example dump_metrics -- [DB_PATH] [WINDOW]
//   DB_PATH  default: ./data/metrics.db
//   WINDOW   default: 20m (e.g. 90s, 1h30m, 7d)

use chrono::Utc;
use hostwatch::routes::parse_window;
use hostwatch::store::MetricsStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/metrics.db");
    let raw_window = args.get(2).map(String::as_str).unwrap_or("20m");
    let window = parse_window(raw_window)
        .ok_or_else(|| anyhow::anyhow!("invalid window {:?}", raw_window))?;
    let since = Utc::now() - chrono::Duration::from_std(window)?;

    let store = MetricsStore::connect(path, 1).await?;
    for server in store.list_servers().await? {
        let history = store.range(&server.id, since).await?;
        let dump = serde_json::json!({
            "server": server,
            "samples": history.len(),
            "history": history,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
    }
    Ok(())
}
