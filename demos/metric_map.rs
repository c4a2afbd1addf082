use chrono::Utc;
use promql_client::Prometheus;

#[tokio::main]
async fn main() -> promql_client::Result<()> {
    let mut args = std::env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| "http://localhost:9090".to_string());
    let promql = args.next().unwrap_or_else(|| "up".to_string());

    let prom = Prometheus::new(base_url);

    println!("instant: {promql}");
    let instant = prom.query(&promql).await?.to_metric_map()?;
    for (labels, series) in &instant {
        if let Some(point) = series.latest() {
            println!(
                "  {}{labels} => {} @ {}",
                labels.metric_name().unwrap_or(""),
                point.value,
                point.timestamp
            );
        }
    }

    let end = Utc::now();
    let start = end - chrono::Duration::minutes(5);
    println!("range: {promql} over the last 5m");
    let ranged = prom.query_range(&promql, start, end, "30s").await?.to_metric_map()?;
    for (labels, series) in &ranged {
        println!(
            "  {}{labels}: {} points, avg {:?}",
            labels.metric_name().unwrap_or(""),
            series.len(),
            series.average()
        );
    }

    Ok(())
}
