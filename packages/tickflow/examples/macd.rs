use tickflow::indicator::{macd, MacdParams};
use tickflow::{feed, ProcessorExt, Series, Tick};
use tokio_util::sync::CancellationToken;

// The same MACD pipeline, once over a finished series and once as a stream.

#[tokio::main(flavor = "current_thread")]
async fn main() -> tickflow::Result<()> {
    let series: Series = (0..200)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 3.0;
            Tick::new(i * 60_000, 60_000).with_field("close", close)
        })
        .collect();

    let mut pipeline = macd("macd", &MacdParams::default())?;
    let batch = pipeline.batch(&series)?;

    let cancel = CancellationToken::new();
    let rx = feed(series.iter().cloned().collect::<Vec<_>>(), 32, cancel.clone());
    let (streamed, _pipeline) = pipeline.stream(cancel, rx).collect("macd").await?;

    let last = batch.last("macd_hist").unwrap_or_default();
    println!("ticks={} macd_hist_last={last:.6}", batch.len());
    println!("stream_matches_batch={}", batch.as_slice() == streamed.as_slice());
    Ok(())
}
