use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use drainq::Driver;

const DEFAULT_ORDERS: &[&str] = &["pizza", "samosa", "pasta", "biryani", "burger"];

#[derive(Debug, FromArgs)]
/// Place orders on one thread and serve them on another
#[argh(help_triggers("--help"))]
struct Args {
    /// an order to place, may be repeated (defaults to five sample orders)
    #[argh(option, long = "item", arg_name = "str")]
    items: Vec<String>,
    /// milliseconds between two placed orders
    #[argh(option, default = "500", arg_name = "ms")]
    produce_delay: u64,
    /// milliseconds spent serving each order
    #[argh(option, default = "2000", arg_name = "ms")]
    consume_delay: u64,
    /// milliseconds before the first order is served
    #[argh(option, default = "1000", arg_name = "ms")]
    start_delay: u64,
    /// give up if no order arrives within this many milliseconds
    #[argh(option, arg_name = "ms")]
    timeout: Option<u64>,
    /// hold at most this many pending orders
    #[argh(option, arg_name = "int")]
    capacity: Option<NonZeroUsize>,
}

pub fn main() -> Result<()> {
    let args = argh::from_env::<Args>();
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .without_time()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let orders = if args.items.is_empty() {
        DEFAULT_ORDERS.iter().map(|&s| s.to_owned()).collect()
    } else {
        args.items
    };
    tracing::info!("placing orders, count={}", orders.len());

    let summary = Driver::new()
        .produce_delay(Duration::from_millis(args.produce_delay))
        .consume_delay(Duration::from_millis(args.consume_delay))
        .consume_start_delay(Duration::from_millis(args.start_delay))
        .dequeue_timeout(args.timeout.map(Duration::from_millis))
        .capacity(args.capacity)
        .run(orders, drop)
        .context("failed to process orders")?;

    tracing::info!(
        "all orders processed, placed={}, served={}",
        summary.produced,
        summary.consumed
    );
    Ok(())
}
