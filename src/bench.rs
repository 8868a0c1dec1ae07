//! `fanout bench`: run every strategy over the same inputs and compare.

use fanout_core::{run, CancelToken, Message, RunStats, StopWatch, Strategy};

use crate::Knobs;

struct BenchRow {
    strategy: Strategy,
    wall_ms: u64,
    stats: RunStats,
    messages: Vec<Message>,
}

pub(crate) fn cmd_bench(knobs: &Knobs) -> Result<(), String> {
    let service = knobs.service();
    let mut rows: Vec<BenchRow> = Vec::with_capacity(Strategy::ALL.len());

    for strategy in Strategy::ALL {
        if !knobs.json && !knobs.quiet {
            fanout_core::log(&format!(
                "bench: {} x{} starting",
                strategy.as_str(),
                knobs.count
            ));
        }

        let cancel = CancelToken::new();
        let mut watch = StopWatch::new();
        watch.start();
        let messages = run(
            strategy,
            &service,
            knobs.count,
            knobs.policy(),
            knobs.timeout,
            knobs.workers,
            &cancel,
        )
        .map_err(|e| format!("{} failed: {}", strategy.as_str(), e))?;
        watch.stop();

        let wall_ms = watch.elapsed_ms();
        rows.push(BenchRow {
            strategy,
            wall_ms,
            stats: RunStats::from_run(&messages, wall_ms),
            messages,
        });
    }

    // Same service, same ids: after the delay sort every strategy must
    // produce the same sequence.
    let identical = rows.windows(2).all(|w| w[0].messages == w[1].messages);
    if !identical {
        return Err("strategies returned different result sets".to_string());
    }

    if knobs.json {
        let runs: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "strategy": row.strategy.as_str(),
                    "wallMs": row.wall_ms,
                    "stats": row.stats,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "count": knobs.count,
                "identical": identical,
                "runs": runs,
            })
        );
        return Ok(());
    }

    print_table(knobs.count, &rows);
    Ok(())
}

fn print_table(count: u32, rows: &[BenchRow]) {
    let sequential_ms = rows
        .iter()
        .find(|r| r.strategy == Strategy::Sequential)
        .map(|r| r.wall_ms)
        .unwrap_or(0);

    println!("strategy    count  wall_ms  speedup");
    for row in rows {
        let speedup = if row.wall_ms > 0 {
            sequential_ms as f64 / row.wall_ms as f64
        } else {
            0.0
        };
        println!(
            "{:<11} {:>5} {:>8} {:>7.2}x",
            row.strategy.as_str(),
            count,
            row.wall_ms,
            speedup
        );
    }
    if let Some(slowest) = rows.first().and_then(|r| r.messages.last()) {
        println!("slowest call: {}", slowest);
    }
}
