use engine_runtime::execution::summary::RunSummary;

pub fn print_summary(summary: &RunSummary) {
    println!("Run '{}' for table '{}':", summary.run_id, summary.table);
    println!("-----------------------------");
    println!("{:<16} {}", "Mode", summary.mode);
    println!("{:<16} {}", "Chunks", summary.chunks);
    println!("{:<16} {}", "Rows loaded", summary.rows_loaded);
    println!("{:<16} {:.3}s", "Elapsed", summary.elapsed_secs());
    println!("{:<16} {}", "Connections", summary.metrics.connections_opened);
}
