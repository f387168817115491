use std::path::PathBuf;

use anyhow::{Context, Result};
use futures::{pin_mut, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    checkpoint::CheckpointStore,
    cli::{create_spinner, RunArgs},
    download::ChunkSource,
    reading::{normalize, Observation},
    tasks::{DateWindow, Forecast, HottestDays, RangeMatches, TaskSet},
};

use super::{compile::compile_checkpoints, write_reports};

/// Streams the source chunk by chunk through the three tasks and writes the
/// reports. With `--checkpoint-every` the state goes to disk every N chunks
/// and the reports are compiled from the checkpoints at the end.
pub async fn run(args: &RunArgs) -> Result<Vec<PathBuf>> {
    let files = args.output.files();
    files.ensure_dir()?;

    let store = args.checkpoint_every.map(|_| CheckpointStore::new(&files));
    if let Some(store) = &store {
        store.clear().context("clearing stale checkpoints")?;
    }

    let mut tasks = task_set(args);
    let source = args.source();

    let bar = create_spinner(format!("Reading {}...", source));
    let stream = source
        .open()
        .await
        .with_context(|| format!("opening `{}`", source))?;
    let chunks = ChunkSource::new(stream, args.chunk_size).into_stream();
    pin_mut!(chunks);

    let mut chunk_count: u64 = 0;
    let mut row_count = 0;
    let mut checkpoint_index = 0;

    while let Some(chunk) = chunks
        .try_next()
        .await
        .with_context(|| format!("reading chunk {}", chunk_count + 1))?
    {
        let rows = normalize(&chunk)
            .with_context(|| format!("normalizing chunk {}", chunk_count + 1))?;
        row_count += rows.len();
        tasks = absorb_chunk(tasks, rows, args.parallel).await?;
        chunk_count += 1;
        debug!(
            "After chunk {}: {} days, {} range matches, {} forecast points",
            chunk_count,
            tasks.hottest.len(),
            tasks.ranges.len(),
            tasks.forecast.len()
        );
        bar.set_message(format!("Processed {} chunks ({} rows)", chunk_count, row_count));

        if let (Some(store), Some(every)) = (&store, args.checkpoint_every) {
            if chunk_count % every == 0 {
                save_checkpoint(store, checkpoint_index, &mut tasks)?;
                checkpoint_index += 1;
            }
        }
    }

    tasks.finish()?;
    bar.finish_with_message(format!("Processed {} chunks ({} rows)", chunk_count, row_count));
    info!("Processed {} rows in {} chunks", row_count, chunk_count);

    match &store {
        Some(store) => {
            if !tasks.is_empty() || checkpoint_index == 0 {
                save_checkpoint(store, checkpoint_index, &mut tasks)?;
            }
            compile_checkpoints(store, &files, &args.summary)
        }
        None => {
            let (days, matches, points) = tasks.take();
            write_reports(&files, &args.summary, &days, &matches, &points)
        }
    }
}

/// Feeds one chunk to the tasks. The parallel fan-out blocks on its threads,
/// so it runs on the blocking pool instead of a runtime worker.
async fn absorb_chunk(
    mut tasks: TaskSet,
    rows: Vec<Observation>,
    parallel: bool,
) -> Result<TaskSet> {
    if !parallel {
        tasks.absorb(&rows, false)?;
        return Ok(tasks);
    }

    let (tasks, result) = tokio::task::spawn_blocking(move || {
        let result = tasks.absorb(&rows, true);
        (tasks, result)
    })
    .await
    .context("joining the task workers")?;
    result?;

    Ok(tasks)
}

fn task_set(args: &RunArgs) -> TaskSet {
    if args.t2_start_date > args.t2_end_date {
        warn!("Range window starts after it ends; the range report will be empty");
    }

    TaskSet {
        hottest: HottestDays::new(args.t1_col_name),
        ranges: RangeMatches::new(
            DateWindow::new(args.t2_start_date, args.t2_end_date),
            args.t2_ranges.clone(),
        ),
        forecast: Forecast::new(
            DateWindow::from_start(args.t3_start_date, args.t3_num_days),
            args.t3_col_name,
            args.t3_average,
            args.t3_mode,
        ),
    }
}

fn save_checkpoint(store: &CheckpointStore, index: usize, tasks: &mut TaskSet) -> Result<()> {
    let (days, matches, points) = tasks.take();
    store
        .save(index, &days, &matches, &points)
        .with_context(|| format!("saving checkpoint {}", index))?;
    info!("Saved checkpoint {}", index);
    Ok(())
}

// -- Tests -------------------------------------------------------------------
