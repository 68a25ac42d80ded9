use anyhow::Result;
use timekeeper::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli());
    // A pending stdin read in `watch` would otherwise keep the process alive.
    runtime.shutdown_background();

    result.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}
