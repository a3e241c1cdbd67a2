use lapse_runner::prelude::{init, run, LapseResult};

fn main() -> LapseResult<()> {
    let cli = init();

    run(cli)
}
