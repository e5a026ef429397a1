use clap::Parser;

use judge_runner::{Opt, Runner};
use judge_runner_exec::ProcessSandboxRunner;

fn main() {
    let opt = Opt::parse();
    opt.logger.enable_log();

    let runner = Runner::new(opt.to_config(), ProcessSandboxRunner::default());
    let verdict = runner.run();
    if let Err(e) = verdict.emit(std::io::stdout().lock()) {
        log::error!("Cannot print the verdict: {:?}", e);
    }
    // the verdict is the result, the exit status never is
}
