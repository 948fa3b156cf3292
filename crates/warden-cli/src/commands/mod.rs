pub mod approve;
pub mod init;
pub mod run;
pub mod status;
pub mod validate;

use crate::cli::{Cli, Commands};

/// Dispatches to the command handler and maps its result to a process
/// exit code (§6: 0 on success or an informational non-terminal state,
/// non-zero otherwise). Each handler prints its own output before
/// returning.
pub async fn dispatch(cli: Cli) -> i32 {
    let output = cli.output;
    let result = match cli.command {
        Commands::Init { template, force } => init::run(template, force, output).await,
        Commands::Validate { workflow, strict } => validate::run(&workflow, strict, output).await,
        Commands::Run { workflow, dry_run, inputs, wait } => {
            run::run(&cli.config, &workflow, dry_run, inputs, wait, output).await
        }
        Commands::Status { run_id, all, watch } => status::run(&cli.config, run_id, all, watch, output).await,
        Commands::Approve { run_id, reject, comment, approver } => {
            approve::run(&cli.config, &run_id, reject, comment, approver, output).await
        }
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            crate::output::print_error(&err, output);
            1
        }
    }
}
