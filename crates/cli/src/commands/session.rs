//! `testkit setup` / `testkit teardown`

use clap::Args;

use testkit_common::TestConfig;
use testkit_e2e::{global_setup, global_teardown, SetupOptions, TeardownOptions};

use crate::output::print_success;

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Block until the API health endpoint answers 2xx
    #[arg(long)]
    pub wait_for_api: bool,
}

#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Remove every cached auth session
    #[arg(long)]
    pub clear_sessions: bool,
}

pub async fn setup(args: SetupArgs, config: &TestConfig) -> anyhow::Result<()> {
    global_setup(
        config,
        &SetupOptions {
            wait_for_api: args.wait_for_api,
        },
    )
    .await?;

    print_success(&format!(
        "Setup complete (sessions in {})",
        config.auth_dir.display()
    ));
    Ok(())
}

pub async fn teardown(args: TeardownArgs, config: &TestConfig) -> anyhow::Result<()> {
    global_teardown(
        config,
        &TeardownOptions {
            clear_sessions: args.clear_sessions,
        },
    )
    .await?;

    print_success("Teardown complete");
    Ok(())
}
