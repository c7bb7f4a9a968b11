//! `testkit token`: obtain a session token

use std::sync::Arc;

use clap::Args;

use testkit_common::redact::mask_token;
use testkit_common::TestConfig;
use testkit_e2e::{AuthOptions, TokenStore};

use crate::output::print_info;

#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Environment (defaults to TEST_ENV, then `local`)
    #[arg(long = "env")]
    pub environment: Option<String>,

    /// User identifier (defaults to `default-user`)
    #[arg(long)]
    pub user: Option<String>,

    /// Log in again even if a valid session is cached
    #[arg(long)]
    pub refresh: bool,

    /// Print the full token instead of a masked preview
    #[arg(long)]
    pub show: bool,
}

pub async fn execute(args: TokenArgs, config: &TestConfig) -> anyhow::Result<()> {
    let store = TokenStore::from_config(Arc::new(config.clone()))?;
    let options = AuthOptions {
        environment: args.environment,
        user_identifier: args.user,
    };

    let token = if args.refresh {
        store.refresh(&options).await?
    } else {
        store.token(&options).await?
    };

    print_info(&format!("Session: {}", store.session_path(&options).display()));
    if args.show {
        println!("{}", token);
    } else {
        println!("{}", mask_token(&token));
    }
    Ok(())
}
