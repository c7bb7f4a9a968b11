//! `testkit user`: generate (and optionally seed) a test user

use clap::Args;
use serde::Serialize;

use testkit_common::TestConfig;
use testkit_e2e::{create_user, ApiClient, Role, User, UserOverrides};

use crate::output::{print_item, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct UserArgs {
    /// Role: user, admin, moderator
    #[arg(long, default_value = "user")]
    pub role: Role,

    /// Create a deactivated account
    #[arg(long)]
    pub inactive: bool,

    /// Fixed email instead of a generated one
    #[arg(long)]
    pub email: Option<String>,

    /// Create the user through the API as well
    #[arg(long)]
    pub seed: bool,
}

#[derive(Serialize)]
#[serde(transparent)]
struct UserDisplay(User);

impl TableDisplay for UserDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Email", "Name", "Role", "Active", "Created"]
    }

    fn row(&self) -> Vec<String> {
        let user = &self.0;
        vec![
            user.id.to_string(),
            user.email.clone(),
            user.name.clone(),
            user.role.to_string(),
            if user.is_active { "✓" } else { "✗" }.to_string(),
            user.created_at.to_rfc3339(),
        ]
    }
}

impl UserArgs {
    fn overrides(&self) -> UserOverrides {
        UserOverrides {
            email: self.email.clone(),
            role: Some(self.role),
            is_active: Some(!self.inactive),
            ..Default::default()
        }
    }
}

pub async fn execute(args: UserArgs, config: &TestConfig, format: OutputFormat) -> anyhow::Result<()> {
    let user = if args.seed {
        ApiClient::new(config)?.seed_user(args.overrides()).await?
    } else {
        create_user(args.overrides())
    };

    print_item(&UserDisplay(user), format)
}
