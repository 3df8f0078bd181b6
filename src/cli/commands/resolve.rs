//! `tmt-web resolve`: one synchronous resolution from the command line.

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::application::build_pipeline;
use crate::domain::models::{Config, RequestParams, DEFAULT_REF};
use crate::services::Resolution;

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Repository URL of the test
    #[arg(long)]
    pub test_url: Option<String>,
    /// Test name, e.g. /tests/smoke
    #[arg(long)]
    pub test_name: Option<String>,
    /// Branch, tag or commit of the test repository
    #[arg(long, default_value = DEFAULT_REF)]
    pub test_ref: String,
    /// Metadata tree directory inside the test repository
    #[arg(long)]
    pub test_path: Option<String>,

    /// Repository URL of the plan
    #[arg(long)]
    pub plan_url: Option<String>,
    /// Plan name, e.g. /plans/basic
    #[arg(long)]
    pub plan_name: Option<String>,
    /// Branch, tag or commit of the plan repository
    #[arg(long, default_value = DEFAULT_REF)]
    pub plan_ref: String,
    /// Metadata tree directory inside the plan repository
    #[arg(long)]
    pub plan_path: Option<String>,

    /// Output format: html, json or yaml
    #[arg(short, long, default_value = "json")]
    pub format: String,
}

impl From<ResolveArgs> for RequestParams {
    fn from(args: ResolveArgs) -> Self {
        Self {
            test_url: args.test_url,
            test_name: args.test_name,
            test_ref: args.test_ref,
            test_path: args.test_path,
            plan_url: args.plan_url,
            plan_name: args.plan_name,
            plan_ref: args.plan_ref,
            plan_path: args.plan_path,
            format: args.format,
        }
    }
}

pub async fn execute(args: ResolveArgs, config: Config) -> Result<()> {
    let request = RequestParams::from(args).validate()?;
    let pipeline = build_pipeline(&config)?;

    match pipeline
        .resolve(&request)
        .await
        .context("Resolution failed")?
    {
        Resolution::Rendered(payload) => {
            println!("{}", payload.trim_end());
            Ok(())
        }
        Resolution::NotFound => bail!("Requested test or plan was not found"),
    }
}
