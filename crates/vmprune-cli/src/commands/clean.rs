use crate::config::{Config, PolicyOverrides};
use crate::display::{display_decision, display_report, print_info, print_json, prompt_confirm};
use crate::{CliError, Result};
use clap::Args;
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vmprune_api::{ConnectionSettings, VsphereClient};
use vmprune_core::{
    run_with, Actuator, InventoryProvider, RunContext, RunPolicy, RunReport, RunRequest,
};

/// Policy flags shared by `clean` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Image name regex; the last capture group is the version
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Number of newest images to keep
    #[arg(short, long, allow_negative_numbers = true)]
    pub keep: Option<i64>,

    /// Name of the image the current build produced; never deleted
    #[arg(long, env = "VMPRUNE_ARTIFACT_ID")]
    pub artifact_id: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl PolicyArgs {
    fn overrides(&self, dry_run: bool) -> PolicyOverrides {
        PolicyOverrides {
            pattern: self.pattern.clone(),
            keep: self.keep,
            dry_run,
            artifact_id: self.artifact_id.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Handles the `clean` command.
///
/// Settings are validated before a session is opened. Unless `--yes` is
/// given, the decision is shown and confirmed before anything is deleted.
/// Per-image failures are reported but do not fail the command.
pub async fn handle(args: CleanArgs, config: &Config) -> Result<()> {
    let request = config.run_request(&args.policy.overrides(args.dry_run));

    if args.policy.json && !args.yes && !request.dry_run {
        return Err(CliError::InvalidInput(
            "--json cannot prompt for confirmation, pass --yes as well".to_string(),
        ));
    }

    execute(request, args.policy.json, args.yes, config).await
}

/// Handles the `plan` command, which is `clean` forced into a dry run
pub async fn handle_plan(args: PolicyArgs, config: &Config) -> Result<()> {
    let request = config.run_request(&args.overrides(true));
    execute(request, args.json, true, config).await
}

async fn execute(request: RunRequest, json: bool, yes: bool, config: &Config) -> Result<()> {
    RunPolicy::from_request(&request)?;
    config.validate_connection()?;

    let settings = ConnectionSettings::from_config(config)?;
    let client = VsphereClient::connect(&settings).await?;

    let cancel = CancellationToken::new();
    let watcher = watch_interrupt(cancel.clone());
    let ctx = RunContext::new(&client, &client, cancel);

    let outcome = perform(&request, &ctx, yes).await;

    watcher.abort();
    client.logout().await;

    match outcome? {
        Some(report) if json => print_json(&report),
        Some(report) => {
            display_report(&report);
            Ok(())
        }
        None => {
            print_info("Operation cancelled.");
            Ok(())
        }
    }
}

/// Run once against `ctx`, asking for confirmation unless `yes`.
///
/// Returns `None` when the user declines.
pub async fn perform<P, A>(
    request: &RunRequest,
    ctx: &RunContext<'_, P, A>,
    yes: bool,
) -> Result<Option<RunReport>>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
{
    let mut declined = false;
    let mut prompt_error = None;

    let report = run_with(request, ctx, |decision| {
        if yes {
            return true;
        }
        display_decision(&decision.delete_names(), &decision.keep_names());
        let message = format!("Delete {} image(s)?", decision.to_delete.len());
        // The prompt blocks on stdin; needs the multi-thread runtime
        match tokio::task::block_in_place(|| prompt_confirm(&message, false)) {
            Ok(true) => true,
            Ok(false) => {
                declined = true;
                false
            }
            Err(e) => {
                prompt_error = Some(e);
                false
            }
        }
    })
    .await?;

    if let Some(e) = prompt_error {
        return Err(e);
    }
    if declined {
        info!("Run {} declined at the prompt", report.run_id);
        return Ok(None);
    }
    Ok(Some(report))
}

fn watch_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding vCenter calls");
            cancel.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmprune_core::memory::InMemoryPlatform;
    use vmprune_core::ImageOutcome;

    fn platform() -> InMemoryPlatform {
        InMemoryPlatform::new()
            .with_template("ubuntu-2204-10", "vm-10", "esx01")
            .with_template("ubuntu-2204-11", "vm-11", "esx01")
            .with_template("ubuntu-2204-12", "vm-12", "esx01")
            .with_pool("/DC/host/esx01/Resources")
    }

    #[tokio::test]
    async fn test_perform_with_yes_reclaims() {
        let platform = platform();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());
        let request = RunRequest::new(r"ubuntu-2204-(\d+)");

        let report = perform(&request, &ctx, true).await.unwrap().unwrap();

        assert_eq!(report.to_delete, vec!["ubuntu-2204-10"]);
        assert_eq!(report.results[0].outcome, ImageOutcome::Deleted);
        assert!(!platform.contains("vm-10"));
    }

    #[tokio::test]
    async fn test_perform_surfaces_policy_errors() {
        let platform = platform();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());
        let request = RunRequest::new(r"ubuntu-2204-(\d+)").keep(0);

        let err = perform(&request, &ctx, true).await.unwrap_err();

        assert!(matches!(err, CliError::Core(_)));
        assert_eq!(platform.candidate_listings(), 0);
    }

    #[tokio::test]
    async fn test_request_from_config_and_flags() {
        let config = Config {
            config_path: std::path::PathBuf::from("unused.toml"),
            data: toml::from_str(
                r#"
[cleanup]
image_name_regex = 'ubuntu-2204-(\d+)'
keep_images = 1
"#,
            )
            .unwrap(),
        };
        let args = PolicyArgs {
            artifact_id: Some("ubuntu-2204-10".to_string()),
            ..PolicyArgs::default()
        };
        let request = config.run_request(&args.overrides(false));

        let platform = platform();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());
        let report = perform(&request, &ctx, true).await.unwrap().unwrap();

        assert_eq!(report.to_delete, vec!["ubuntu-2204-11"]);
        assert_eq!(report.to_keep, vec!["ubuntu-2204-12", "ubuntu-2204-10"]);
        assert!(platform.contains("vm-10"));
    }
}
