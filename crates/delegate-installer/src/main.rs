//! delegate-installer: provision the CI delegate VM
//!
//! Merges the compose file, builds cloud-init user data from the local
//! artifacts and either launches the instance on EC2 or, with `--dry-run`,
//! writes an equivalent `vm.tf`.

use anyhow::{Context, Result};
use clap::Parser;
use delegate_common::defaults::{
    COMPOSE_FILE, DEFAULT_ASSUME_ROLE_SESSION_NAME, DEFAULT_COMPOSE_TEMPLATE, DEFAULT_ENV_FILE,
    DEFAULT_IMAGE, DEFAULT_INSTANCE_TYPE, DEFAULT_POOL_FILE, DEFAULT_REGION, TERRAFORM_FILE,
};
use delegate_common::tags::parse_tags;
use delegate_installer::aws::{self, CredentialSpec, Ec2Client, classify_anyhow_error};
use delegate_installer::config::{ArtifactPaths, InstallerConfig, RuntimeFlags};
use delegate_installer::instance_spec::{InstanceSpec, VmParams};
use delegate_installer::provision::{
    DirectProvisioner, ProviderSettings, ProvisionMode, ProvisionOutcome, Provisioner,
    TerraformExporter,
};
use delegate_installer::{compose, user_data::UserDataBuilder};
use garde::Validate;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "delegate-installer")]
#[command(about = "CIE VM delegate installer")]
#[command(version)]
struct Args {
    /// AWS access key
    #[arg(long, env = "DRONE_SETTINGS_AWS_ACCESS_KEY_ID")]
    access_key: Option<String>,

    /// AWS secret key
    #[arg(long, env = "DRONE_SETTINGS_AWS_ACCESS_KEY_SECRET", hide_env_values = true)]
    secret_key: Option<String>,

    /// AWS IAM role to assume
    #[arg(long, env = "DRONE_SETTINGS_AWS_ASSUME_ROLE")]
    assume_role: Option<String>,

    /// AWS IAM role session name
    #[arg(
        long,
        env = "DRONE_SETTINGS_AWS_ASSUME_ROLE_SESSION_NAME",
        default_value = DEFAULT_ASSUME_ROLE_SESSION_NAME
    )]
    assume_role_session_name: String,

    /// AWS role to act as once authenticated
    #[arg(long, env = "DRONE_SETTINGS_AWS_USER_ROLE_ARN")]
    user_role_arn: Option<String>,

    /// AWS region
    #[arg(long, env = "DRONE_SETTINGS_AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS key pair name
    #[arg(long, env = "DRONE_SETTINGS_KEY_PAIR_NAME", default_value = "")]
    key_name: String,

    /// Delegate AMI
    #[arg(long, default_value = DEFAULT_IMAGE)]
    image: String,

    /// Delegate instance type
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    instance_type: String,

    /// VPC subnet ID (uses the default VPC if not specified)
    #[arg(long, default_value = "")]
    subnet: String,

    /// Comma-separated security group IDs
    #[arg(long, value_delimiter = ',')]
    security_groups: Vec<String>,

    /// Request a public IP address for the instance
    #[arg(long)]
    allocate_public_ip: bool,

    /// IAM instance profile name
    #[arg(long, default_value = "")]
    iam_profile: String,

    /// Comma-separated `key=value` tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Root device name (enables the root volume settings below)
    #[arg(long, default_value = "")]
    device_name: String,

    /// Root volume type
    #[arg(long, default_value = "")]
    volume_type: String,

    /// Root volume size in GiB
    #[arg(long, default_value_t = 0)]
    volume_size: i32,

    /// Root volume provisioned IOPS
    #[arg(long, default_value_t = 0)]
    volume_iops: i32,

    /// Write vm.tf instead of launching the instance
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Source env file, also shipped to the VM as the runner .env
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Compose template the runner service is merged into
    #[arg(long, default_value = DEFAULT_COMPOSE_TEMPLATE)]
    compose_template: PathBuf,

    /// Runner pool file shipped to the VM
    #[arg(long, default_value = DEFAULT_POOL_FILE)]
    pool_file: PathBuf,
}

impl From<Args> for InstallerConfig {
    fn from(args: Args) -> Self {
        let mut credentials = CredentialSpec::new(args.region)
            .with_session_name(args.assume_role_session_name);
        credentials.access_key = args.access_key;
        credentials.secret_key = args.secret_key;
        credentials.assume_role_arn = args.assume_role;
        credentials.user_role_arn = args.user_role_arn;

        Self {
            credentials,
            vm: VmParams {
                image: args.image,
                instance_type: args.instance_type,
                key_pair_name: args.key_name,
                subnet: args.subnet,
                security_groups: args.security_groups,
                allocate_public_ip: args.allocate_public_ip,
                iam_profile: args.iam_profile,
                tags: parse_tags(&args.tags),
                device_name: args.device_name,
                volume_type: args.volume_type,
                volume_size_gb: args.volume_size,
                volume_iops: args.volume_iops,
            },
            artifacts: ArtifactPaths {
                compose_template: args.compose_template,
                compose: PathBuf::from(COMPOSE_FILE),
                pool: args.pool_file,
                env: args.env_file,
            },
            flags: RuntimeFlags {
                dry_run: args.dry_run,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = classify_anyhow_error(e).and_then(|aws| aws.suggestion()) {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {hint}");
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?),
        )
        .init();

    // The env file may carry any of the DRONE_SETTINGS_* variables, so it is
    // loaded first and the command line parsed again on top of it.
    let args = Args::parse();
    match dotenv::from_path(&args.env_file) {
        Ok(()) => debug!(path = %args.env_file.display(), "Loaded env file"),
        Err(e) => debug!(path = %args.env_file.display(), error = %e, "Env file not loaded"),
    }
    let config: InstallerConfig = Args::parse().into();

    config.validate().context("invalid configuration")?;

    let mode = ProvisionMode::from_dry_run(config.flags.dry_run);
    info!(
        region = %config.credentials.region,
        image = %config.vm.image,
        instance_type = %config.vm.instance_type,
        mode = ?mode,
        "Installing delegate"
    );

    compose::merge_compose(&config.artifacts.compose_template, &config.artifacts.compose)?;

    let user_data = UserDataBuilder::new(
        &config.artifacts.compose,
        &config.artifacts.pool,
        &config.artifacts.env,
    )
    .build()?;

    let spec = InstanceSpec::build(&config.vm, user_data);

    let outcome = match mode {
        ProvisionMode::Direct => {
            let ctx = aws::resolve(&config.credentials)
                .await
                .context("failed to resolve AWS credentials")?;
            DirectProvisioner::new(Ec2Client::from_context(&ctx))
                .provision(&spec)
                .await?
        }
        ProvisionMode::Export => {
            TerraformExporter::new(
                TERRAFORM_FILE,
                ProviderSettings::from_credentials(&config.credentials),
            )
            .provision(&spec)
            .await?
        }
    };

    match outcome {
        ProvisionOutcome::Launched(instance) => {
            println!("Launched delegate instance {}", instance.instance_id);
        }
        ProvisionOutcome::Exported { path } => {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> InstallerConfig {
        let argv = std::iter::once("delegate-installer").chain(args.iter().copied());
        Args::try_parse_from(argv).unwrap().into()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.credentials.region, DEFAULT_REGION);
        assert_eq!(config.credentials.assume_role_session_name, "drone-s3");
        assert_eq!(config.vm.image, DEFAULT_IMAGE);
        assert_eq!(config.vm.instance_type, "t2.medium");
        assert_eq!(config.artifacts.compose, PathBuf::from("docker-compose.yml"));
        assert_eq!(config.artifacts.pool, PathBuf::from("config/.drone_pool.yml"));
        assert_eq!(config.artifacts.env, PathBuf::from("config/.env"));
        assert!(config.vm.tags.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lists_and_tags() {
        let config = parse(&[
            "--security-groups",
            "sg-1,sg-2",
            "--tags",
            "team=ci,env=prod",
            "--access-key",
            "AKIA",
            "--secret-key",
            "secret",
        ]);
        assert_eq!(config.vm.security_groups, vec!["sg-1", "sg-2"]);
        assert_eq!(config.vm.tags.len(), 2);
        assert_eq!(config.vm.tags["env"], "prod");
        assert_eq!(config.credentials.access_key.as_deref(), Some("AKIA"));
    }

    #[test]
    fn test_dry_run_selects_export() {
        let config = parse(&["--dry-run"]);
        assert_eq!(
            ProvisionMode::from_dry_run(config.flags.dry_run),
            ProvisionMode::Export
        );
    }
}
