//! Docker compose file for the delegate VM
//!
//! The shipped compose template only describes the delegate itself. The VM
//! also needs the runner service next to it, and every service has to share
//! the host network so the delegate can reach the runner on `localhost:3000`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Name of the service added next to the delegate
pub const RUNNER_SERVICE: &str = "drone-runner-aws";

/// Top-level compose document. Only `version` and `services` are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The runner service definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerService {
    pub restart: &'static str,
    pub image: &'static str,
    pub volumes: Vec<&'static str>,
    pub entrypoint: Vec<&'static str>,
    pub working_dir: &'static str,
    pub ports: Vec<&'static str>,
}

impl Default for RunnerService {
    fn default() -> Self {
        Self {
            restart: "unless-stopped",
            image: "drone/drone-runner-aws",
            volumes: vec![".:/runner"],
            entrypoint: vec!["/bin/drone-runner-aws", "delegate"],
            working_dir: "/runner",
            ports: vec!["3000:3000"],
        }
    }
}

impl ComposeFile {
    /// Put every mapping-shaped service on the host network and add the
    /// runner service, replacing any service already using its name.
    pub fn with_runner(mut self) -> Result<Self> {
        for (name, service) in self.services.iter_mut() {
            if let Value::Mapping(map) = service {
                map.insert(Value::from("network_mode"), Value::from("host"));
            } else {
                debug!(service = %name, "Skipping non-mapping service");
            }
        }

        let runner = serde_yaml::to_value(RunnerService::default())
            .context("failed to encode runner service")?;
        self.services.insert(RUNNER_SERVICE.to_string(), runner);
        Ok(self)
    }
}

/// Read `template`, add the runner service, and write the result to `output`.
pub fn merge_compose(template: &Path, output: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read {}", template.display()))?;

    let compose: ComposeFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", template.display()))?;

    let merged = compose.with_runner()?;
    let rendered = serde_yaml::to_string(&merged).context("failed to encode docker compose file")?;

    std::fs::write(output, rendered).context("failed to write output docker compose file")?;

    info!(
        template = %template.display(),
        output = %output.display(),
        services = merged.services.len(),
        "Wrote docker compose file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"version: "3.7"
services:
  harness-ng-delegate:
    restart: unless-stopped
    image: harness/delegate:latest
    environment:
      - ACCOUNT_ID=abc
"#;

    fn service<'a>(compose: &'a ComposeFile, name: &str) -> &'a serde_yaml::Mapping {
        compose.services[name].as_mapping().unwrap()
    }

    #[test]
    fn test_services_join_host_network() {
        let compose: ComposeFile = serde_yaml::from_str(TEMPLATE).unwrap();
        let merged = compose.with_runner().unwrap();

        assert_eq!(merged.version.as_deref(), Some("3.7"));
        assert_eq!(merged.services.len(), 2);
        let delegate = service(&merged, "harness-ng-delegate");
        assert_eq!(delegate["network_mode"], Value::from("host"));
        assert_eq!(delegate["image"], Value::from("harness/delegate:latest"));
    }

    #[test]
    fn test_runner_service_shape() {
        let merged = ComposeFile::default().with_runner().unwrap();
        let runner = service(&merged, RUNNER_SERVICE);

        assert_eq!(runner["restart"], Value::from("unless-stopped"));
        assert_eq!(runner["image"], Value::from("drone/drone-runner-aws"));
        assert_eq!(runner["working_dir"], Value::from("/runner"));
        assert_eq!(
            runner["entrypoint"],
            serde_yaml::to_value(["/bin/drone-runner-aws", "delegate"]).unwrap()
        );
        assert_eq!(runner["ports"], serde_yaml::to_value(["3000:3000"]).unwrap());
        assert_eq!(runner["volumes"], serde_yaml::to_value([".:/runner"]).unwrap());
        assert!(runner.get("network_mode").is_none());
    }

    #[test]
    fn test_existing_runner_is_replaced() {
        let compose: ComposeFile =
            serde_yaml::from_str("services:\n  drone-runner-aws:\n    image: old\n").unwrap();
        let merged = compose.with_runner().unwrap();
        assert_eq!(merged.services.len(), 1);
        assert_eq!(
            service(&merged, RUNNER_SERVICE)["image"],
            Value::from("drone/drone-runner-aws")
        );
    }

    #[test]
    fn test_merge_compose_writes_output() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("harness-delegate.yml");
        let output = dir.path().join("docker-compose.yml");
        std::fs::write(&template, TEMPLATE).unwrap();

        merge_compose(&template, &output).unwrap();

        let written: ComposeFile =
            serde_yaml::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(written.services.contains_key(RUNNER_SERVICE));
        assert!(written.services.contains_key("harness-ng-delegate"));
    }

    #[test]
    fn test_merge_compose_errors() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("docker-compose.yml");

        let err = merge_compose(&dir.path().join("missing.yml"), &output).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));

        let template = dir.path().join("bad.yml");
        std::fs::write(&template, "services: [unterminated").unwrap();
        let err = merge_compose(&template, &output).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse"));
        assert!(!output.exists());
    }
}
