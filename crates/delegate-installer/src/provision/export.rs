//! Declarative export: render the delegate instance as Terraform

use super::{ProvisionOutcome, Provisioner};
use crate::aws::credentials::CredentialSpec;
use crate::instance_spec::InstanceSpec;
use anyhow::{Context, Result};
use hcl::expr::{FuncCall, Object, ObjectKey};
use hcl::{Attribute, Block, Body, Expression};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Terraform resource name of the delegate instance
const RESOURCE_NAME: &str = "harness_cie_delegate";

/// Settings rendered into the `provider "aws"` block
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl ProviderSettings {
    /// Region plus static keys, each only when non-empty.
    ///
    /// Assume-role and user-role settings have no provider equivalent here
    /// and are left to the Terraform operator.
    pub fn from_credentials(creds: &CredentialSpec) -> Self {
        let non_empty = |v: Option<&str>| v.filter(|v| !v.is_empty()).map(str::to_string);
        Self {
            region: non_empty(Some(creds.region.as_str())),
            access_key: non_empty(creds.access_key.as_deref()),
            secret_key: non_empty(creds.secret_key.as_deref()),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Writes `vm.tf` describing the same instance the direct path would launch
#[derive(Debug, Clone)]
pub struct TerraformExporter {
    path: PathBuf,
    provider: ProviderSettings,
}

impl TerraformExporter {
    pub fn new(path: impl Into<PathBuf>, provider: ProviderSettings) -> Self {
        Self {
            path: path.into(),
            provider,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the Terraform document. Deterministic for a given spec.
    pub fn render(&self, spec: &InstanceSpec) -> Result<String> {
        let provider = Block::builder("provider")
            .add_label("aws")
            .add_attributes(optional("region", self.provider.region.as_deref()))
            .add_attributes(optional("access_key", self.provider.access_key.as_deref()))
            .add_attributes(optional("secret_key", self.provider.secret_key.as_deref()))
            .build();

        let groups = (!spec.security_groups.is_empty()).then(|| {
            let ids = spec.security_groups.iter().map(|g| Expression::from(g.as_str()));
            Attribute::new("vpc_security_group_ids", Expression::Array(ids.collect()))
        });
        let public_ip = spec
            .has_network_settings()
            .then(|| Attribute::new("associate_public_ip_address", spec.allocate_public_ip));
        let user_data = FuncCall::builder("base64encode")
            .arg(spec.user_data.as_str())
            .build();

        let mut instance = Block::builder("resource")
            .add_label("aws_instance")
            .add_label(RESOURCE_NAME)
            .add_attribute(("ami", spec.image.as_str()))
            .add_attribute(("instance_type", spec.instance_type.as_str()))
            .add_attributes(optional("key_name", spec.key_pair_name.as_deref()))
            .add_attributes(optional("subnet_id", spec.subnet.as_deref()))
            .add_attributes(groups)
            .add_attributes(public_ip)
            .add_attributes(optional("iam_instance_profile", spec.iam_profile.as_deref()))
            .add_attribute(("user_data_base64", Expression::from(user_data)))
            .add_attribute(("tags", tags(&spec.tags)));

        if let Some(root) = &spec.root_device {
            let device = Block::builder("root_block_device")
                .add_attributes(optional("volume_type", root.volume_type.as_deref()))
                .add_attributes(
                    root.volume_size_gb
                        .map(|size| Attribute::new("volume_size", i64::from(size))),
                )
                .add_attributes(
                    root.volume_iops
                        .map(|iops| Attribute::new("iops", i64::from(iops))),
                )
                .add_attribute(("delete_on_termination", true))
                .build();
            instance = instance.add_block(device);
        }

        let body = Body::builder()
            .add_block(provider)
            .add_block(instance.build())
            .build();

        hcl::format::to_string(&body).context("failed to render terraform file")
    }
}

/// A string attribute, only when `value` is present
fn optional(key: &str, value: Option<&str>) -> Option<Attribute> {
    value.map(|value| Attribute::new(key, value))
}

/// Tags as an object with quoted keys; keys like `kubernetes.io/role` are
/// not identifiers.
fn tags(tags: &BTreeMap<String, String>) -> Expression {
    let object: Object<ObjectKey, Expression> = tags
        .iter()
        .map(|(key, value)| {
            (
                ObjectKey::Expression(Expression::from(key.as_str())),
                Expression::from(value.as_str()),
            )
        })
        .collect();
    Expression::Object(object)
}

impl Provisioner for TerraformExporter {
    async fn provision(&self, spec: &InstanceSpec) -> Result<ProvisionOutcome> {
        let rendered = self.render(spec)?;

        if let Err(e) = tokio::fs::write(&self.path, rendered.as_bytes()).await {
            error!(error = %e, path = %self.path.display(), "failed to create terraform file");
            return Err(e)
                .with_context(|| format!("failed to create {} file", self.path.display()));
        }

        info!(path = %self.path.display(), bytes = rendered.len(), "wrote terraform file");
        Ok(ProvisionOutcome::Exported {
            path: self.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance_spec::VmParams;
    use crate::user_data::UserDataDocument;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn params() -> VmParams {
        VmParams {
            image: "ami-123".to_string(),
            instance_type: "t3.medium".to_string(),
            ..Default::default()
        }
    }

    fn spec(params: VmParams) -> InstanceSpec {
        InstanceSpec::build(
            &params,
            UserDataDocument::new("#cloud-config\nruncmd:\n  - ssh-keygen -P \"\"\n"),
        )
    }

    fn exporter() -> TerraformExporter {
        TerraformExporter::new(
            "vm.tf",
            ProviderSettings {
                region: Some("us-east-1".to_string()),
                ..Default::default()
            },
        )
    }

    fn block<'a>(body: &'a Body, identifier: &str) -> &'a Block {
        body.blocks()
            .find(|b| b.identifier() == identifier)
            .unwrap_or_else(|| panic!("no {identifier} block"))
    }

    fn attribute<'a>(block: &'a Block, key: &str) -> Option<&'a Expression> {
        block
            .body()
            .attributes()
            .find(|a| a.key() == key)
            .map(|a| a.expr())
    }

    fn keys(block: &Block) -> Vec<&str> {
        block.body().attributes().map(|a| a.key()).collect()
    }

    #[test]
    fn test_minimal_render() {
        let rendered = exporter().render(&spec(params())).unwrap();
        let expected = r#"
provider "aws" {
  region = "us-east-1"
}

resource "aws_instance" "harness_cie_delegate" {
  ami              = "ami-123"
  instance_type    = "t3.medium"
  user_data_base64 = base64encode("#cloud-config\nruncmd:\n  - ssh-keygen -P \"\"\n")
  tags = {
    "Name" = "harness-cie-delegate"
  }
}
"#;
        assert_eq!(
            hcl::parse(&rendered).unwrap(),
            hcl::parse(expected).unwrap(),
            "rendered:\n{rendered}"
        );
        assert!(rendered.starts_with("provider \"aws\" {\n"));
    }

    #[test]
    fn test_render_is_byte_identical() {
        let mut p = params();
        p.tags.insert("team".to_string(), "ci".to_string());
        p.tags.insert("kubernetes.io/role".to_string(), "delegate".to_string());
        let spec = spec(p);

        assert_eq!(
            exporter().render(&spec).unwrap(),
            exporter().render(&spec).unwrap()
        );
    }

    #[test]
    fn test_unset_optionals_are_omitted() {
        let rendered = exporter().render(&spec(params())).unwrap();
        let body = hcl::parse(&rendered).unwrap();
        let instance = block(&body, "resource");

        assert_eq!(
            keys(instance),
            vec!["ami", "instance_type", "user_data_base64", "tags"]
        );
        assert_eq!(instance.body().blocks().count(), 0);
        assert_eq!(keys(block(&body, "provider")), vec!["region"]);
    }

    #[test]
    fn test_set_optionals_are_rendered() {
        let mut p = params();
        p.key_pair_name = "delegate".to_string();
        p.subnet = "subnet-1".to_string();
        p.security_groups = vec!["sg-1".to_string(), "sg-2".to_string()];
        p.iam_profile = "delegate-profile".to_string();
        p.device_name = "/dev/xvda".to_string();
        p.volume_size_gb = 40;
        p.tags.insert("team".to_string(), "ci".to_string());

        let rendered = exporter().render(&spec(p)).unwrap();
        let body = hcl::parse(&rendered).unwrap();
        let instance = block(&body, "resource");

        assert_eq!(
            keys(instance),
            vec![
                "ami",
                "instance_type",
                "key_name",
                "subnet_id",
                "vpc_security_group_ids",
                "associate_public_ip_address",
                "iam_instance_profile",
                "user_data_base64",
                "tags",
            ]
        );
        assert_eq!(
            attribute(instance, "subnet_id"),
            Some(&Expression::from("subnet-1"))
        );
        assert_eq!(
            attribute(instance, "vpc_security_group_ids"),
            Some(&Expression::Array(vec!["sg-1".into(), "sg-2".into()]))
        );
        assert_eq!(
            attribute(instance, "associate_public_ip_address"),
            Some(&Expression::Bool(false))
        );

        let root = block(instance.body(), "root_block_device");
        assert_eq!(keys(root), vec!["volume_size", "delete_on_termination"]);
        assert_eq!(attribute(root, "volume_size"), Some(&Expression::from(40i64)));
    }

    #[test]
    fn test_template_sequences_are_escaped() {
        let spec = InstanceSpec::build(
            &params(),
            UserDataDocument::new("echo ${HOME} %{if}\n"),
        );
        let rendered = exporter().render(&spec).unwrap();
        assert!(rendered.contains("$${HOME}"), "{rendered}");
        assert!(rendered.contains("%%{if}"), "{rendered}");
    }

    #[test]
    fn test_provider_static_keys() {
        let creds = CredentialSpec::new("eu-west-1").with_static("AKIA", "s3cr3t");
        let settings = ProviderSettings::from_credentials(&creds);
        assert!(!format!("{settings:?}").contains("s3cr3t"));

        let rendered = TerraformExporter::new("vm.tf", settings)
            .render(&spec(params()))
            .unwrap();
        let body = hcl::parse(&rendered).unwrap();
        let provider = block(&body, "provider");
        assert_eq!(keys(provider), vec!["region", "access_key", "secret_key"]);
        assert_eq!(
            attribute(provider, "access_key"),
            Some(&Expression::from("AKIA"))
        );
    }

    #[tokio::test]
    async fn test_provision_writes_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vm.tf");
        std::fs::write(&path, "stale content that is much longer than nothing at all").unwrap();

        let exporter = TerraformExporter::new(&path, ProviderSettings::default());
        let outcome = exporter.provision(&spec(params())).await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::Exported { path: path.clone() });

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, exporter.render(&spec(params())).unwrap());
        assert!(!written.contains("stale"));
    }

    #[tokio::test]
    async fn test_provision_reports_write_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("vm.tf");

        let err = TerraformExporter::new(&path, ProviderSettings::default())
            .provision(&spec(params()))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to create"));
    }

    proptest! {
        #[test]
        fn prop_tags_survive_rendering(
            tags in prop::collection::btree_map("[a-z][a-z0-9./-]{0,12}", "[ -~]{0,16}", 0..6)
        ) {
            let mut p = params();
            p.tags = tags;
            let spec = spec(p);

            let rendered = exporter().render(&spec).unwrap();
            let body = hcl::parse(&rendered).unwrap();
            let instance = block(&body, "resource");
            match attribute(instance, "tags") {
                Some(Expression::Object(object)) => prop_assert_eq!(object.len(), spec.tags.len()),
                other => prop_assert!(false, "tags not an object: {other:?}"),
            }
        }
    }
}
