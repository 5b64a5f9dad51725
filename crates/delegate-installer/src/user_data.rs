//! EC2 user-data generation
//!
//! The delegate VM is bootstrapped by cloud-init from a fixed cloud-config
//! document. Only the three shipped artifacts vary: the compose file, the
//! runner pool file and the runner `.env`. Each is base64-encoded on its own
//! and dropped into a `write_files` entry with `encoding: b64`, so no YAML
//! escaping is ever needed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// The three local files shipped to the VM, in template order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Compose,
    Pool,
    Env,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::Compose => "docker compose",
            Artifact::Pool => "pool",
            Artifact::Env => ".env",
        })
    }
}

/// User-data build errors
#[derive(Debug, Error)]
pub enum UserDataError {
    /// One of the artifacts could not be read
    #[error("failed to encode {artifact} file '{}'", path.display())]
    Read {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UserDataError {
    /// Which artifact failed
    pub fn artifact(&self) -> Artifact {
        match self {
            UserDataError::Read { artifact, .. } => *artifact,
        }
    }
}

/// A rendered cloud-config document.
///
/// Kept as plain text; the EC2 API wants it base64-encoded as a whole
/// ([`UserDataDocument::to_base64`]) while Terraform embeds the text and
/// encodes it itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataDocument(String);

impl UserDataDocument {
    /// Wrap already-rendered user data
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Plain cloud-config text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whole document base64-encoded, as `RunInstances` expects
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_bytes())
    }
}

impl fmt::Display for UserDataDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the delegate cloud-config from the three artifact paths
#[derive(Debug, Clone)]
pub struct UserDataBuilder {
    compose: PathBuf,
    pool: PathBuf,
    env: PathBuf,
}

impl UserDataBuilder {
    pub fn new(
        compose: impl Into<PathBuf>,
        pool: impl Into<PathBuf>,
        env: impl Into<PathBuf>,
    ) -> Self {
        Self {
            compose: compose.into(),
            pool: pool.into(),
            env: env.into(),
        }
    }

    /// Read, encode and render. Stops at the first unreadable artifact.
    pub fn build(&self) -> Result<UserDataDocument, UserDataError> {
        let compose = encode_file(Artifact::Compose, &self.compose)?;
        let pool = encode_file(Artifact::Pool, &self.pool)?;
        let env = encode_file(Artifact::Env, &self.env)?;

        Ok(UserDataDocument(render_cloud_config(&compose, &pool, &env)))
    }
}

fn encode_file(artifact: Artifact, path: &Path) -> Result<String, UserDataError> {
    let data = std::fs::read(path).map_err(|source| UserDataError::Read {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;
    debug!(%artifact, path = %path.display(), bytes = data.len(), "Encoded artifact");
    Ok(STANDARD.encode(data))
}

/// Fill the cloud-config template. Payloads must already be base64.
pub fn render_cloud_config(compose_b64: &str, pool_b64: &str, env_b64: &str) -> String {
    format!(
        r#"#cloud-config
# vim: syntax=yaml
#
packages:
  - docker.io

# create the docker group
groups:
  - docker

# Add default auto created user to docker group
system_info:
  default_user:
    groups: [docker]

write_files:
- path: /runner/docker-compose.yml
  permissions: '0600'
  encoding: b64
  content: {compose_b64}
- path: /runner/.drone_pool.yml
  permissions: '0600'
  encoding: b64
  content: {pool_b64}
- path: /runner/.env
  permissions: '0644'
  encoding: b64
  content: {env_b64}
runcmd:
  - set -e
  - [ ls, -l, / ]
  - sudo curl -L "https://github.com/docker/compose/releases/download/1.29.2/docker-compose-$(uname -s)-$(uname -m)" -o /usr/local/bin/docker-compose
  - sudo chmod +x /usr/local/bin/docker-compose
  - ssh-keygen -f /runner/id_rsa -q -P ""
  - cd /runner
  - sudo docker-compose up -d
"#
    )
}
