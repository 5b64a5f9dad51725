//! Filesystem fixtures
//!
//! Everything lives in a [`TempDir`] that is removed when the fixture drops.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimal delegate compose template
pub const COMPOSE_TEMPLATE: &str = r#"version: "3.7"
services:
  harness-ng-delegate:
    restart: unless-stopped
    image: harness/delegate:latest
"#;

/// The three artifacts shipped to the delegate VM, written to a temp dir
pub struct ArtifactFixture {
    dir: TempDir,
    pub compose: PathBuf,
    pub pool: PathBuf,
    pub env: PathBuf,
}

impl ArtifactFixture {
    /// 10-byte compose, 5-byte pool and 3-byte env files
    pub fn new() -> Self {
        Self::with_contents(b"services:\n", b"pool\n", b"A=1")
    }

    pub fn with_contents(compose: &[u8], pool: &[u8], env: &[u8]) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let compose = write(dir.path(), "docker-compose.yml", compose);
        let pool = write(dir.path(), ".drone_pool.yml", pool);
        let env = write(dir.path(), ".env", env);
        Self {
            dir,
            compose,
            pool,
            env,
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write [`COMPOSE_TEMPLATE`] next to the artifacts and return its path
    pub fn compose_template(&self) -> PathBuf {
        write(
            self.dir.path(),
            "harness-delegate.yml",
            COMPOSE_TEMPLATE.as_bytes(),
        )
    }
}

impl Default for ArtifactFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `contents` to `dir/name`
pub fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture file");
    path
}

/// One legacy pool definition document (without the `---` separator)
pub fn legacy_pool_document(name: &str, min: u32, max: u32) -> String {
    format!(
        r#"name: {name}
min_pool_size: {min}
max_pool_size: {max}
platform:
  os: linux
  arch: amd64
account:
  access_key_id: AKIAEXAMPLE
  access_key_secret: secret
  region: us-east-2
instance:
  ami: ami-{name}
  type: t2.micro
  private_key: /keys/id_rsa
  public_key: /keys/id_rsa.pub
  network:
    subnet_id: subnet-{name}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_sizes() {
        let fixture = ArtifactFixture::new();
        assert_eq!(std::fs::read(&fixture.compose).unwrap().len(), 10);
        assert_eq!(std::fs::read(&fixture.pool).unwrap().len(), 5);
        assert_eq!(std::fs::read(&fixture.env).unwrap().len(), 3);
        assert!(fixture.compose_template().starts_with(fixture.dir()));
    }

    #[test]
    fn test_legacy_document() {
        let doc = legacy_pool_document("pool1", 1, 3);
        assert!(doc.starts_with("name: pool1\n"));
        assert!(doc.contains("max_pool_size: 3\n"));
    }
}
