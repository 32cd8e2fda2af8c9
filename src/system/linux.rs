//! Real host implementation
//!
//! Shells out to the usual system tools (apt-get, useradd, chown, tar,
//! systemctl, kafka-storage.sh) and streams the distribution download to
//! disk while hashing it. Every command's stderr is captured into the error
//! so a failed bootstrap is diagnosable from the status report alone.

use futures_util::StreamExt;
use sha2::{Digest, Sha512};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::common::{
    format_bytes, retry_with_backoff, write_atomic, BootstrapConfig, Error, Result,
};
use crate::system::Host;

const JAVA_PACKAGE: &str = "openjdk-17-jre-headless";
const UNIT_DIR: &str = "/etc/systemd/system";
const VERSION_MARKER: &str = ".installed-version";

pub struct SystemHost {
    client: reqwest::Client,
}

impl SystemHost {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Stream a URL to `dest`, returning the hex SHA-512 of the body.
    async fn download(&self, url: &str, dest: &Path) -> Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;

        let mut hasher = Sha512::new();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut total: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            total += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::info!("downloaded {} ({})", url, format_bytes(total));
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Run a command, capturing stderr into the error on non-zero exit.
async fn run(program: &str, args: &[&str]) -> Result<String> {
    tracing::debug!("running {} {}", program, args.join(" "));
    let output = Command::new(program).args(args).output().await?;

    if !output.status.success() {
        return Err(Error::Command {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// True when the install tree already holds the configured version.
fn distribution_is_current(config: &BootstrapConfig) -> bool {
    let launcher = config.install_dir.join("bin/kafka-server-start.sh");
    let marker = config.install_dir.join(VERSION_MARKER);
    launcher.exists()
        && std::fs::read_to_string(marker)
            .map(|v| v.trim() == config.kafka_version)
            .unwrap_or(false)
}

impl Host for SystemHost {
    async fn ensure_packages(&self) -> Result<()> {
        run("apt-get", &["update", "-q"]).await?;
        run(
            "apt-get",
            &["install", "-y", "-q", "--no-install-recommends", JAVA_PACKAGE],
        )
        .await?;
        Ok(())
    }

    async fn ensure_user(&self, user: &str) -> Result<()> {
        // `id` succeeding means the user already exists
        if run("id", &["-u", user]).await.is_ok() {
            tracing::debug!("service user {} already exists", user);
            return Ok(());
        }
        run(
            "useradd",
            &[
                "--system",
                "--no-create-home",
                "--shell",
                "/usr/sbin/nologin",
                user,
            ],
        )
        .await?;
        Ok(())
    }

    async fn ensure_dirs(&self, config: &BootstrapConfig) -> Result<()> {
        let owner = format!("{0}:{0}", config.service_user);
        for dir in [&config.install_dir, &config.data_dir, &config.state_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }
        if let Some(parent) = config.server_config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        for dir in [&config.install_dir, &config.data_dir] {
            run("chown", &["-R", &owner, &dir.display().to_string()]).await?;
        }
        Ok(())
    }

    async fn fetch_distribution(&self, config: &BootstrapConfig) -> Result<()> {
        if distribution_is_current(config) {
            tracing::info!(
                "Kafka {} already unpacked in {}",
                config.kafka_version,
                config.install_dir.display()
            );
            return Ok(());
        }

        let url = config.download_url();
        let tarball = config.state_dir.join(config.tarball_name());

        let digest = retry_with_backoff(&config.retry.policy(), "distribution download", || {
            self.download(&url, &tarball)
        })
        .await?;

        if let Some(expected) = &config.distribution_sha512 {
            if !expected.eq_ignore_ascii_case(&digest) {
                return Err(Error::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: digest,
                });
            }
        }

        run(
            "tar",
            &[
                "-xzf",
                &tarball.display().to_string(),
                "--strip-components=1",
                "-C",
                &config.install_dir.display().to_string(),
            ],
        )
        .await?;

        write_atomic(
            &config.install_dir.join(VERSION_MARKER),
            &config.kafka_version,
        )?;
        tokio::fs::remove_file(&tarball).await?;

        let owner = format!("{0}:{0}", config.service_user);
        run(
            "chown",
            &["-R", &owner, &config.install_dir.display().to_string()],
        )
        .await?;
        Ok(())
    }

    async fn write_owned_file(&self, path: &Path, contents: &str, user: &str) -> Result<()> {
        write_atomic(path, contents)?;
        let owner = format!("{0}:{0}", user);
        run("chown", &[&owner, &path.display().to_string()]).await?;
        Ok(())
    }

    async fn install_unit(&self, name: &str, contents: &str) -> Result<()> {
        write_atomic(&Path::new(UNIT_DIR).join(name), contents)?;
        run("systemctl", &["daemon-reload"]).await?;
        run("systemctl", &["enable", name]).await?;
        Ok(())
    }

    async fn start_service(&self, name: &str) -> Result<()> {
        run("systemctl", &["start", name]).await?;
        Ok(())
    }

    async fn format_storage(&self, config: &BootstrapConfig, cluster_id: &str) -> Result<()> {
        let tool = config.install_dir.join("bin/kafka-storage.sh");
        run(
            &tool.display().to_string(),
            &[
                "format",
                "-t",
                cluster_id,
                "-c",
                &config.server_config_path.display().to_string(),
            ],
        )
        .await?;

        // the format tool runs as root; hand the metadata log back to the
        // service user before the broker starts
        let owner = format!("{0}:{0}", config.service_user);
        run(
            "chown",
            &["-R", &owner, &config.data_dir.display().to_string()],
        )
        .await?;
        Ok(())
    }
}
