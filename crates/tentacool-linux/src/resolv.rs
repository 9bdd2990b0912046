//! # Resolver Configuration
//!
//! Reads and writes resolv.conf.
//!
//! ## resolvconf
//!
//! When /etc/resolv.conf is a symlink and `resolvconf --updates-are-enabled`
//! succeeds, the file is generated. The declaration then goes to the
//! resolvconf base file and `resolvconf -u` regenerates resolv.conf.
//!
//! ## Format
//!
//! ```text
//! nameserver 192.168.1.1
//! nameserver 1.1.1.1
//! search lan example.com
//! options ndots:2 timeout:3 attempts:4 rotate
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use tentacool_core::records::DnsConfig;
use tentacool_core::traits::SystemAdapter;
use tentacool_core::{Error, Result};

use crate::command::{self, args};

const ADAPTER: &str = "resolv.conf";

/// Parse resolv.conf content
///
/// Unknown lines and options are ignored. `domain` sets a single-entry
/// search list, and the last `domain`/`search` line wins.
pub fn parse(content: &str) -> DnsConfig {
    let mut config = DnsConfig::default();

    for line in content.lines() {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            continue;
        };

        match keyword {
            "nameserver" => {
                if let Some(server) = words.next() {
                    config.servers.push(server.to_string());
                }
            }
            "domain" => {
                config.search = words.next().map(|d| vec![d.to_string()]).unwrap_or_default();
            }
            "search" => {
                config.search = words.map(str::to_string).collect();
            }
            "options" => {
                for option in words {
                    if let Some(v) = option.strip_prefix("ndots:") {
                        config.ndots = v.parse().unwrap_or(0);
                    } else if let Some(v) = option.strip_prefix("timeout:") {
                        config.timeout = v.parse().unwrap_or(0);
                    } else if let Some(v) = option.strip_prefix("attempts:") {
                        config.attempts = v.parse().unwrap_or(0);
                    } else if option == "rotate" {
                        config.rotate = true;
                    }
                }
            }
            _ => {}
        }
    }

    config
}

/// Render a configuration as resolv.conf content
pub fn render(config: &DnsConfig) -> String {
    let mut out = String::from("# Generated by tentacool\n");

    for server in &config.servers {
        out.push_str(&format!("nameserver {}\n", server));
    }
    if !config.search.is_empty() {
        out.push_str(&format!("search {}\n", config.search.join(" ")));
    }
    if config.has_options() {
        let mut line = String::from("options");
        if config.ndots != 0 {
            line.push_str(&format!(" ndots:{}", config.ndots));
        }
        if config.timeout != 0 {
            line.push_str(&format!(" timeout:{}", config.timeout));
        }
        if config.attempts != 0 {
            line.push_str(&format!(" attempts:{}", config.attempts));
        }
        if config.rotate {
            line.push_str(" rotate");
        }
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Writes resolver configuration to resolv.conf (or through resolvconf)
#[derive(Debug, Clone)]
pub struct ResolvConfAdapter {
    resolv_conf: PathBuf,
    resolvconf_base: PathBuf,
    resolvconf: PathBuf,
}

impl ResolvConfAdapter {
    /// Create an adapter for `resolv_conf`
    ///
    /// `resolvconf_base` and `resolvconf` are used only when resolv.conf
    /// turns out to be managed by resolvconf.
    pub fn new(
        resolv_conf: impl Into<PathBuf>,
        resolvconf_base: impl Into<PathBuf>,
        resolvconf: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolv_conf: resolv_conf.into(),
            resolvconf_base: resolvconf_base.into(),
            resolvconf: resolvconf.into(),
        }
    }

    /// Whether resolv.conf is generated by resolvconf
    async fn managed_by_resolvconf(&self) -> bool {
        let is_symlink = fs::symlink_metadata(&self.resolv_conf)
            .await
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            return false;
        }

        command::run(&self.resolvconf, &args(["--updates-are-enabled"]))
            .await
            .is_ok()
    }

    async fn write(path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).await.map_err(|e| {
            Error::system_apply(ADAPTER, format!("failed to write {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl SystemAdapter<DnsConfig> for ResolvConfAdapter {
    async fn apply(&self, config: &DnsConfig) -> Result<()> {
        let content = render(config);

        if self.managed_by_resolvconf().await {
            info!(
                "Writing resolver configuration to {}",
                self.resolvconf_base.display()
            );
            Self::write(&self.resolvconf_base, &content).await?;
            command::run(&self.resolvconf, &args(["-u"]))
                .await
                .map_err(|e| e.into_apply_error(ADAPTER))?;
            return Ok(());
        }

        info!(
            "Writing resolver configuration to {}",
            self.resolv_conf.display()
        );
        Self::write(&self.resolv_conf, &content).await
    }

    async fn remove(&self, _config: &DnsConfig) -> Result<()> {
        // Every apply rewrites the whole file
        Ok(())
    }

    async fn read_live(&self) -> Result<Option<DnsConfig>> {
        match fs::read_to_string(&self.resolv_conf).await {
            Ok(content) => Ok(Some(parse(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist", self.resolv_conf.display());
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to read {}: {}", self.resolv_conf.display(), e);
                Err(Error::system_apply(
                    ADAPTER,
                    format!("failed to read {}: {}", self.resolv_conf.display(), e),
                ))
            }
        }
    }

    fn adapter_name(&self) -> &'static str {
        ADAPTER
    }
}
