//! Proxy configuration and its JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::routing::InterfaceNames;

/// Default SOCKS5 listen port.
pub const DEFAULT_PORT: u16 = 1080;

/// Name of the configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".smart-proxy";

/// Configuration file name inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Blocklist file name inside the configuration directory.
pub const BLOCKLIST_FILE_NAME: &str = "gfwlist.txt";

/// Proxy configuration.
///
/// Field names on disk match the control panel's JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Local SOCKS5 port (listens on 127.0.0.1)
    pub port: u16,
    /// Interface for IP literals and unclassified domains
    #[serde(rename = "defaultIface")]
    pub default_interface: String,
    /// Interface for blocklisted domains; empty means unbound
    #[serde(rename = "gfwIface")]
    pub blocklist_interface: String,
    /// Interface for company domains; empty disables company routing
    #[serde(rename = "companyIface")]
    pub company_interface: String,
    /// Blocklist URL or file path (`@` prefix forces a path)
    #[serde(rename = "gfwlistUrl")]
    pub blocklist_source: String,
    /// Domains routed through the company interface
    #[serde(rename = "companyDomains")]
    pub company_domains: Vec<String>,
    /// Domains treated as blocklisted in addition to the list
    #[serde(rename = "extraGfwDomains")]
    pub extra_blocklist_domains: Vec<String>,
    /// Start the proxy when the program launches
    #[serde(rename = "autoStart")]
    pub auto_start: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_interface: default_interface_name().to_string(),
            blocklist_interface: String::new(),
            company_interface: String::new(),
            blocklist_source: BLOCKLIST_FILE_NAME.to_string(),
            company_domains: Vec::new(),
            extra_blocklist_domains: Vec::new(),
            auto_start: true,
        }
    }
}

impl ProxyConfig {
    /// The three logical interface names.
    pub fn interface_names(&self) -> InterfaceNames {
        InterfaceNames {
            default: self.default_interface.clone(),
            blocklist: self.blocklist_interface.clone(),
            company: self.company_interface.clone(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        for name in [
            &self.default_interface,
            &self.blocklist_interface,
            &self.company_interface,
        ] {
            if name.chars().any(char::is_whitespace) {
                return Err(Error::config(format!("invalid interface name {:?}", name)));
            }
        }

        for domain in self
            .company_domains
            .iter()
            .chain(self.extra_blocklist_domains.iter())
        {
            let domain = domain.trim();
            if domain.chars().any(char::is_whitespace) {
                return Err(Error::config(format!("invalid domain {:?}", domain)));
            }
        }

        Ok(())
    }
}

/// Interface name used when nothing is configured.
fn default_interface_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "en0"
    } else {
        "eth0"
    }
}

/// `~/.smart-proxy`, if a home directory is known.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(CONFIG_DIR_NAME))
}

/// A configuration file on disk.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Bind to `path`; nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the file; relative blocklist paths resolve here.
    pub fn dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and parse the file. Missing fields take defaults.
    pub fn load(&self) -> Result<ProxyConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write `config` as pretty JSON, creating the directory if needed.
    pub fn save(&self, config: &ProxyConfig) -> Result<()> {
        if let Some(dir) = self.dir() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 1080);
        assert!(config.auto_start);
        assert!(config.company_interface.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_field_names() {
        let json = r#"{
            "port": 7890,
            "defaultIface": "en0",
            "gfwIface": "utun4",
            "companyIface": "utun7",
            "gfwlistUrl": "https://example.com/gfwlist.txt",
            "companyDomains": ["corp.example"],
            "extraGfwDomains": ["gvt2.com"],
            "autoStart": false
        }"#;

        let config: ProxyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 7890);
        assert_eq!(config.blocklist_interface, "utun4");
        assert_eq!(config.company_interface, "utun7");
        assert_eq!(config.company_domains, vec!["corp.example"]);
        assert_eq!(config.extra_blocklist_domains, vec!["gvt2.com"]);
        assert!(!config.auto_start);

        let names = config.interface_names();
        assert_eq!(names.default, "en0");
        assert_eq!(names.blocklist, "utun4");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: ProxyConfig = serde_json::from_str(r#"{"port": 2080}"#).unwrap();
        assert_eq!(config.port, 2080);
        assert_eq!(config.blocklist_source, BLOCKLIST_FILE_NAME);
        assert!(config.auto_start);
    }

    #[test]
    fn test_validation() {
        let mut config = ProxyConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = ProxyConfig::default();
        config.company_domains.push("bad domain".into());
        assert!(config.validate().is_err());

        let mut config = ProxyConfig::default();
        config.blocklist_interface = "utun 4".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_domain_entries_accepted() {
        let json = r#"{"companyDomains": ["corp.example", ""], "extraGfwDomains": ["  "]}"#;
        let config: ProxyConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::new(dir.path().join("nested").join(CONFIG_FILE_NAME));
        assert!(!file.exists());

        let mut config = ProxyConfig::default();
        config.company_interface = "utun7".into();
        config.company_domains = vec!["corp.example".into()];
        file.save(&config).unwrap();

        assert!(file.exists());
        assert_eq!(file.dir(), Some(dir.path().join("nested").as_path()));
        assert_eq!(file.load().unwrap(), config);

        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"companyIface\": \"utun7\""));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        let err = ConfigFile::new(path).load().unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
