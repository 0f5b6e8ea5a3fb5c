//! 配置管理命令
//!
//! 默认连接字符串与波特率保存在 TOML 文件中，`connect` 的命令行参数可以覆盖它们。

use anyhow::{Context, Result};
use clap::Subcommand;
use pcanlink_driver::SessionConfig;
use pcanlink_protocol::bitrate::require_kbps;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Could not determine config directory")?;
    path.push("pcanlink");
    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 连接字符串 `<netname> <rxid> <txid>`
    pub connection: Option<String>,

    /// 波特率（kbit/s），0 或缺省表示不修改
    pub bitrate: Option<u32>,

    /// 向驱动注册的客户端名称
    pub client_name: Option<String>,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// 保存配置
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, format!("# pcanlink CLI configuration\n\n{content}"))
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// 校验连接字符串与波特率
    pub fn validate(&self) -> Result<Option<SessionConfig>> {
        let bitrate = self.bitrate.unwrap_or(0);
        if bitrate != 0 {
            require_kbps(bitrate)?;
        }
        self.connection
            .as_deref()
            .map(|line| SessionConfig::parse(line, bitrate))
            .transpose()
            .context("Invalid connection string")
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 连接字符串（如 "PCAN_USB 0x7E8 0x7E0"）
        #[arg(short, long)]
        connection: Option<String>,

        /// 波特率（kbit/s，0 = 不修改）
        #[arg(short, long)]
        bitrate: Option<u32>,

        /// 客户端名称
        #[arg(long)]
        client_name: Option<String>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（connection / bitrate / client_name / all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                connection,
                bitrate,
                client_name,
            } => Self::set_(path, connection, bitrate, client_name),

            ConfigCommand::Get { key } => Self::get_(path, &key),

            ConfigCommand::Check => Self::check_(path),
        }
    }

    fn set_(
        path: &Path,
        connection: Option<String>,
        bitrate: Option<u32>,
        client_name: Option<String>,
    ) -> Result<()> {
        let mut config = CliConfig::load(path)?;

        if let Some(connection) = connection {
            SessionConfig::parse(&connection, 0).context("Invalid connection string")?;
            println!("connection = {}", connection);
            config.connection = Some(connection);
        }

        if let Some(bitrate) = bitrate {
            if bitrate != 0 {
                require_kbps(bitrate)?;
            }
            println!("bitrate = {}", bitrate);
            config.bitrate = Some(bitrate);
        }

        if let Some(name) = client_name {
            println!("client_name = {}", name);
            config.client_name = Some(name);
        }

        config.save(path)
    }

    fn get_(path: &Path, key: &str) -> Result<()> {
        let config = CliConfig::load(path)?;
        let unset = || "(unset)".to_string();

        match key {
            "connection" => println!("{}", config.connection.unwrap_or_else(unset)),
            "bitrate" => println!(
                "{}",
                config.bitrate.map(|b| b.to_string()).unwrap_or_else(unset)
            ),
            "client_name" => println!("{}", config.client_name.unwrap_or_else(unset)),
            _ => {
                println!("connection  = {:?}", config.connection);
                println!("bitrate     = {:?}", config.bitrate);
                println!("client_name = {:?}", config.client_name);
            },
        }
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        let config = CliConfig::load(path)?;
        println!("Config file: {}", path.display());

        match config.validate()? {
            Some(session) => {
                println!("  network: {}", session.net_name);
                println!("  RX-id:   {}", session.rx_id);
                println!("  TX-id:   {}", session.tx_id);
                println!("  bitrate: {}", session.bitrate_kbps);
            },
            None => println!("  no connection configured"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = CliConfig {
            connection: Some("PCAN_USB 0x7E8 0x7E0".to_string()),
            bitrate: Some(500),
            client_name: None,
        };
        config.save(&path).unwrap();
        assert_eq!(CliConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate() {
        let config = CliConfig {
            connection: Some("CAN_A,0x100,0x200".to_string()),
            bitrate: Some(125),
            client_name: None,
        };
        let session = config.validate().unwrap().unwrap();
        assert_eq!(session.bitrate_kbps, 125);
        assert_eq!(session.tx_id.raw(), 0x200);

        let bad_rate = CliConfig {
            bitrate: Some(333),
            ..config.clone()
        };
        assert!(bad_rate.validate().is_err());

        let bad_line = CliConfig {
            connection: Some("CAN_A".to_string()),
            ..config
        };
        assert!(bad_line.validate().is_err());

        assert!(CliConfig::default().validate().unwrap().is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "bitrate = \"fast\"").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }
}
