//! 统一配置管理
//!
//! 提供 [`Config`] trait 以及仿真器配置 [`SimConfig`]。

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_MSR;
use crate::error::ConfigError;
use crate::svstate::SvState;

/// 统一配置 Trait
///
/// # 示例
///
/// ```rust,ignore
/// use svsim_core::config::{Config, SimConfig};
///
/// let base = SimConfig::defaults();
/// let file = SimConfig::from_toml("xlen = 32\ninitial_pc = 0x1000")?;
/// let config = base.merge(&file)?;
/// ```
pub trait Config: Serialize + serde::de::DeserializeOwned {
    /// 验证配置的有效性
    ///
    /// # 错误
    ///
    /// 如果配置无效，返回 `ConfigError::Invalid`
    fn validate(&self) -> Result<(), ConfigError>;

    /// 获取默认配置
    fn defaults() -> Self;

    /// 合并两个配置，`other` 优先级更高
    ///
    /// # 参数
    ///
    /// * `other` - 优先级更高的配置
    ///
    /// # 错误
    ///
    /// 合并结果无效时返回 `ConfigError::MergeConflict`
    fn merge(&self, other: &Self) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// 从 TOML 字符串加载配置
    fn from_toml(toml: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))
    }

    /// 从 JSON 字符串加载配置
    fn from_json(json: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e)))
    }

    /// 将配置序列化为 TOML
    fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("TOML serialize error: {}", e)))
    }

    /// 将配置序列化为 JSON
    fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("JSON serialize error: {}", e)))
    }
}

/// 64 位寄存器值以十六进制字符串保存，TOML 整数只有 63 位
mod hex_u64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{:#x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Int(v) => Ok(v),
            Raw::Str(s) => {
                let t = s.trim();
                let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
                    None => t.replace('_', "").parse(),
                };
                parsed.map_err(|e| D::Error::custom(format!("invalid register value {:?}: {}", s, e)))
            }
        }
    }
}

/// 仿真器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// 复位后的 MSR，默认特权态、64 位、小端
    #[serde(with = "hex_u64")]
    pub initial_msr: u64,
    #[serde(with = "hex_u64")]
    pub initial_svstate: u64,
    #[serde(with = "hex_u64")]
    pub initial_pc: u64,
    /// 异常向量重定位基址
    #[serde(with = "hex_u64")]
    pub kaivb: u64,
    /// 标量寄存器宽度，32 或 64
    pub xlen: u32,
    /// 每条退休指令输出一行 info 日志
    pub trace_instructions: bool,
    /// 参考内存允许未对齐访问
    pub misaligned_ok: bool,
    /// 调试用：跳过特权检查
    pub allow_privileged: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_msr: DEFAULT_MSR,
            initial_svstate: 0,
            initial_pc: 0,
            kaivb: 0,
            xlen: 64,
            trace_instructions: false,
            misaligned_ok: false,
            allow_privileged: false,
        }
    }
}

impl Config for SimConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.xlen != 32 && self.xlen != 64 {
            return Err(ConfigError::Invalid(format!(
                "xlen must be 32 or 64, got {}",
                self.xlen
            )));
        }
        if !self.initial_pc.is_multiple_of(4) {
            return Err(ConfigError::Invalid(format!(
                "initial_pc {:#x} is not word aligned",
                self.initial_pc
            )));
        }
        let sv = SvState::from_u64(self.initial_svstate);
        if sv.vl > sv.maxvl {
            return Err(ConfigError::Invalid(format!(
                "initial SVSTATE has vl {} > maxvl {}",
                sv.vl, sv.maxvl
            )));
        }
        Ok(())
    }

    fn defaults() -> Self {
        Self::default()
    }

    fn merge(&self, other: &Self) -> Result<Self, ConfigError> {
        let merged = Self {
            trace_instructions: self.trace_instructions || other.trace_instructions,
            ..other.clone()
        };
        merged
            .validate()
            .map_err(|e| ConfigError::MergeConflict(e.to_string()))?;
        Ok(merged)
    }
}
