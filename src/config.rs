//! 配置模块，负责加载JSON配置文件
//!
//! ```json
//! { "table": "issues", "dialect": "postgres",
//!   "columns": { "status": "issue_status" },
//!   "allow_fields": ["status", "priority"] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::Filter;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// SQL 方言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

/// 编译器配置，所有字段均可省略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// 查询的表名
    pub table: String,
    pub dialect: Dialect,
    /// 字段名到数据库列名的映射
    pub columns: HashMap<String, String>,
    /// 允许过滤的字段，缺省时不限制
    pub allow_fields: Option<Vec<String>>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            table: "items".to_string(),
            dialect: Dialect::default(),
            columns: HashMap::new(),
            allow_fields: None,
        }
    }
}

impl CompilerConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), table = %config.table, "config loaded");
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// 获取字段对应的列名，没有映射时返回字段名本身
    pub fn column_name(&self, field: &str) -> String {
        self.columns
            .get(field)
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }

    /// 按 `allow_fields` 创建过滤器
    pub fn new_filter(&self) -> Filter {
        match &self.allow_fields {
            Some(fields) => Filter::with_allowed_fields(fields.iter().cloned()),
            None => Filter::new(),
        }
    }
}
