//! PatchPlan：一次批量更新的完整配置（输入、输出、查找表、追加记录、排序）
//!
//! 计划文件为JSON；相对路径以计划文件所在目录为基准解析

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::document::{PatchError, ROOT_PATH};
use crate::model::record::{
    str_field, Record, DEFAULT_ID_FIELD, DEFAULT_NAME_FIELD, DEFAULT_TARGET_FIELD,
};
use crate::model::updater::{FieldUpdater, UpdateSource};
use crate::utils::fs::read_json_as;

fn default_records_path() -> String {
    ROOT_PATH.to_string()
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn default_name_field() -> String {
    DEFAULT_NAME_FIELD.to_string()
}

fn default_field() -> String {
    DEFAULT_TARGET_FIELD.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchPlan {
    /// 输入文档
    pub input: PathBuf,
    /// 输出文档（镜像副本）；为空时写回输入文件
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    /// 门店数组在文档中的 JSONPath
    #[serde(default = "default_records_path")]
    pub records_path: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// 仅用于审计输出
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// 被更新的字段
    #[serde(default = "default_field")]
    pub field: String,
    pub updates: UpdateSource,
    #[serde(default)]
    pub new_records: BTreeMap<String, Record>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl PatchPlan {
    /// 读取计划文件，解析相对路径并校验
    pub fn load(path: &Path) -> Result<Self, PatchError> {
        let mut plan: PatchPlan = read_json_as(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        plan.resolve_paths(base);
        plan.validate()?;
        tracing::info!(
            "已加载更新计划: {}（字段 {}，{} 个输出）",
            path.display(),
            plan.field,
            plan.outputs.len()
        );
        Ok(plan)
    }

    /// 相对路径拼接到 base；未配置输出时写回输入文件
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| if p.is_relative() { base.join(p) } else { p.to_path_buf() };
        self.input = resolve(self.input.as_path());
        if self.outputs.is_empty() {
            self.outputs.push(self.input.clone());
        } else {
            self.outputs = self.outputs.iter().map(|p| resolve(p.as_path())).collect();
        }
    }

    pub fn validate(&self) -> Result<(), PatchError> {
        if self.field.trim().is_empty() {
            return Err(PatchError::Config("field 不能为空".into()));
        }
        if self.id_field.trim().is_empty() {
            return Err(PatchError::Config("id_field 不能为空".into()));
        }
        if self.records_path.trim().is_empty() {
            return Err(PatchError::Config("records_path 不能为空".into()));
        }
        if let Some(key) = &self.sort_by {
            if key.trim().is_empty() {
                return Err(PatchError::Config("sort_by 不能为空字符串".into()));
            }
        }
        for (store_id, record) in &self.new_records {
            if str_field(record, &self.id_field) != Some(store_id.as_str()) {
                return Err(PatchError::Config(format!(
                    "新记录 {} 的 {} 字段必须与键一致",
                    store_id, self.id_field
                )));
            }
        }
        Ok(())
    }

    /// 按计划构建 FieldUpdater
    pub fn updater(&self) -> FieldUpdater {
        let updater = FieldUpdater::new(self.field.clone(), self.updates.clone())
            .with_id_field(self.id_field.clone())
            .with_name_field(self.name_field.clone())
            .with_new_records(self.new_records.clone());
        match &self.sort_by {
            Some(key) => updater.sorted_by(key.clone()),
            None => updater,
        }
    }
}
