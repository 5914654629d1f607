//! StoreDocument：门店JSON文档的加载、门店数组定位（JSONPath）与回写

use std::path::{Path, PathBuf};

use jsonpath_rust::{JsonPath, query::queryable::Queryable}; // 提供 query/query_only_path/reference_mut 等扩展
use serde_json::Value;
use thiserror::Error;

use crate::model::record::Record;
use crate::utils::fs::{read_json_file, write_json_file};

/// 文档根节点即门店数组
pub const ROOT_PATH: &str = "$";

#[derive(Debug, Default)]
pub struct StoreDocument {
    pub source_path: Option<PathBuf>,
    pub dom: Option<Value>,
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("JSONPath错误: {0}")]
    JsonPath(String),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("状态错误: {0}")]
    State(String),
    #[error("严格模式：{0} 条映射未能解析，未写出任何文件")]
    MappingMiss(usize),
}

impl StoreDocument {
    /// 加载JSON文件
    pub fn load_file(&mut self, p: &Path) -> Result<(), PatchError> {
        let dom = read_json_file(p)?;
        self.source_path = Some(p.to_path_buf());
        self.dom = Some(dom);
        tracing::info!("已加载门店文档: {}", p.display());
        Ok(())
    }

    /// 按 records_path 取出门店数组（拷贝），每一项必须是对象
    pub fn records(&self, records_path: &str) -> Result<Vec<Record>, PatchError> {
        let dom = self
            .dom
            .as_ref()
            .ok_or_else(|| PatchError::State("DOM尚未加载".into()))?;
        let hits: Vec<&Value> = dom
            .query(records_path)
            .map_err(|e| PatchError::JsonPath(e.to_string()))?;
        let first = hits
            .into_iter()
            .next()
            .ok_or_else(|| PatchError::JsonPath(format!("未匹配到门店数组: {}", records_path)))?;
        let items = first
            .as_array()
            .ok_or_else(|| PatchError::State(format!("{} 不是数组", records_path)))?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| PatchError::State(format!("第 {} 项不是对象", i)))
            })
            .collect()
    }

    /// 将更新后的门店数组写回 records_path 所在位置
    pub fn replace_records(&mut self, records_path: &str, records: Vec<Record>) -> Result<(), PatchError> {
        let dom = self
            .dom
            .as_mut()
            .ok_or_else(|| PatchError::State("DOM尚未加载".into()))?;
        let slot = Self::records_slot(dom, records_path)?;
        if !slot.is_array() {
            return Err(PatchError::State(format!("{} 不是数组", records_path)));
        }
        *slot = Value::Array(records.into_iter().map(Value::Object).collect());
        Ok(())
    }

    // 通过 reference_mut 按路径获取可变引用；根路径直接返回
    fn records_slot<'a>(dom: &'a mut Value, records_path: &str) -> Result<&'a mut Value, PatchError> {
        if records_path.trim() == ROOT_PATH {
            return Ok(dom);
        }
        let paths: Vec<String> = dom
            .query_only_path(records_path)
            .map_err(|e| PatchError::JsonPath(e.to_string()))?;
        let Some(p) = paths.into_iter().next() else {
            return Err(PatchError::JsonPath(format!("未匹配到门店数组: {}", records_path)));
        };
        dom.reference_mut(&p)
            .ok_or_else(|| PatchError::JsonPath(format!("路径不可更新: {}", p)))
    }

    /// 将当前DOM保存到指定路径
    pub fn save_to_file(&self, path: &Path) -> Result<(), PatchError> {
        let dom = self
            .dom
            .as_ref()
            .ok_or_else(|| PatchError::State("DOM尚未加载".into()))?;
        write_json_file(path, dom)?;
        tracing::info!("JSON文件已保存到: {}", path.display());
        Ok(())
    }

    /// 依次保存到多个路径；中途失败时之前的文件已被覆盖，不回滚
    pub fn save_to_files(&self, paths: &[PathBuf]) -> Result<(), PatchError> {
        for path in paths {
            self.save_to_file(path)?;
        }
        Ok(())
    }
}
