//! 更新报告：记录每一次计数的变更与每一次跳过，供调用方打印审计日志

use std::fmt;

/// 一次被计数的变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// 已有记录的目标字段被修改
    Updated {
        store_id: String,
        store_name: String,
        old: String,
        new: String,
        /// 两级解析时的中间人名
        via: Option<String>,
    },
    /// 新记录被追加
    Added {
        store_id: String,
        store_name: String,
        field: String,
        value: String,
    },
}

/// 一次跳过（不计数、不报错）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipEvent {
    /// 记录缺少标识字段
    MissingId { index: usize },
    /// 人名在第二级映射中不存在
    UnresolvedName { store_id: String, name: String },
    /// 更新表中的标识在集合中不存在
    UnknownStore { store_id: String },
    /// 新记录的标识字段与键不一致，未追加
    InvalidNewRecord { store_id: String },
}

impl SkipEvent {
    /// 是否属于数据映射问题（严格模式下视为失败）
    pub fn is_mapping_miss(&self) -> bool {
        !matches!(self, SkipEvent::MissingId { .. })
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::Updated { store_id, store_name, old, new, via: None } => {
                write!(f, "Updated {} ({}): {} -> {}", store_id, store_name, old, new)
            }
            ChangeEvent::Updated { store_id, store_name, old, new, via: Some(name) } => {
                write!(f, "Updated {} ({}): {} -> {} ({})", store_id, store_name, old, new, name)
            }
            ChangeEvent::Added { store_id, store_name, field, value } => {
                write!(f, "Added new store: {} ({}) with {} {}", store_id, store_name, field, value)
            }
        }
    }
}

impl fmt::Display for SkipEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipEvent::MissingId { index } => write!(f, "record #{} has no identifier, skipped", index),
            SkipEvent::UnresolvedName { store_id, name } => {
                write!(f, "{}: name '{}' has no id mapping, skipped", store_id, name)
            }
            SkipEvent::UnknownStore { store_id } => {
                write!(f, "{}: not present in collection, ignored", store_id)
            }
            SkipEvent::InvalidNewRecord { store_id } => {
                write!(f, "{}: new record identifier does not match its key, not appended", store_id)
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UpdateReport {
    pub changes: Vec<ChangeEvent>,
    pub skipped: Vec<SkipEvent>,
    /// 变更完成后的记录总数
    pub total_records: usize,
}

impl UpdateReport {
    /// 总变更数（修改 + 追加）
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn updated_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ChangeEvent::Updated { .. }))
            .count()
    }

    pub fn added_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ChangeEvent::Added { .. }))
            .count()
    }

    /// 映射问题数量（未解析人名、未知门店、无效新记录）
    pub fn mapping_misses(&self) -> usize {
        self.skipped.iter().filter(|s| s.is_mapping_miss()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_line_format() {
        let direct = ChangeEvent::Updated {
            store_id: "S040".into(),
            store_name: "Connaught Place".into(),
            old: "H955".into(),
            new: "h1105".into(),
            via: None,
        };
        assert_eq!(direct.to_string(), "Updated S040 (Connaught Place): H955 -> h1105");

        let two_stage = ChangeEvent::Updated {
            store_id: "S040".into(),
            store_name: "Connaught Place".into(),
            old: "null".into(),
            new: "H955".into(),
            via: Some("Himanshu".into()),
        };
        assert_eq!(two_stage.to_string(), "Updated S040 (Connaught Place): null -> H955 (Himanshu)");
    }

    #[test]
    fn test_added_line_format() {
        let added = ChangeEvent::Added {
            store_id: "S219".into(),
            store_name: "Pune Camp".into(),
            field: "AM".into(),
            value: "H3914".into(),
        };
        assert_eq!(added.to_string(), "Added new store: S219 (Pune Camp) with AM H3914");
    }

    #[test]
    fn test_report_counts() {
        let report = UpdateReport {
            changes: vec![
                ChangeEvent::Added {
                    store_id: "S1".into(),
                    store_name: String::new(),
                    field: "AM".into(),
                    value: "H1".into(),
                },
                ChangeEvent::Updated {
                    store_id: "S2".into(),
                    store_name: String::new(),
                    old: "H1".into(),
                    new: "H2".into(),
                    via: None,
                },
            ],
            skipped: vec![
                SkipEvent::MissingId { index: 4 },
                SkipEvent::UnknownStore { store_id: "S9".into() },
            ],
            total_records: 5,
        };
        assert_eq!(report.change_count(), 2);
        assert_eq!(report.updated_count(), 1);
        assert_eq!(report.added_count(), 1);
        assert_eq!(report.mapping_misses(), 1, "缺少标识不算映射问题");
    }
}
