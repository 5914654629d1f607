//! FieldUpdater：按标识批量更新单个字段，可选追加新记录并按键稳定排序
//!
//! 纯内存操作，不做任何IO；所有查找表都由调用方显式传入

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

use crate::model::record::{
    display_value, str_field, sort_key, Record, DEFAULT_ID_FIELD, DEFAULT_NAME_FIELD,
};
use crate::model::report::{ChangeEvent, SkipEvent, UpdateReport};

/// 新值来源；配置中写作 `{"direct": {...}}` 或 `{"two_stage": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    /// 标识 -> 新值
    Direct(BTreeMap<String, String>),
    /// 标识 -> 人名，人名 -> 人员编号
    TwoStage {
        assignments: BTreeMap<String, String>,
        ids: BTreeMap<String, String>,
    },
}

/// 单条记录的解析结果
#[derive(Debug, PartialEq, Eq)]
enum Resolution<'a> {
    NotListed,
    Resolved { value: &'a str, via: Option<&'a str> },
    Unresolved { name: &'a str },
}

impl UpdateSource {
    fn resolve(&self, store_id: &str) -> Resolution<'_> {
        match self {
            UpdateSource::Direct(map) => match map.get(store_id) {
                Some(value) => Resolution::Resolved { value: value.as_str(), via: None },
                None => Resolution::NotListed,
            },
            UpdateSource::TwoStage { assignments, ids } => {
                let Some(name) = assignments.get(store_id) else {
                    return Resolution::NotListed;
                };
                match ids.get(name) {
                    Some(value) => Resolution::Resolved {
                        value: value.as_str(),
                        via: Some(name.as_str()),
                    },
                    None => Resolution::Unresolved { name: name.as_str() },
                }
            }
        }
    }

    /// 更新表中出现的全部标识
    fn store_ids(&self) -> impl Iterator<Item = &String> {
        match self {
            UpdateSource::Direct(map) => map.keys(),
            UpdateSource::TwoStage { assignments, .. } => assignments.keys(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldUpdater {
    field: String,
    id_field: String,
    name_field: String,
    source: UpdateSource,
    new_records: BTreeMap<String, Record>,
    sort_by: Option<String>,
}

impl FieldUpdater {
    pub fn new(field: impl Into<String>, source: UpdateSource) -> Self {
        Self {
            field: field.into(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            name_field: DEFAULT_NAME_FIELD.to_string(),
            source,
            new_records: BTreeMap::new(),
            sort_by: None,
        }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_name_field(mut self, name_field: impl Into<String>) -> Self {
        self.name_field = name_field.into();
        self
    }

    /// 追加集合中尚不存在的记录（按标识判断）
    ///
    /// 每条记录的标识字段必须等于其键，否则 `apply` 时不追加并记为跳过
    pub fn with_new_records(mut self, new_records: BTreeMap<String, Record>) -> Self {
        self.new_records = new_records;
        self
    }

    /// 全部变更完成后按该字段稳定排序
    pub fn sorted_by(mut self, key: impl Into<String>) -> Self {
        self.sort_by = Some(key.into());
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// 对集合执行一次批量更新，返回变更与跳过的明细
    pub fn apply(&self, records: &mut Vec<Record>) -> UpdateReport {
        let mut report = UpdateReport::default();
        let mut present: HashSet<String> = HashSet::with_capacity(records.len());

        for (index, record) in records.iter_mut().enumerate() {
            let Some(store_id) = str_field(record, &self.id_field).map(str::to_owned) else {
                report.skipped.push(SkipEvent::MissingId { index });
                continue;
            };

            match self.source.resolve(&store_id) {
                Resolution::NotListed => {}
                Resolution::Unresolved { name } => {
                    tracing::warn!("{} 的人名 {} 无对应编号，已跳过", store_id, name);
                    report.skipped.push(SkipEvent::UnresolvedName {
                        store_id: store_id.clone(),
                        name: name.to_string(),
                    });
                }
                Resolution::Resolved { value, via } => {
                    let new_value = Value::String(value.to_string());
                    if record.get(&self.field) != Some(&new_value) {
                        let store_name = str_field(record, &self.name_field).unwrap_or("").to_string();
                        let old = record.insert(self.field.clone(), new_value);
                        report.changes.push(ChangeEvent::Updated {
                            store_id: store_id.clone(),
                            store_name,
                            old: display_value(old.as_ref()),
                            new: value.to_string(),
                            via: via.map(str::to_owned),
                        });
                    }
                }
            }

            present.insert(store_id);
        }

        // 由 new_records 补上的门店不算未知
        for store_id in self.source.store_ids() {
            if !present.contains(store_id) && !self.new_records.contains_key(store_id) {
                report.skipped.push(SkipEvent::UnknownStore { store_id: store_id.clone() });
            }
        }

        for (store_id, record) in &self.new_records {
            if str_field(record, &self.id_field) != Some(store_id.as_str()) {
                tracing::warn!("新记录 {} 的 {} 字段与键不一致，未追加", store_id, self.id_field);
                report.skipped.push(SkipEvent::InvalidNewRecord { store_id: store_id.clone() });
                continue;
            }
            if present.contains(store_id) {
                tracing::debug!("{} 已存在，不重复追加", store_id);
                continue;
            }
            report.changes.push(ChangeEvent::Added {
                store_id: store_id.clone(),
                store_name: str_field(record, &self.name_field).unwrap_or("").to_string(),
                field: self.field.clone(),
                value: display_value(record.get(&self.field)),
            });
            records.push(record.clone());
            present.insert(store_id.clone());
        }

        if let Some(key) = &self.sort_by {
            // sort_by 为稳定排序，相同键保持原有相对顺序
            records.sort_by(|a, b| sort_key(a, key).cmp(sort_key(b, key)));
        }

        report.total_records = records.len();
        tracing::info!(
            "批量更新完成：修改 {} 条，追加 {} 条，跳过 {} 条，共 {} 条记录",
            report.updated_count(),
            report.added_count(),
            report.skipped.len(),
            report.total_records
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(v: Value) -> Vec<Record> {
        serde_json::from_value(v).expect("测试数据必须是对象数组")
    }

    fn direct(pairs: &[(&str, &str)]) -> UpdateSource {
        UpdateSource::Direct(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_single_store_scenario() {
        let mut stores = records(json!([{"Store ID": "S040", "AM": "H955"}]));
        let updater = FieldUpdater::new("AM", direct(&[("S040", "h1105")]));

        let report = updater.apply(&mut stores);
        assert_eq!(report.change_count(), 1);
        assert_eq!(stores, records(json!([{"Store ID": "S040", "AM": "h1105"}])));

        // 再次执行同一更新表：无变更
        let report = updater.apply(&mut stores);
        assert_eq!(report.change_count(), 0, "第二次执行应为幂等");
        assert_eq!(stores, records(json!([{"Store ID": "S040", "AM": "h1105"}])));
    }

    #[test]
    fn test_idempotent_with_appends_and_sort() {
        let mut stores = records(json!([
            {"Store ID": "S003", "AM": "H1"},
            {"Store ID": "S001", "AM": "H2"}
        ]));
        let mut new_records = BTreeMap::new();
        new_records.insert(
            "S002".to_string(),
            records(json!([{"Store ID": "S002", "AM": "H3"}])).remove(0),
        );
        let updater = FieldUpdater::new("AM", direct(&[("S001", "H9"), ("S003", "H9")]))
            .with_new_records(new_records)
            .sorted_by("Store ID");

        let first = updater.apply(&mut stores);
        assert_eq!(first.change_count(), 3);
        let snapshot = stores.clone();

        let second = updater.apply(&mut stores);
        assert_eq!(second.change_count(), 0);
        assert_eq!(stores, snapshot);
    }

    #[test]
    fn test_unknown_store_is_noop() {
        let mut stores = records(json!([{"Store ID": "S001", "AM": "H1"}]));
        let before = stores.clone();
        let updater = FieldUpdater::new("AM", direct(&[("S999", "H2")]));

        let report = updater.apply(&mut stores);
        assert_eq!(report.change_count(), 0);
        assert_eq!(stores, before, "未知标识不应修改集合");
        assert_eq!(report.skipped, vec![SkipEvent::UnknownStore { store_id: "S999".into() }]);
    }

    #[test]
    fn test_missing_id_skipped() {
        let mut stores = records(json!([
            {"Store Name": "无标识", "AM": "H1"},
            {"Store ID": "S001", "AM": "H1"}
        ]));
        let updater = FieldUpdater::new("AM", direct(&[("S001", "H2")]));

        let report = updater.apply(&mut stores);
        assert_eq!(report.change_count(), 1);
        assert_eq!(stores[0].get("AM"), Some(&json!("H1")));
        assert!(report.skipped.contains(&SkipEvent::MissingId { index: 0 }));
    }

    #[test]
    fn test_two_stage_resolution() {
        let mut stores = records(json!([
            {"Store ID": "S040", "Store Name": "CP", "AM": "H1"},
            {"Store ID": "S050", "Store Name": "Indiranagar", "AM": "H2"}
        ]));
        let source = UpdateSource::TwoStage {
            assignments: map(&[("S040", "Himanshu"), ("S050", "Ghost")]),
            ids: map(&[("Himanshu", "H955")]),
        };
        let report = FieldUpdater::new("AM", source).apply(&mut stores);

        assert_eq!(report.change_count(), 1);
        assert_eq!(stores[0].get("AM"), Some(&json!("H955")));
        assert_eq!(stores[1].get("AM"), Some(&json!("H2")), "未解析的人名不应修改记录");
        assert_eq!(
            report.skipped,
            vec![SkipEvent::UnresolvedName { store_id: "S050".into(), name: "Ghost".into() }]
        );
        assert_eq!(report.changes[0].to_string(), "Updated S040 (CP): H1 -> H955 (Himanshu)");
    }

    #[test]
    fn test_missing_field_is_added_in_place() {
        let mut stores = records(json!([{"Store ID": "S001", "Store Name": "新店"}]));
        let report = FieldUpdater::new("AM", direct(&[("S001", "H7")])).apply(&mut stores);

        assert_eq!(report.changes[0].to_string(), "Updated S001 (新店): null -> H7");
        let keys: Vec<&str> = stores[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Store ID", "Store Name", "AM"]);
    }

    #[test]
    fn test_update_keeps_field_position() {
        let mut stores = records(json!([{"Store ID": "S001", "AM": "H1", "Region": "West"}]));
        FieldUpdater::new("AM", direct(&[("S001", "H2")])).apply(&mut stores);

        let keys: Vec<&str> = stores[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Store ID", "AM", "Region"], "字段位置应保持不变");
    }

    #[test]
    fn test_append_without_duplication() {
        let mut stores = records(json!([{"Store ID": "S216", "AM": "H1"}]));
        let mut new_records = BTreeMap::new();
        for id in ["S216", "S219"] {
            new_records.insert(
                id.to_string(),
                records(json!([{"Store ID": id, "Store Name": "Pune Camp", "AM": "H3914"}])).remove(0),
            );
        }
        let updater = FieldUpdater::new("AM", direct(&[])).with_new_records(new_records);

        let report = updater.apply(&mut stores);
        assert_eq!(report.added_count(), 1);
        assert_eq!(stores.len(), 2);
        assert_eq!(stores.iter().filter(|r| str_field(r, "Store ID") == Some("S216")).count(), 1);
        assert_eq!(stores[0].get("AM"), Some(&json!("H1")), "已存在记录不应被覆盖");
        assert_eq!(report.changes[0].to_string(), "Added new store: S219 (Pune Camp) with AM H3914");
    }

    #[test]
    fn test_assignment_for_appended_store_is_not_unknown() {
        let mut stores = records(json!([{"Store ID": "S001", "AM": "H1"}]));
        let mut new_records = BTreeMap::new();
        new_records.insert(
            "S216".to_string(),
            records(json!([{"Store ID": "S216", "Store Name": "Andheri West", "AM": "H3386"}])).remove(0),
        );
        let source = UpdateSource::TwoStage {
            assignments: map(&[("S216", "Abhishek")]),
            ids: map(&[("Abhishek", "H3386")]),
        };
        let report = FieldUpdater::new("AM", source).with_new_records(new_records).apply(&mut stores);

        assert_eq!(report.added_count(), 1);
        assert!(report.skipped.is_empty(), "追加的门店不应记为未知: {:?}", report.skipped);
        assert_eq!(report.mapping_misses(), 0);
    }

    #[test]
    fn test_new_record_with_mismatched_id_not_appended() {
        let mut stores = records(json!([{"Store ID": "S001", "AM": "H1"}]));
        let mut new_records = BTreeMap::new();
        new_records.insert(
            "S999".to_string(),
            records(json!([{"Store ID": "S001", "AM": "H2"}])).remove(0),
        );
        let report = FieldUpdater::new("AM", direct(&[])).with_new_records(new_records).apply(&mut stores);

        assert_eq!(stores.len(), 1, "标识与键不一致的记录不应被追加");
        assert_eq!(stores[0].get("AM"), Some(&json!("H1")));
        assert_eq!(report.change_count(), 0);
        assert_eq!(report.skipped, vec![SkipEvent::InvalidNewRecord { store_id: "S999".into() }]);
        assert_eq!(report.mapping_misses(), 1);
    }

    #[test]
    fn test_stable_sort_by_store_id() {
        let mut stores = records(json!([
            {"Store ID": "S010", "tag": "a"},
            {"Store ID": "S002", "tag": "b"},
            {"tag": "no-id"},
            {"Store ID": "S002", "tag": "c"},
            {"Store ID": "S001", "tag": "d"}
        ]));
        let before = stores.len();
        let report = FieldUpdater::new("AM", direct(&[])).sorted_by("Store ID").apply(&mut stores);

        assert_eq!(report.change_count(), 0);
        assert_eq!(stores.len(), before, "排序不应丢失或重复记录");
        let keys: Vec<&str> = stores.iter().map(|r| sort_key(r, "Store ID")).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "应按标识非递减排列");
        let tags: Vec<&str> = stores.iter().map(|r| str_field(r, "tag").unwrap()).collect();
        assert_eq!(tags, vec!["no-id", "d", "b", "c", "a"], "相同键应保持原有顺序");
    }

    #[test]
    fn test_custom_id_and_name_fields() {
        let mut stores = records(json!([{"code": "X1", "title": "Depot", "manager": "A"}]));
        let report = FieldUpdater::new("manager", direct(&[("X1", "B")]))
            .with_id_field("code")
            .with_name_field("title")
            .apply(&mut stores);

        assert_eq!(report.changes[0].to_string(), "Updated X1 (Depot): A -> B");
    }
}
