//! Record：单个门店记录（字段名 -> 值），字段顺序保持输入时的顺序

use serde_json::{Map, Value};

/// 默认的标识字段
pub const DEFAULT_ID_FIELD: &str = "Store ID";
/// 默认的门店名称字段（仅用于审计输出）
pub const DEFAULT_NAME_FIELD: &str = "Store Name";
/// 默认的更新字段（Area Manager）
pub const DEFAULT_TARGET_FIELD: &str = "AM";

/// 一条门店记录；除标识字段外，其余字段原样透传
pub type Record = Map<String, Value>;

/// 读取字符串字段；字段缺失或不是字符串时返回 None
pub fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// 排序键：缺失或非字符串按空字符串处理
pub fn sort_key<'a>(record: &'a Record, field: &str) -> &'a str {
    str_field(record, field).unwrap_or("")
}

/// 集合中是否已存在指定标识的记录
pub fn contains_id(records: &[Record], id_field: &str, id: &str) -> bool {
    records.iter().any(|r| str_field(r, id_field) == Some(id))
}

/// 值的审计展示形式：字符串不加引号，缺失显示为 null
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}
