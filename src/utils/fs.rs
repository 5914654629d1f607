//! IO helper: safe file read/write for JSON

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::model::document::PatchError;

/// 从文件读取JSON数据
pub fn read_json_file(p: &Path) -> Result<Value, PatchError> {
    read_json_as(p)
}

/// 从文件读取并反序列化为指定类型
pub fn read_json_as<T: DeserializeOwned>(p: &Path) -> Result<T, PatchError> {
    let f = File::open(p)?;
    let rdr = BufReader::new(f);
    let v: T = serde_json::from_reader(rdr)?;
    Ok(v)
}

/// 将JSON数据保存到文件（两空格缩进，非ASCII字符原样输出）
///
/// 先写同目录临时文件再重命名，单个文件不会出现写了一半的内容
pub fn write_json_file(p: &Path, value: &Value) -> Result<(), PatchError> {
    let tmp = temp_sibling(p);
    if let Err(e) = write_pretty(&tmp, value) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, p) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn write_pretty(p: &Path, value: &Value) -> Result<(), PatchError> {
    let f = File::create(p)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    w.get_ref().sync_all()?;
    Ok(())
}

/// 临时文件：原文件名后追加 .tmp
fn temp_sibling(p: &Path) -> PathBuf {
    let mut name = p.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    p.with_file_name(name)
}
