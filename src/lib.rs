//! 门店记录批量字段更新库
//! 
//! 提供门店JSON加载、按标识批量更新指定字段（直接映射或两级映射）、追加新门店、排序与回写功能
//! 所有查找表通过更新计划显式传入

pub mod model;
pub mod runner;
pub mod utils;

// 重新导出主要类型
pub use model::document::{PatchError, StoreDocument};
pub use model::plan::PatchPlan;
pub use model::record::Record;
pub use model::report::{ChangeEvent, SkipEvent, UpdateReport};
pub use model::updater::{FieldUpdater, UpdateSource};
pub use runner::{run_plan, RunOptions, RunOutcome};
