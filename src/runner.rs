//! 执行一份更新计划：加载文档 -> 批量更新 -> （严格模式检查）-> 写出全部输出

use std::path::PathBuf;

use crate::model::document::{PatchError, StoreDocument};
use crate::model::plan::PatchPlan;
use crate::model::report::UpdateReport;

#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    /// 只计算并输出审计日志，不写文件
    pub dry_run: bool,
    /// 存在未解析人名或未知门店时中止，不写文件
    pub strict: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: UpdateReport,
    /// 实际写出的文件（dry-run 时为空）
    pub written: Vec<PathBuf>,
}

impl RunOutcome {
    /// 审计汇总行
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Total updates: {}", self.report.change_count()),
            format!("Total stores: {}", self.report.total_records),
        ];
        if self.written.is_empty() {
            lines.push("Dry run: no files written".to_string());
        } else {
            let files: Vec<String> = self.written.iter().map(|p| p.display().to_string()).collect();
            lines.push(format!("Files updated: {}", files.join(", ")));
        }
        lines
    }
}

pub fn run_plan(plan: &PatchPlan, options: RunOptions) -> Result<RunOutcome, PatchError> {
    let mut doc = StoreDocument::default();
    doc.load_file(&plan.input)?;

    let mut records = doc.records(&plan.records_path)?;
    let report = plan.updater().apply(&mut records);

    for skip in &report.skipped {
        tracing::warn!("{}", skip);
    }

    if options.strict && report.mapping_misses() > 0 {
        return Err(PatchError::MappingMiss(report.mapping_misses()));
    }

    if options.dry_run {
        tracing::info!("dry-run：跳过写出 {} 个文件", plan.outputs.len());
        return Ok(RunOutcome { report, written: Vec::new() });
    }

    doc.replace_records(&plan.records_path, records)?;
    doc.save_to_files(&plan.outputs)?;
    Ok(RunOutcome { report, written: plan.outputs.clone() })
}
