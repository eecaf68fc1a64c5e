// ==========================================
// 采购申请跟踪系统 - 导入日志文件
// ==========================================
// 职责: execute 完成后生成纯文本日志 <storage>/import_logs/import_<id>.log
// 说明: 日志文件仅供排查，写入失败不影响导入结果
// ==========================================

use crate::domain::import_session::{ExecuteReport, ImportOutcome};
use crate::domain::types::ImportAction;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 日志目录名（位于存储目录下）
pub const IMPORT_LOG_DIR: &str = "import_logs";

/// 日志文件路径
pub fn log_path(storage_dir: &Path, session_id: i64) -> PathBuf {
    storage_dir
        .join(IMPORT_LOG_DIR)
        .join(format!("import_{}.log", session_id))
}

/// 渲染日志正文
pub fn render(session_id: i64, timestamp: NaiveDateTime, report: &ExecuteReport) -> String {
    let mut lines = vec![
        "=== IMPORT LOG ===".to_string(),
        format!("Session ID: {}", session_id),
        format!("Timestamp: {}", timestamp.format("%Y-%m-%d %H:%M:%S")),
        format!(
            "Results: New={}, Updated={}, Skipped={}, Errors={}",
            report.success_count, report.updated_count, report.skipped_count, report.error_count
        ),
        String::new(),
        "=== DETAIL ===".to_string(),
    ];
    lines.extend(report.log.iter().map(render_line));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_line(outcome: &ImportOutcome) -> String {
    let mut parts = vec![
        format!("[Row {}] {}", outcome.row, outcome.action.as_str()),
        format!("No PR: {}", outcome.no_pr),
    ];
    if let Some(name) = &outcome.nama_barang {
        parts.push(format!("Item: {}", name));
    }
    if let Some(version) = outcome.version {
        parts.push(format!("Version: {}", version));
    }
    if let Some(id) = outcome.item_id {
        parts.push(format!("ID: {}", id));
    }
    if let Some(reason) = &outcome.reason {
        let label = if outcome.action == ImportAction::Error {
            "Error"
        } else {
            "Reason"
        };
        parts.push(format!("{}: {}", label, reason));
    }
    parts.join(" | ")
}

/// 写入日志文件（目录不存在时创建）
pub fn write(
    storage_dir: &Path,
    session_id: i64,
    timestamp: NaiveDateTime,
    report: &ExecuteReport,
) -> io::Result<PathBuf> {
    let path = log_path(storage_dir, session_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, render(session_id, timestamp, report))?;
    Ok(path)
}
