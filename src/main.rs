// ==========================================
// 采购申请跟踪系统 - 命令行入口
// ==========================================
// 用法: procurement-import <file> [db_path] [storage_dir]
// 流程: upload → preview → execute，结果以 JSON 输出到 stdout
// 日志: LOG_FORMAT=json 时输出 JSON 行日志
// ==========================================

use anyhow::{bail, Context, Result};
use procurement_import::config::default_storage_dir;
use procurement_import::{logging, ImportApi, APP_NAME, VERSION};
use serde_json::json;
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE: &str = "procurement.db";

fn main() -> Result<()> {
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        logging::init_json();
    } else {
        logging::init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(file) = args.first() else {
        bail!("usage: procurement-import <file> [db_path] [storage_dir]");
    };
    let storage_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(default_storage_dir);
    let db_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| storage_dir.join(DEFAULT_DB_FILE));

    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!(db = %db_path.display(), storage = %storage_dir.display(), "使用数据库与存储目录");

    std::fs::create_dir_all(&storage_dir)
        .with_context(|| format!("failed to create {}", storage_dir.display()))?;
    let db_path = db_path
        .to_str()
        .context("database path is not valid UTF-8")?
        .to_string();

    let api = ImportApi::open(&db_path, storage_dir.clone())?;

    let upload = api.upload_file(Path::new(file), None)?;
    let preview = api.preview(upload.session_id)?;
    let report = api.execute(upload.session_id, None)?;

    let output = json!({
        "upload": upload,
        "preview": preview.summary,
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
