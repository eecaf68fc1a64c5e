// ==========================================
// 采购申请跟踪系统 - 导入会话编排器
// ==========================================
// 职责: upload → (update_mappings) → preview → execute 全流程
// 状态机: pending → processing → completed | failed
// 红线: execute 整体一个事务，每行一个保存点；单行失败只回滚该行
// 红线: 只有成功的 execute 才删除上传文件；失败会话保留文件
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::activity_log::{ActivityEventType, ActivityLog};
use crate::domain::custom_field::CustomFieldConfig;
use crate::domain::import_session::{
    ColumnMapping, ExecuteReport, ImportOutcome, ImportSession, MappedRow, MappingUpdate,
    NewColumnMapping, NewImportSession, PreviewReport, PreviewRow, PreviewSummary,
    SessionDetail, UploadSummary,
};
use crate::domain::procurement::{
    available_fields, ItemFields, LookupDomain, RECEIPT_DATE_FIELD, REQUIRED_FIELDS,
};
use crate::domain::types::{CellValue, FieldValue, ImportAction, PreviewStatus, SessionStatus};
use crate::importer::date_normalizer::parse_date;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::{apply_insert_defaults, FieldNormalizer};
use crate::importer::file_parser::{SheetData, UniversalFileParser};
use crate::importer::header_matcher::HeaderMatcher;
use crate::importer::import_log;
use crate::importer::importer_trait::FileParser;
use crate::importer::lookup_resolver::{LookupResolver, LookupTable, LookupTables};
use crate::importer::row_mapper::RowMapper;
use crate::repository::{
    ActivityLogRepository, CustomFieldRepository, ImportSessionRepository, LookupRepository,
    ProcurementItemRepository, RepositoryResult,
};
use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 上传文件目录名（位于存储目录下）
pub const IMPORT_FILE_DIR: &str = "imports";

/// 样例值取前几行数据
const SAMPLE_ROWS: usize = 3;

/// 样例值最大长度（字符）
const SAMPLE_MAX_CHARS: usize = 500;

/// 结果日志中物料名称最大长度（字符）
const OUTCOME_NAME_MAX_CHARS: usize = 30;

/// 单行写入结果
struct WrittenRow {
    action: ImportAction,
    item_id: i64,
    version: i64,
}

// ==========================================
// ImportSessionService
// ==========================================
pub struct ImportSessionService<C>
where
    C: ImportConfigReader,
{
    // 共享连接（execute 期间独占）
    conn: Arc<Mutex<Connection>>,

    // 数据访问层
    session_repo: ImportSessionRepository,
    lookup_repo: LookupRepository,
    custom_field_repo: CustomFieldRepository,
    activity_log_repo: ActivityLogRepository,

    // 配置读取器
    config: C,

    // 文件解析器
    file_parser: Box<dyn FileParser>,

    // 存储根目录
    storage_dir: PathBuf,
}

impl<C> ImportSessionService<C>
where
    C: ImportConfigReader,
{
    /// 创建编排器（默认按扩展名选择解析器）
    ///
    /// # 参数
    /// - conn: 共享数据库连接
    /// - config: 配置读取器
    /// - storage_dir: 存储根目录（imports/ 与 import_logs/ 位于其下）
    pub fn new(conn: Arc<Mutex<Connection>>, config: C, storage_dir: impl Into<PathBuf>) -> Self {
        Self::with_parser(conn, config, storage_dir, Box::new(UniversalFileParser))
    }

    pub fn with_parser(
        conn: Arc<Mutex<Connection>>,
        config: C,
        storage_dir: impl Into<PathBuf>,
        file_parser: Box<dyn FileParser>,
    ) -> Self {
        Self {
            session_repo: ImportSessionRepository::new(conn.clone()),
            lookup_repo: LookupRepository::new(conn.clone()),
            custom_field_repo: CustomFieldRepository::new(conn.clone()),
            activity_log_repo: ActivityLogRepository::new(conn.clone()),
            conn,
            config,
            file_parser,
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// 会话上传文件的存放路径
    pub fn stored_file_path(&self, session: &ImportSession) -> PathBuf {
        self.storage_dir
            .join(IMPORT_FILE_DIR)
            .join(&session.stored_filename)
    }

    // ==========================================
    // upload
    // ==========================================

    /// 接收上传文件，创建 pending 会话并自动识别列映射
    ///
    /// # 返回
    /// - Ok(UploadSummary): 会话 id / 数据行数 / 识别到的列数
    /// - Err: 格式不支持、超出大小、解析失败（已删除落盘文件，不创建会话）
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn upload(
        &self,
        original_filename: &str,
        bytes: &[u8],
        actor: Option<i64>,
    ) -> ImportResult<UploadSummary> {
        // === 步骤 1: 校验文件名与大小 ===
        let original_name = Path::new(original_filename)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ImportError::UnsupportedFormat(original_filename.to_string()))?
            .to_string();

        if !UniversalFileParser::is_supported(&original_name) {
            return Err(ImportError::UnsupportedFormat(original_name));
        }

        let limit = self.config.get_max_upload_bytes()?;
        let size = bytes.len() as u64;
        if size > limit {
            return Err(ImportError::FileTooLarge { size, limit });
        }

        // === 步骤 2: 落盘 ===
        let stored_filename = format!("{}_{}", Uuid::new_v4(), original_name);
        let import_dir = self.storage_dir.join(IMPORT_FILE_DIR);
        fs::create_dir_all(&import_dir).map_err(|e| ImportError::StorageError(e.to_string()))?;
        let stored_path = import_dir.join(&stored_filename);
        fs::write(&stored_path, bytes).map_err(|e| ImportError::StorageError(e.to_string()))?;
        debug!(path = %stored_path.display(), "上传文件已落盘");

        // === 步骤 3: 解析 + 建会话（失败时删除落盘文件）===
        match self.create_session(&stored_path, &original_name, &stored_filename, size, actor) {
            Ok(summary) => {
                info!(
                    session_id = summary.session_id,
                    total_rows = summary.total_rows,
                    columns = summary.columns_detected,
                    "导入会话已创建"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, file = %original_name, "上传文件解析失败");
                remove_file_quietly(&stored_path);
                Err(e)
            }
        }
    }

    fn create_session(
        &self,
        stored_path: &Path,
        original_name: &str,
        stored_filename: &str,
        size: u64,
        actor: Option<i64>,
    ) -> ImportResult<UploadSummary> {
        let sheet = self.file_parser.parse_sheet(stored_path)?;
        let registry = self.custom_field_repo.load_registry()?;
        let matcher = HeaderMatcher::new(registry.active());

        let mappings: Vec<NewColumnMapping> = sheet
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.trim().is_empty())
            .map(|(idx, header)| {
                let matched = matcher.match_header(header);
                NewColumnMapping {
                    column_index: idx,
                    excel_column: header.trim().to_string(),
                    database_field: matched.field,
                    sample_data: sample_value(&sheet, idx),
                    confidence_score: matched.confidence,
                }
            })
            .collect();

        let total_rows = sheet.total_rows() as i64;
        let session = NewImportSession {
            original_filename: original_name.to_string(),
            stored_filename: stored_filename.to_string(),
            file_size: size as i64,
            total_rows,
            created_by: actor,
        };
        let session_id = self.session_repo.create_with_mappings(&session, &mappings)?;

        Ok(UploadSummary {
            session_id,
            total_rows,
            columns_detected: mappings.len(),
        })
    }

    // ==========================================
    // get_session / update_mappings
    // ==========================================

    /// 会话详情: 会话 + 列映射（按列顺序）+ 可选目标字段
    pub fn get_session(&self, session_id: i64) -> ImportResult<SessionDetail> {
        let session = self.load_session(session_id)?;
        let mappings = self.session_repo.list_mappings(session_id)?;
        let registry = self.custom_field_repo.load_registry()?;

        Ok(SessionDetail {
            session,
            mappings,
            available_fields: available_fields(&registry.active()),
        })
    }

    /// 人工修改列映射（仅 pending 会话）
    ///
    /// 任一条校验失败则整体不写入
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub fn update_mappings(
        &self,
        session_id: i64,
        updates: &[MappingUpdate],
    ) -> ImportResult<Vec<ColumnMapping>> {
        let session = self.load_session(session_id)?;
        ensure_pending(&session, "修改映射")?;

        let existing = self.session_repo.list_mappings(session_id)?;
        let registry = self.custom_field_repo.load_registry()?;
        let targets = available_fields(&registry.active());

        let mut normalized = Vec::with_capacity(updates.len());
        for update in updates {
            if !existing.iter().any(|m| m.id == update.id) {
                return Err(ImportError::MappingNotInSession {
                    mapping_id: update.id,
                    session_id,
                });
            }

            // 空串视为"忽略该列"
            let field = update
                .database_field
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty());
            if let Some(field) = field {
                if !targets.iter().any(|t| t.value == field) {
                    return Err(ImportError::UnknownTargetField(field.to_string()));
                }
            }

            normalized.push(MappingUpdate {
                id: update.id,
                database_field: field.map(str::to_string),
            });
        }

        let count = self.session_repo.update_mapping_fields(&normalized)?;
        info!(session_id, updated = count, "列映射已更新");

        Ok(self.session_repo.list_mappings(session_id)?)
    }

    /// 配置自定义字段槽位（标签 / 启用 / 可搜索）
    ///
    /// 只影响之后的 upload 识别与可选目标字段，不回改已有会话的映射
    #[instrument(skip(self))]
    pub fn configure_custom_field(&self, config: &CustomFieldConfig) -> ImportResult<()> {
        self.custom_field_repo.configure(config)?;
        info!(
            slot = %config.slot_name,
            active = config.is_active,
            "自定义字段已配置"
        );
        Ok(())
    }

    // ==========================================
    // preview
    // ==========================================

    /// 只读预览前 N 行（N 来自配置）
    #[instrument(skip(self))]
    pub fn preview(&self, session_id: i64) -> ImportResult<PreviewReport> {
        let session = self.load_session(session_id)?;
        let file_path = self.require_stored_file(&session)?;
        let mappings = self.session_repo.list_mappings(session_id)?;
        let limit = self.config.get_preview_limit()?;

        let sheet = self.file_parser.parse_sheet(&file_path)?;
        let row_mapper = RowMapper::new(&mappings);

        let rows: Vec<PreviewRow> = sheet
            .rows
            .iter()
            .take(limit)
            .map(|raw| {
                let data = row_mapper.map_row(&sheet.headers, raw);
                let errors: Vec<String> = missing_required_fields(&data)
                    .into_iter()
                    .map(|field| format!("Missing required field: {}", field))
                    .collect();
                let status = if errors.is_empty() {
                    PreviewStatus::Valid
                } else {
                    PreviewStatus::Skip
                };
                PreviewRow {
                    row_number: raw.row_number,
                    data,
                    status,
                    errors,
                }
            })
            .collect();

        let estimated_valid = rows
            .iter()
            .filter(|r| r.status == PreviewStatus::Valid)
            .count();
        let summary = PreviewSummary {
            total_rows: session.total_rows,
            preview_count: rows.len(),
            estimated_valid,
            estimated_skipped: rows.len() - estimated_valid,
        };
        debug!(
            preview_count = summary.preview_count,
            valid = summary.estimated_valid,
            "预览完成"
        );

        Ok(PreviewReport {
            rows,
            summary,
            mappings,
        })
    }

    // ==========================================
    // execute
    // ==========================================

    /// 执行导入
    ///
    /// # 返回
    /// - Ok(ExecuteReport): 四类计数 + 前 10 条错误 + 逐行日志
    /// - Err: 会话不是 pending / 文件缺失（无任何修改）；
    ///        或事务级失败（已回滚，会话置为 failed，文件保留）
    #[instrument(skip(self))]
    pub fn execute(&self, session_id: i64, actor: Option<i64>) -> ImportResult<ExecuteReport> {
        let session = self.load_session(session_id)?;
        ensure_pending(&session, "执行导入")?;
        let file_path = self.require_stored_file(&session)?;

        // === 步骤 1: 加载映射 / 字典表 / 别名配置（加锁之前）===
        let mappings = self.session_repo.list_mappings(session_id)?;
        let resolver = self.build_resolver()?;

        info!(
            session_id,
            file = %session.original_filename,
            "开始执行导入"
        );
        self.session_repo
            .update_status(session_id, SessionStatus::Processing)?;

        // === 步骤 2: 事务内逐行对账 ===
        let report = match self.run_import(session_id, &file_path, &mappings, &resolver, actor) {
            Ok(report) => report,
            Err(e) => {
                error!(session_id, error = %e, "导入失败，事务已回滚");
                if let Err(mark_err) = self
                    .session_repo
                    .update_status(session_id, SessionStatus::Failed)
                {
                    warn!(session_id, error = %mark_err, "会话状态置为 failed 失败");
                }
                return Err(e);
            }
        };

        // === 步骤 3: 提交后的附带动作（失败只告警）===
        self.record_activity(&session, actor, &report);

        match import_log::write(&self.storage_dir, session_id, now(), &report) {
            Ok(path) => debug!(path = %path.display(), "导入日志已写入"),
            Err(e) => warn!(session_id, error = %e, "导入日志写入失败"),
        }

        if let Err(e) = fs::remove_file(&file_path) {
            warn!(session_id, error = %e, "上传文件删除失败");
        }

        info!(
            session_id,
            new = report.success_count,
            updated = report.updated_count,
            skipped = report.skipped_count,
            errors = report.error_count,
            "导入完成"
        );
        Ok(report)
    }

    fn run_import(
        &self,
        session_id: i64,
        file_path: &Path,
        mappings: &[ColumnMapping],
        resolver: &LookupResolver,
        actor: Option<i64>,
    ) -> ImportResult<ExecuteReport> {
        let sheet = self.file_parser.parse_sheet(file_path)?;
        let row_mapper = RowMapper::new(mappings);
        let normalizer = FieldNormalizer::new(resolver);
        let mut report = ExecuteReport::default();

        // 缺必填字段的行直接跳过，不进入事务
        let mut candidates: Vec<(usize, MappedRow)> = Vec::with_capacity(sheet.rows.len());
        for raw in &sheet.rows {
            let data = row_mapper.map_row(&sheet.headers, raw);
            if let Some(field) = missing_required_fields(&data).first() {
                report.record(ImportOutcome {
                    row: raw.row_number,
                    action: ImportAction::Skipped,
                    no_pr: outcome_no_pr(&data),
                    nama_barang: outcome_name(&data),
                    item_id: None,
                    version: None,
                    reason: Some(format!("Missing required field: {}", field)),
                });
                continue;
            }
            candidates.push((raw.row_number, data));
        }

        // 按收单日期升序（稳定排序；缺失/无法解析的排最后）
        candidates.sort_by_key(|(_, data)| {
            let received = data.get(RECEIPT_DATE_FIELD).and_then(parse_date);
            (received.is_none(), received)
        });
        debug!(
            candidates = candidates.len(),
            skipped = report.skipped_count,
            "行映射完成"
        );

        let ts = now();
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;
        let mut tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        for (row_number, data) in &candidates {
            let sp = tx
                .savepoint()
                .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

            match write_row(&sp, &normalizer, data, actor, ts) {
                Ok(written) => {
                    sp.commit()
                        .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
                    report.record(ImportOutcome {
                        row: *row_number,
                        action: written.action,
                        no_pr: outcome_no_pr(data),
                        nama_barang: outcome_name(data),
                        item_id: Some(written.item_id),
                        version: Some(written.version),
                        reason: (written.action == ImportAction::Update).then(|| {
                            "Updated existing item (same NO PR + nama_barang)".to_string()
                        }),
                    });
                }
                Err(e) => {
                    // 保存点随 drop 回滚
                    drop(sp);
                    warn!(row = *row_number, error = %e, "行导入失败");
                    report.record(ImportOutcome {
                        row: *row_number,
                        action: ImportAction::Error,
                        no_pr: outcome_no_pr(data),
                        nama_barang: outcome_name(data),
                        item_id: None,
                        version: None,
                        reason: Some(e.to_string()),
                    });
                }
            }
        }

        ImportSessionRepository::complete_tx(
            &tx,
            session_id,
            report.processed_rows() as i64,
            (report.success_count + report.updated_count) as i64,
            report.error_count as i64,
        )?;
        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        Ok(report)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn load_session(&self, session_id: i64) -> ImportResult<ImportSession> {
        self.session_repo
            .find_by_id(session_id)?
            .ok_or(ImportError::SessionNotFound(session_id))
    }

    fn require_stored_file(&self, session: &ImportSession) -> ImportResult<PathBuf> {
        let path = self.stored_file_path(session);
        if !path.is_file() {
            return Err(ImportError::FileNotFound(session.stored_filename.clone()));
        }
        Ok(path)
    }

    /// 每次 execute 加载一次字典表与别名配置
    fn build_resolver(&self) -> ImportResult<LookupResolver> {
        let tables = LookupTables {
            departments: LookupTable::new(self.lookup_repo.list(LookupDomain::Department)?),
            buyers: LookupTable::new(self.lookup_repo.list(LookupDomain::Buyer)?),
            statuses: LookupTable::new(self.lookup_repo.list(LookupDomain::Status)?),
        };
        Ok(LookupResolver::new(
            tables,
            self.config.get_legacy_status_mapping()?,
            self.config.get_buyer_aliases()?,
        ))
    }

    fn record_activity(&self, session: &ImportSession, actor: Option<i64>, report: &ExecuteReport) {
        let log = ActivityLog {
            id: None,
            user_id: actor,
            procurement_item_id: None,
            event_type: ActivityEventType::Imported,
            description: format!(
                "Imported procurement data from '{}': {} new, {} updated, {} skipped, {} errors",
                session.original_filename,
                report.success_count,
                report.updated_count,
                report.skipped_count,
                report.error_count
            ),
            old_values: None,
            new_values: Some(json!({
                "filename": session.original_filename,
                "success_count": report.success_count,
                "updated_count": report.updated_count,
                "skipped_count": report.skipped_count,
                "error_count": report.error_count,
                "total_rows": session.total_rows,
            })),
            created_at: now(),
        };

        if let Err(e) = self.activity_log_repo.insert(&log) {
            warn!(session_id = session.id, error = %e, "操作日志写入失败");
        }
    }
}

// ==========================================
// 单行写入（保存点内）
// ==========================================

/// 归一化 + 按 (no_pr, nama_barang) 对账 + 写入
fn write_row(
    conn: &Connection,
    normalizer: &FieldNormalizer<'_>,
    data: &MappedRow,
    actor: Option<i64>,
    ts: NaiveDateTime,
) -> RepositoryResult<WrittenRow> {
    let mut fields: ItemFields = normalizer.normalize(data);
    let no_pr = fields
        .get("no_pr")
        .and_then(FieldValue::as_text)
        .unwrap_or_default()
        .to_string();
    let nama_barang = fields
        .get("nama_barang")
        .and_then(FieldValue::as_text)
        .map(str::to_string);

    match ProcurementItemRepository::find_by_identity_tx(conn, &no_pr, nama_barang.as_deref())? {
        Some(existing) => {
            ProcurementItemRepository::update_tx(conn, existing.id, &fields, actor, ts)?;
            Ok(WrittenRow {
                action: ImportAction::Update,
                item_id: existing.id,
                version: existing.version,
            })
        }
        None => {
            apply_insert_defaults(&mut fields);
            let version = ProcurementItemRepository::count_by_no_pr_tx(conn, &no_pr)? + 1;
            let item_id = ProcurementItemRepository::insert_tx(conn, &fields, version, actor, ts)?;
            Ok(WrittenRow {
                action: ImportAction::New,
                item_id,
                version,
            })
        }
    }
}

// ==========================================
// 纯函数辅助
// ==========================================

fn ensure_pending(session: &ImportSession, operation: &'static str) -> ImportResult<()> {
    if session.status != SessionStatus::Pending {
        return Err(ImportError::InvalidSessionState {
            session_id: session.id,
            status: session.status,
            operation,
        });
    }
    Ok(())
}

fn missing_required_fields(data: &MappedRow) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| data.get(*field).map(CellValue::is_blank).unwrap_or(true))
        .collect()
}

/// 列的样例值: 前三行数据中首个非空值
fn sample_value(sheet: &SheetData, column_index: usize) -> Option<String> {
    sheet
        .rows
        .iter()
        .take(SAMPLE_ROWS)
        .find_map(|row| row.cell(column_index).as_text())
        .map(|text| truncate_chars(&text, SAMPLE_MAX_CHARS))
}

fn outcome_no_pr(data: &MappedRow) -> String {
    data.get("no_pr")
        .and_then(CellValue::as_text)
        .unwrap_or_default()
}

fn outcome_name(data: &MappedRow) -> Option<String> {
    data.get("nama_barang")
        .and_then(CellValue::as_text)
        .map(|name| truncate_chars(&name, OUTCOME_NAME_MAX_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "删除上传文件失败");
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
