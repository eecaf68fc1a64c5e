// ==========================================
// 导入会话编排器集成测试
// ==========================================
// 覆盖: upload / update_mappings / preview / execute 的状态与副作用
// ==========================================


#[cfg(test)]
mod import_session_test {
    use crate::test_helpers::{
        create_service, create_test_db, csv_bytes, open_test_connection, seed_lookups, xlsx_bytes,
        Cell,
    };
    use procurement_import::config::{config_keys, ConfigManager};
    use procurement_import::domain::{
        ActivityEventType, ImportAction, MappingUpdate, PreviewStatus, SessionStatus,
    };
    use procurement_import::importer::ImportError;
    use procurement_import::logging;
    use procurement_import::repository::{ActivityLogRepository, ProcurementItemRepository};
    use std::fs;
    use std::path::Path;

    fn files_in(dir: &Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    // ==========================================
    // upload
    // ==========================================

    #[test]
    fn test_upload_detects_mappings_and_samples() {
        logging::init_test();
        let (_temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang", "", "Qty", "Catatan Internal", "Nilai (IDR)"],
            &["PR-1", "Widget", "x", "", "", "1.500.000"],
            &["PR-2", "Gadget", "y", "5", "", "2.000"],
        ])
        .unwrap();

        let summary = service.upload("requests.csv", &bytes, Some(7)).unwrap();
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.columns_detected, 5, "空白表头不生成映射");

        let detail = service.get_session(summary.session_id).unwrap();
        assert_eq!(detail.session.status, SessionStatus::Pending);
        assert_eq!(detail.session.created_by, Some(7));
        assert_eq!(detail.session.original_filename, "requests.csv");
        assert!(detail.session.stored_filename.ends_with("_requests.csv"));

        let fields: Vec<(usize, Option<&str>, i32)> = detail
            .mappings
            .iter()
            .map(|m| (m.column_index, m.database_field.as_deref(), m.confidence_score))
            .collect();
        assert_eq!(
            fields,
            vec![
                (0, Some("no_pr"), 100),
                (1, Some("nama_barang"), 100),
                (3, Some("qty"), 100),
                (4, None, 0),
                (5, Some("nilai"), 80),
            ]
        );

        // 样例值取前三行中首个非空值
        let qty = &detail.mappings[2];
        assert_eq!(qty.sample_data.as_deref(), Some("5"));
        assert_eq!(detail.mappings[3].sample_data, None);

        // 可选目标字段: no_pr 必填
        let no_pr = detail
            .available_fields
            .iter()
            .find(|f| f.value == "no_pr")
            .unwrap();
        assert!(no_pr.required);

        let stored = files_in(&storage.path().join("imports"));
        assert_eq!(stored, vec![detail.session.stored_filename.clone()]);
    }

    #[test]
    fn test_upload_rejects_unsupported_and_oversized_files() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let err = service.upload("notes.txt", b"No PR\nPR-1\n", None).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));

        ConfigManager::from_connection(conn.clone())
            .unwrap()
            .set_global_config_value(config_keys::MAX_UPLOAD_BYTES, "8")
            .unwrap();
        let err = service.upload("big.csv", b"No PR\nPR-1\n", None).unwrap_err();
        assert!(matches!(err, ImportError::FileTooLarge { size: 11, limit: 8 }));
        assert!(err.is_client_error());

        assert!(files_in(&storage.path().join("imports")).is_empty());
    }

    #[test]
    fn test_upload_of_empty_sheet_removes_stored_file() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let err = service.upload("empty.csv", b",,\n", None).unwrap_err();
        assert!(matches!(err, ImportError::EmptyWorkbook));
        assert!(files_in(&storage.path().join("imports")).is_empty());

        let err = service.get_session(1).unwrap_err();
        assert!(matches!(err, ImportError::SessionNotFound(1)));
    }

    // ==========================================
    // update_mappings
    // ==========================================

    #[test]
    fn test_update_mappings_validates_targets_and_ownership() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[&["No PR", "Catatan Internal"], &["PR-1", "urgent"]]).unwrap();
        let first = service.upload("a.csv", &bytes, None).unwrap();
        let second = service.upload("b.csv", &bytes, None).unwrap();

        let mappings = service.get_session(first.session_id).unwrap().mappings;
        let note = mappings[1].id;
        let foreign = service.get_session(second.session_id).unwrap().mappings[0].id;

        // 未知字段: 整体不写入
        let err = service
            .update_mappings(
                first.session_id,
                &[
                    MappingUpdate { id: note, database_field: Some("keterangan".to_string()) },
                    MappingUpdate { id: mappings[0].id, database_field: Some("bogus".to_string()) },
                ],
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownTargetField(ref f) if f == "bogus"));
        let unchanged = service.get_session(first.session_id).unwrap().mappings;
        assert_eq!(unchanged[1].database_field, None);

        // 其他会话的映射
        let err = service
            .update_mappings(
                first.session_id,
                &[MappingUpdate { id: foreign, database_field: None }],
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::MappingNotInSession { .. }));

        // 未启用的自定义字段不可选
        let err = service
            .update_mappings(
                first.session_id,
                &[MappingUpdate { id: note, database_field: Some("custom_field_3".to_string()) }],
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownTargetField(_)));

        let updated = service
            .update_mappings(
                first.session_id,
                &[MappingUpdate { id: note, database_field: Some("keterangan".to_string()) }],
            )
            .unwrap();
        assert_eq!(updated[1].database_field.as_deref(), Some("keterangan"));
        assert_eq!(
            service.get_session(first.session_id).unwrap().session.status,
            SessionStatus::Pending
        );

        // execute 之后映射冻结
        service.execute(first.session_id, None).unwrap();
        let err = service
            .update_mappings(
                first.session_id,
                &[MappingUpdate { id: note, database_field: None }],
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidSessionState { .. }));
    }

    // ==========================================
    // preview
    // ==========================================

    #[test]
    fn test_preview_is_read_only_and_respects_limit() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang"],
            &["PR-1", "Widget"],
            &["", "Orphan"],
            &["PR-3", "Bolt"],
        ])
        .unwrap();
        let upload = service.upload("p.csv", &bytes, None).unwrap();

        let report = service.preview(upload.session_id).unwrap();
        assert_eq!(report.summary.total_rows, 3);
        assert_eq!(report.summary.preview_count, 3);
        assert_eq!(report.summary.estimated_valid, 2);
        assert_eq!(report.summary.estimated_skipped, 1);
        assert_eq!(report.rows[1].row_number, 2);
        assert_eq!(report.rows[1].status, PreviewStatus::Skip);
        assert_eq!(report.rows[1].errors, vec!["Missing required field: no_pr"]);
        assert_eq!(report.mappings.len(), 2);

        ConfigManager::from_connection(conn.clone())
            .unwrap()
            .set_global_config_value(config_keys::PREVIEW_LIMIT, "1")
            .unwrap();
        let report = service.preview(upload.session_id).unwrap();
        assert_eq!(report.summary.preview_count, 1);
        assert_eq!(report.summary.total_rows, 3);

        let items = ProcurementItemRepository::new(conn.clone());
        assert_eq!(items.count_all().unwrap(), 0);
        assert_eq!(
            service.get_session(upload.session_id).unwrap().session.status,
            SessionStatus::Pending
        );
    }

    // ==========================================
    // execute
    // ==========================================

    #[test]
    fn test_execute_assigns_versions_by_receipt_date() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang", "Tanggal Terima Dokumen"],
            &["PR-7", "Beta", "20/01/2024"],
            &["PR-7", "Gamma", ""],
            &["PR-7", "Alpha", "05/01/2024"],
            &["PR-7", "Delta", "not a date"],
        ])
        .unwrap();
        let upload = service.upload("v.csv", &bytes, None).unwrap();
        let report = service.execute(upload.session_id, None).unwrap();
        assert_eq!(report.success_count, 4);

        let items = ProcurementItemRepository::new(conn.clone())
            .list_by_no_pr("PR-7")
            .unwrap();
        let versions: Vec<(Option<&str>, i64)> = items
            .iter()
            .map(|i| (i.nama_barang.as_deref(), i.version))
            .collect();
        // 有日期的按日期升序，其余保持原顺序排在最后
        assert_eq!(
            versions,
            vec![(Some("Alpha"), 1), (Some("Beta"), 2), (Some("Gamma"), 3), (Some("Delta"), 4)]
        );
        assert_eq!(items[0].tgl_terima_dokumen.as_deref(), Some("2024-01-05"));
        assert_eq!(items[3].tgl_terima_dokumen, None);

        // 结果日志按处理顺序，行号保持原始位置
        let order: Vec<usize> = report.log.iter().map(|o| o.row).collect();
        assert_eq!(order, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_execute_updates_existing_item_in_place() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let first = csv_bytes(&[
            &["No PR", "Nama Barang", "Qty", "Keterangan"],
            &["PR-1", "Widget", "5", "first"],
        ])
        .unwrap();
        let upload = service.upload("first.csv", &first, Some(1)).unwrap();
        service.execute(upload.session_id, Some(1)).unwrap();

        // 第二个文件不含 Keterangan 列: 未映射的字段保持不变
        let second = csv_bytes(&[&["No PR", "Nama Barang", "Qty"], &["PR-1", "Widget", "9"]]).unwrap();
        let upload = service.upload("second.csv", &second, Some(2)).unwrap();
        let report = service.execute(upload.session_id, Some(2)).unwrap();

        assert_eq!(report.updated_count, 1);
        assert_eq!(report.success_count, 0);
        let outcome = &report.log[0];
        assert_eq!(outcome.action, ImportAction::Update);
        assert_eq!(
            outcome.reason.as_deref(),
            Some("Updated existing item (same NO PR + nama_barang)")
        );

        let items = ProcurementItemRepository::new(conn.clone())
            .list_by_no_pr("PR-1")
            .unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.qty, 9);
        assert_eq!(item.version, 1);
        assert_eq!(item.created_by, Some(1));
        assert_eq!(item.updated_by, Some(2));
        assert_eq!(item.keterangan.as_deref(), Some("first"));
        assert_eq!(outcome.item_id, Some(item.id));
    }

    #[test]
    fn test_execute_skips_blank_no_pr_and_isolates_row_errors() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        seed_lookups(&conn).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang", "Bagian"],
            &["PR-1", "Widget", "IT"],
            &["", "Nameless", "IT"],
            &["PR-2", "Broken", "99"],
            &["PR-3", "Bolt", "finance"],
        ])
        .unwrap();
        let upload = service.upload("mixed.csv", &bytes, None).unwrap();
        let report = service.execute(upload.session_id, None).unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.updated_count, 0);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Row 3: "), "{}", report.errors[0]);

        let skipped = report
            .log
            .iter()
            .find(|o| o.action == ImportAction::Skipped)
            .unwrap();
        assert_eq!(skipped.row, 2);
        assert_eq!(skipped.reason.as_deref(), Some("Missing required field: no_pr"));

        let repo = ProcurementItemRepository::new(conn.clone());
        assert_eq!(repo.count_all().unwrap(), 2);
        assert!(repo.list_by_no_pr("PR-2").unwrap().is_empty());

        let session = service.get_session(upload.session_id).unwrap().session;
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.processed_rows, 4);
        assert_eq!(session.success_rows, 2);
        assert_eq!(session.error_rows, 1);
    }

    #[test]
    fn test_fully_blank_row_is_counted_and_skipped() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang", "Qty"],
            &["PR-1", "Widget", "1"],
            &["", "", ""],
            &["PR-2", "Gadget", "2"],
        ])
        .unwrap();
        let upload = service.upload("gap.csv", &bytes, None).unwrap();
        assert_eq!(upload.total_rows, 3);

        let report = service.execute(upload.session_id, None).unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.log.len(), 3, "每个数据行都有结果记录");

        let blank = report.log.iter().find(|o| o.row == 2).unwrap();
        assert_eq!(blank.action, ImportAction::Skipped);
        assert_eq!(blank.reason.as_deref(), Some("Missing required field: no_pr"));

        let session = service.get_session(upload.session_id).unwrap().session;
        assert_eq!(session.total_rows, 3);
        assert_eq!(session.processed_rows, 3);
    }

    #[test]
    fn test_execute_resolves_lookups_and_leaves_unknowns_null() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let lookups = seed_lookups(&conn).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang", "Bagian", "Buyer", "Status", "Mat Code"],
            &["PR-1", "Widget", "it", "Pak Ato", "Auction", "M-01"],
            &["PR-2", "Gadget", "Unknown Dept", "Nobody", "Selesai", ""],
        ])
        .unwrap();
        let upload = service.upload("lookups.csv", &bytes, None).unwrap();
        service.execute(upload.session_id, None).unwrap();

        let repo = ProcurementItemRepository::new(conn.clone());
        let widget = &repo.list_by_no_pr("PR-1").unwrap()[0];
        assert_eq!(widget.department_id, Some(lookups.it_department));
        assert_eq!(widget.buyer_id, Some(lookups.buyer_ato));
        assert_eq!(widget.status_id, Some(lookups.status_negosiasi));
        assert_eq!(widget.custom_field(1), Some("Barang"));

        let gadget = &repo.list_by_no_pr("PR-2").unwrap()[0];
        assert_eq!(gadget.department_id, None);
        assert_eq!(gadget.buyer_id, None);
        assert_eq!(gadget.status_id, None);
        assert_eq!(gadget.custom_field(1), Some("Jasa"));
        assert_eq!(gadget.qty, 0);
        assert_eq!(gadget.nilai, 0.0);
    }

    #[test]
    fn test_execute_xlsx_with_raw_cell_values() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = xlsx_bytes(&[
            vec![
                Cell::Text("No PR"),
                Cell::Text("Nama Barang"),
                Cell::Text("Qty"),
                Cell::Text("Nilai"),
                Cell::Text("Tanggal PO"),
            ],
            vec![
                Cell::Number(12345.0),
                Cell::Text("Pump"),
                Cell::Number(3.0),
                Cell::Number(1500000.5),
                Cell::Number(45356.0),
            ],
            vec![Cell::Blank, Cell::Blank, Cell::Blank, Cell::Blank, Cell::Blank],
            vec![
                Cell::Text("PR-9"),
                Cell::Text("Valve"),
                Cell::Text("12 pcs"),
                Cell::Text("568.453.820"),
                Cell::Text("05/03/2024"),
            ],
        ])
        .unwrap();

        let upload = service.upload("sheet.xlsx", &bytes, None).unwrap();
        assert_eq!(upload.total_rows, 3, "空白行计入数据行");

        let report = service.execute(upload.session_id, None).unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.skipped_count, 1);
        let rows: Vec<(usize, ImportAction)> = report.log.iter().map(|o| (o.row, o.action)).collect();
        assert!(rows.contains(&(2, ImportAction::Skipped)));
        assert!(rows.contains(&(3, ImportAction::New)), "行号按数据行位置计算");

        let repo = ProcurementItemRepository::new(conn.clone());
        let pump = &repo.list_by_no_pr("12345").unwrap()[0];
        assert_eq!(pump.qty, 3);
        assert_eq!(pump.nilai, 1500000.5);
        assert_eq!(pump.tgl_po.as_deref(), Some("2024-03-05"));

        let valve = &repo.list_by_no_pr("PR-9").unwrap()[0];
        assert_eq!(valve.qty, 12);
        assert_eq!(valve.nilai, 568453820.0);
        assert_eq!(valve.tgl_po.as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn test_execute_side_effects_and_second_execute_rejected() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[&["No PR", "Nama Barang"], &["PR-1", "Widget"], &["", "x"]]).unwrap();
        let upload = service.upload("once.csv", &bytes, Some(5)).unwrap();
        service.execute(upload.session_id, Some(5)).unwrap();

        // 上传文件已删除，日志文件已生成
        assert!(files_in(&storage.path().join("imports")).is_empty());
        let log_path = storage
            .path()
            .join("import_logs")
            .join(format!("import_{}.log", upload.session_id));
        let log_text = fs::read_to_string(log_path).unwrap();
        assert!(log_text.contains("Results: New=1, Updated=0, Skipped=1, Errors=0"));

        let activity = ActivityLogRepository::new(conn.clone())
            .list_by_event_type(ActivityEventType::Imported, 10)
            .unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].user_id, Some(5));
        assert_eq!(
            activity[0].description,
            "Imported procurement data from 'once.csv': 1 new, 0 updated, 1 skipped, 0 errors"
        );
        let payload = activity[0].new_values.as_ref().unwrap();
        assert_eq!(payload["total_rows"], 2);
        assert_eq!(payload["skipped_count"], 1);

        let err = service.execute(upload.session_id, Some(5)).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidSessionState { status: SessionStatus::Completed, .. }
        ));
        assert_eq!(
            ProcurementItemRepository::new(conn.clone()).count_all().unwrap(),
            1
        );
    }

    #[test]
    fn test_execute_with_missing_file_is_client_error_without_mutation() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = csv_bytes(&[&["No PR"], &["PR-1"]]).unwrap();
        let upload = service.upload("gone.csv", &bytes, None).unwrap();
        let session = service.get_session(upload.session_id).unwrap().session;
        fs::remove_file(service.stored_file_path(&session)).unwrap();

        let err = service.execute(upload.session_id, None).unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
        assert!(err.is_client_error());
        assert_eq!(
            service.get_session(upload.session_id).unwrap().session.status,
            SessionStatus::Pending
        );
    }

    #[test]
    fn test_unreadable_file_marks_session_failed_and_keeps_file() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        let bytes = xlsx_bytes(&[
            vec![Cell::Text("No PR"), Cell::Text("Nama Barang")],
            vec![Cell::Text("PR-1"), Cell::Text("Widget")],
        ])
        .unwrap();
        let upload = service.upload("corrupt.xlsx", &bytes, None).unwrap();
        let session = service.get_session(upload.session_id).unwrap().session;
        let stored = service.stored_file_path(&session);
        fs::write(&stored, b"definitely not a workbook").unwrap();

        let err = service.execute(upload.session_id, None).unwrap_err();
        assert!(!err.is_client_error());

        let session = service.get_session(upload.session_id).unwrap().session;
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(stored.exists(), "失败会话保留上传文件");
        assert_eq!(
            ProcurementItemRepository::new(conn.clone()).count_all().unwrap(),
            0
        );

        // failed 会话不可重试
        let err = service.execute(upload.session_id, None).unwrap_err();
        assert!(matches!(err, ImportError::InvalidSessionState { .. }));
    }

    #[test]
    fn test_failure_after_row_writes_rolls_back_whole_import() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        let storage = tempfile::tempdir().unwrap();
        let service = create_service(&conn, storage.path()).unwrap();

        // 第一次导入正常完成
        let bytes = csv_bytes(&[&["No PR", "Nama Barang", "Qty"], &["PR-1", "Widget", "5"]]).unwrap();
        let first = service.upload("first.csv", &bytes, None).unwrap();
        service.execute(first.session_id, None).unwrap();

        // 会话置为 completed 时失败: 行已写入事务之后才触发
        conn.lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER block_session_completion
                 BEFORE UPDATE OF status ON import_sessions
                 WHEN NEW.status = 'completed'
                 BEGIN
                     SELECT RAISE(ABORT, 'session completion blocked');
                 END;",
            )
            .unwrap();

        let bytes = csv_bytes(&[
            &["No PR", "Nama Barang", "Qty"],
            &["PR-1", "Widget", "9"],
            &["PR-2", "Gadget", "3"],
        ])
        .unwrap();
        let second = service.upload("second.csv", &bytes, Some(4)).unwrap();
        let session = service.get_session(second.session_id).unwrap().session;
        let stored = service.stored_file_path(&session);

        let err = service.execute(second.session_id, Some(4)).unwrap_err();
        assert!(matches!(err, ImportError::Repository(_)), "{}", err);
        assert!(!err.is_client_error());

        // 新增与更新都已回滚
        let repo = ProcurementItemRepository::new(conn.clone());
        assert_eq!(repo.count_all().unwrap(), 1);
        assert!(repo.list_by_no_pr("PR-2").unwrap().is_empty());
        let widget = &repo.list_by_no_pr("PR-1").unwrap()[0];
        assert_eq!(widget.qty, 5);
        assert_eq!(widget.updated_by, None);

        let session = service.get_session(second.session_id).unwrap().session;
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.processed_rows, 0);
        assert!(stored.exists(), "失败会话保留上传文件");
        assert!(!storage
            .path()
            .join("import_logs")
            .join(format!("import_{}.log", second.session_id))
            .exists());

        let activity = ActivityLogRepository::new(conn.clone())
            .list_by_event_type(ActivityEventType::Imported, 10)
            .unwrap();
        assert_eq!(activity.len(), 1, "失败的导入不写操作日志");
    }
}
