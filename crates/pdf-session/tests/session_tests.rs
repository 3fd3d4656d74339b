use lopdf::{Dictionary, Document, Object, Stream};
use pdf_session::*;
use std::sync::Arc;

fn create_test_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 12 Tf 72 72 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(pages as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

fn sample_files() -> Vec<UploadedFile> {
    vec![
        UploadedFile::new("Drift/Unit1/a.pdf", "application/pdf", create_test_pdf(2)),
        UploadedFile::new("Drift/Unit2/b.pdf", "application/pdf", create_test_pdf(1)),
        UploadedFile::new("Drift/readme.txt", "text/plain", b"skip".to_vec()),
    ]
}

fn options(name: &str) -> AssemblyOptions {
    AssemblyOptions {
        output_name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ingest_reports_and_returns_hierarchy() {
    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::Ingest {
        files: sample_files(),
    })
    .unwrap();

    match rx.recv().await.unwrap() {
        SessionUpdate::Ingested { report, hierarchy } => {
            assert_eq!(report.accepted, 2);
            assert_eq!(report.rejected, vec!["Drift/readme.txt"]);
            assert_eq!(hierarchy.container_count(), 3);
            assert_eq!(hierarchy.file_count(), 2);
        }
        other => panic!("Expected Ingested, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_container_visibility_is_a_no_op() {
    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::Ingest {
        files: sample_files(),
    })
    .unwrap();
    tx.send(SessionCommand::SetVisibility {
        id: ContainerId(999),
        visible: false,
    })
    .unwrap();
    drop(tx);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    // Only the ingest answers; the unknown id neither errors nor changes anything
    assert_eq!(updates.len(), 1);
    assert!(matches!(updates[0], SessionUpdate::Ingested { .. }));
}

#[tokio::test]
async fn test_visibility_change_returns_hierarchy() {
    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::Ingest {
        files: sample_files(),
    })
    .unwrap();
    let unit1 = match rx.recv().await.unwrap() {
        SessionUpdate::Ingested { hierarchy, .. } => hierarchy.sections()[0].children[0].id,
        other => panic!("Expected Ingested, got {:?}", other),
    };

    tx.send(SessionCommand::SetVisibility {
        id: unit1,
        visible: false,
    })
    .unwrap();
    match rx.recv().await.unwrap() {
        SessionUpdate::HierarchyChanged { hierarchy } => {
            assert!(!hierarchy.find(unit1).unwrap().show_in_toc);
        }
        other => panic!("Expected HierarchyChanged, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reorder_changes_session_hierarchy() {
    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::Ingest {
        files: sample_files(),
    })
    .unwrap();
    let hierarchy = match rx.recv().await.unwrap() {
        SessionUpdate::Ingested { hierarchy, .. } => hierarchy,
        other => panic!("Expected Ingested, got {:?}", other),
    };

    let drift = &hierarchy.sections()[0];
    let ids: Vec<ContainerId> = drift.children.iter().rev().map(|c| c.id).collect();
    tx.send(SessionCommand::Reorder {
        group: SiblingGroup::Children(drift.id),
        order: ids,
    })
    .unwrap();

    match rx.recv().await.unwrap() {
        SessionUpdate::HierarchyChanged { hierarchy } => {
            let titles: Vec<&str> = hierarchy.sections()[0]
                .children
                .iter()
                .map(|c| c.title.as_str())
                .collect();
            assert_eq!(titles, vec!["Unit2", "Unit1"]);
        }
        other => panic!("Expected HierarchyChanged, got {:?}", other),
    }

    // A permutation with a missing id is rejected and leaves the order alone
    tx.send(SessionCommand::Reorder {
        group: SiblingGroup::Root,
        order: Vec::new(),
    })
    .unwrap();
    assert!(matches!(
        rx.recv().await.unwrap(),
        SessionUpdate::Error { .. }
    ));
}

#[tokio::test]
async fn test_invalid_options_are_rejected() {
    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::SetOptions {
        options: options(""),
    })
    .unwrap();
    assert!(matches!(
        rx.recv().await.unwrap(),
        SessionUpdate::Error { .. }
    ));

    tx.send(SessionCommand::SetOptions {
        options: options("Valid"),
    })
    .unwrap();
    match rx.recv().await.unwrap() {
        SessionUpdate::OptionsChanged { options } => assert_eq!(options.output_name, "Valid"),
        other => panic!("Expected OptionsChanged, got {:?}", other),
    }
}

#[tokio::test]
async fn test_assemble_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = spawn();

    tx.send(SessionCommand::Ingest {
        files: sample_files(),
    })
    .unwrap();
    tx.send(SessionCommand::SetFrontPage {
        bytes: Some(Arc::from(create_test_pdf(1))),
    })
    .unwrap();
    tx.send(SessionCommand::SetOptions {
        options: options("Drift"),
    })
    .unwrap();
    tx.send(SessionCommand::Assemble {
        output_dir: Some(dir.path().to_path_buf()),
    })
    .unwrap();

    assert!(matches!(
        rx.recv().await.unwrap(),
        SessionUpdate::Ingested { .. }
    ));
    match rx.recv().await.unwrap() {
        SessionUpdate::FrontMatterChanged {
            front_page,
            standard_cover,
        } => {
            assert!(front_page);
            assert!(!standard_cover);
        }
        other => panic!("Expected FrontMatterChanged, got {:?}", other),
    }
    assert!(matches!(
        rx.recv().await.unwrap(),
        SessionUpdate::OptionsChanged { .. }
    ));

    match rx.recv().await.unwrap() {
        SessionUpdate::Assembled { document, path } => {
            // Front page, one table of contents page, three body pages
            assert_eq!(document.page_count, 5);
            assert_eq!(document.front_matter_pages, 1);
            assert_eq!(document.toc_pages, 1..2);
            let path = path.unwrap();
            assert_eq!(path, dir.path().join("Drift.pdf"));
            let saved = Document::load(&path).unwrap();
            assert_eq!(saved.get_pages().len(), 5);
        }
        other => panic!("Expected Assembled, got {:?}", other),
    }
}

#[tokio::test]
async fn test_queued_stats_requests_are_coalesced() {
    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::Ingest {
        files: sample_files(),
    })
    .unwrap();
    for _ in 0..3 {
        tx.send(SessionCommand::CalculateStats).unwrap();
    }
    tx.send(SessionCommand::Clear).unwrap();
    drop(tx);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    assert_eq!(updates.len(), 3);
    assert!(matches!(updates[0], SessionUpdate::Ingested { .. }));
    match &updates[1] {
        SessionUpdate::StatsCalculated { stats } => {
            assert_eq!(stats.containers, 3);
            assert_eq!(stats.pdf_files, 2);
            assert_eq!(stats.toc_pages, 1);
        }
        other => panic!("Expected StatsCalculated, got {:?}", other),
    }
    match &updates[2] {
        SessionUpdate::HierarchyChanged { hierarchy } => assert!(hierarchy.is_empty()),
        other => panic!("Expected HierarchyChanged, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_directory_and_profile() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Service");
    std::fs::create_dir_all(root.join("Pumps")).unwrap();
    std::fs::write(root.join("Pumps").join("p.pdf"), create_test_pdf(1)).unwrap();

    let profile_path = dir.path().join("profile.json");
    std::fs::write(
        &profile_path,
        r#"{"name":"HVAC Skolen","projectType":"HVAC","documentNumberLeft":"D-1"}"#,
    )
    .unwrap();

    let (tx, mut rx) = spawn();
    tx.send(SessionCommand::LoadDirectory { path: root }).unwrap();
    tx.send(SessionCommand::LoadProfile { path: profile_path })
        .unwrap();

    match rx.recv().await.unwrap() {
        SessionUpdate::Ingested { report, hierarchy } => {
            assert_eq!(report.accepted, 1);
            assert_eq!(hierarchy.sections()[0].title, "Service");
            assert_eq!(hierarchy.sections()[0].children[0].title, "Pumps");
        }
        other => panic!("Expected Ingested, got {:?}", other),
    }
    match rx.recv().await.unwrap() {
        SessionUpdate::OptionsChanged { options } => {
            assert_eq!(options.output_name, "Skolen HVAC SQP");
            assert_eq!(options.document_number_left, "D-1");
        }
        other => panic!("Expected OptionsChanged, got {:?}", other),
    }
}
