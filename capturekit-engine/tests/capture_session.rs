use capturekit_config::{sample_config_value, CaptureSettings};
use capturekit_engine::{
    CaptureError, CaptureSession, FixedClock, FsStorage, MemoryStorage, NoteOutcome,
    ScriptedPrompts, SessionReport, SinkOutcome, VariableRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

const CONFIG_PATH: &str = "capture/config.json";

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::parse("2024-05-01T18:45:00+02:00").unwrap())
}

fn run_document(document: &Value, answers: Vec<Value>) -> (CaptureSession, MemoryStorage) {
    let storage = MemoryStorage::new().with_file(CONFIG_PATH, document.to_string());
    let session = CaptureSession::new(
        CaptureSettings::default(),
        Arc::new(ScriptedPrompts::new(answers)),
        Arc::new(storage.clone()),
    )
    .with_clock(clock());
    (session, storage)
}

fn running_document() -> Value {
    json!({
        "variables": {"journal": "Journal"},
        "categories": {
            "Exercise": {
                "icon": "🏃",
                "disableCommentField": true,
                "csvPath": "var(journal)/Exercise.csv",
                "notes": [{"path": "var(journal)/", "topOrBottom": "bottom"}],
                "fields": [
                    {"name": "Activity", "prompt": "inputPrompt", "required": true, "write": true, "format": "bold"}
                ]
            }
        }
    })
}

#[tokio::test]
async fn test_cancelled_required_field_writes_nothing() {
    let (session, storage) = run_document(&running_document(), vec![json!("Exercise"), Value::Null]);

    let err = session.run().await.unwrap_err();
    assert!(matches!(err, CaptureError::RequiredFieldBlank { .. }));
    assert!(err.is_abort());
    assert_eq!(storage.paths(), vec![CONFIG_PATH.to_string()]);
}

#[tokio::test]
async fn test_completed_capture_reaches_both_sinks() {
    let (session, storage) =
        run_document(&running_document(), vec![json!("Exercise"), json!("Ran 5k")]);

    let report = session.run().await.unwrap();
    let SessionReport::Completed {
        category,
        writeable_line,
        tabular,
        notes,
        ..
    } = report
    else {
        panic!("expected a completed session, got {report:?}");
    };

    assert_eq!(category, "Exercise");
    assert_eq!(writeable_line, "**Ran 5k**");
    assert_eq!(
        tabular,
        SinkOutcome::Written {
            path: "Journal/Exercise.csv".into(),
            created: true
        }
    );
    assert_eq!(
        storage.file("Journal/Exercise.csv").as_deref(),
        Some("Date,Time,Activity\n\"2024-05-01\",\"18:45:00\",\"Ran 5k\"\n")
    );

    assert!(notes.iter().all(NoteOutcome::is_written));
    let note = storage.file("Journal/🏃 Exercise.md").unwrap();
    assert!(note.ends_with("**Ran 5k**"));
    assert_eq!(note, "\n2024-05-01 18:45:00 - **Ran 5k**");
}

#[tokio::test]
async fn test_host_registry_sees_session_variables() {
    let registry = VariableRegistry::new();
    registry.set("journal", "Elsewhere");
    let (session, storage) =
        run_document(&running_document(), vec![json!("Exercise"), json!("Swim")]);
    let session = session.with_registry(registry.clone());

    session.run().await.unwrap();

    assert_eq!(registry.get_text("journal").as_deref(), Some("Elsewhere"));
    assert_eq!(registry.get_text("name").as_deref(), Some("Exercise"));
    assert_eq!(registry.get_text("writeableLine").as_deref(), Some("**Swim**"));
    assert_eq!(
        registry.get("fieldPairs"),
        Some(json!({"Date": "2024-05-01", "Time": "18:45:00", "Activity": "Swim"}))
    );
    assert!(storage.file("Elsewhere/Exercise.csv").is_some());
}

#[tokio::test]
async fn test_missing_document_creates_sample_and_stops() {
    let storage = MemoryStorage::new();
    let session = CaptureSession::new(
        CaptureSettings::default(),
        Arc::new(ScriptedPrompts::new(vec![json!(true)])),
        Arc::new(storage.clone()),
    );

    let report = session.run().await.unwrap();
    assert_eq!(
        report,
        SessionReport::NotConfigured {
            path: CONFIG_PATH.into(),
            sample_created: true
        }
    );
    let written: Value = serde_json::from_str(&storage.file(CONFIG_PATH).unwrap()).unwrap();
    assert_eq!(written, sample_config_value());
}

#[tokio::test]
async fn test_sample_configuration_captures_exercise() {
    let answers = vec![
        json!("Exercise"),
        json!("🏊 Swim"),
        json!("8"),
        json!("felt strong"),
    ];
    let storage = MemoryStorage::new()
        .with_file(CONFIG_PATH, sample_config_value().to_string())
        .with_file("Journal/Exercise Activities.md", "🏊 Swim\n🏃 Run");
    let session = CaptureSession::new(
        CaptureSettings::default(),
        Arc::new(ScriptedPrompts::new(answers)),
        Arc::new(storage.clone()),
    )
    .with_clock(clock());

    let report = session.run().await;
    let Ok(SessionReport::Completed {
        field_pairs,
        writeable_line,
        ..
    }) = report
    else {
        panic!("expected a completed session, got {report:?}");
    };
    assert_eq!(field_pairs["Activity"], json!("Swim"));
    assert_eq!(field_pairs["Rating"], json!("8"));
    assert_eq!(field_pairs["Comment"], json!("felt strong"));
    assert_eq!(writeable_line, "🏊 _Swim_ - **8/10** - felt strong");
    assert_eq!(
        storage.file("Journal/🏊‍♀️ Exercise.md").as_deref(),
        Some("\n2024-05-01 18:45:00 - 🏊 _Swim_ - **8/10** - felt strong")
    );
}

#[tokio::test]
async fn test_filesystem_storage_round_trip() {
    let root = TempDir::new().unwrap();
    let storage = Arc::new(FsStorage::new(root.path()));
    std::fs::create_dir_all(root.path().join("capture")).unwrap();
    std::fs::write(
        root.path().join(CONFIG_PATH),
        running_document().to_string(),
    )
    .unwrap();

    for answer in ["Ran 5k", "Ran 10k"] {
        let session = CaptureSession::new(
            CaptureSettings::default(),
            Arc::new(ScriptedPrompts::new(vec![json!("Exercise"), json!(answer)])),
            storage.clone(),
        )
        .with_clock(clock());
        session.run().await.unwrap();
    }

    let csv = std::fs::read_to_string(root.path().join("Journal/Exercise.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.ends_with("\"Ran 10k\"\n"));

    let note = std::fs::read_to_string(root.path().join("Journal/🏃 Exercise.md")).unwrap();
    assert_eq!(
        note,
        "\n2024-05-01 18:45:00 - **Ran 5k**\n2024-05-01 18:45:00 - **Ran 10k**"
    );
}
