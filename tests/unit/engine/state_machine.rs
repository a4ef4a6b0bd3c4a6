use super::*;
use crate::encode::sink::InMemorySink;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "watermarker_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn engine() -> Engine {
    let opts = EngineOpts {
        threads: Some(2),
        ..EngineOpts::default()
    };
    Engine::with_sink(opts, Arc::new(InMemorySink::new())).unwrap()
}

fn missing_of(err: WatermarkError) -> Vec<InputKind> {
    match err {
        WatermarkError::MissingInput { missing } => missing,
        other => panic!("expected missing input, got {other:?}"),
    }
}

#[test]
fn fresh_pass_lists_every_missing_input() {
    let err = prepare_pass(&Settings::default(), true).err().unwrap();
    assert_eq!(
        missing_of(err),
        vec![InputKind::Sources, InputKind::Watermark, InputKind::OutputDir]
    );
}

#[test]
fn resumed_pass_does_not_require_sources() {
    let settings = Settings {
        output_dir: Some(PathBuf::from("/tmp")),
        ..Settings::default()
    };
    let err = prepare_pass(&settings, false).err().unwrap();
    assert_eq!(missing_of(err), vec![InputKind::Watermark]);
}

#[test]
fn sources_alone_missing_is_reported() {
    let settings = Settings {
        watermark: Some(PathBuf::from("wm.png")),
        output_dir: Some(PathBuf::from("/tmp")),
        ..Settings::default()
    };
    let err = prepare_pass(&settings, true).err().unwrap();
    assert_eq!(missing_of(err), vec![InputKind::Sources]);
}

#[test]
fn output_dir_must_exist() {
    let tmp = temp_dir("sm_outdir");
    let err = check_output_dir(&tmp.join("nope")).unwrap_err();
    assert!(matches!(err, WatermarkError::Configuration(_)));

    std::fs::create_dir_all(&tmp).unwrap();
    check_output_dir(&tmp).unwrap();
    // The probe file does not linger.
    assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn undecodable_watermark_is_a_configuration_error() {
    let tmp = temp_dir("sm_badwm");
    std::fs::create_dir_all(&tmp).unwrap();
    let wm = tmp.join("wm.png");
    std::fs::write(&wm, b"not a png").unwrap();

    let settings = Settings {
        sources: vec![tmp.join("a.png")],
        watermark: Some(wm),
        output_dir: Some(tmp.clone()),
        ..Settings::default()
    };
    let err = prepare_pass(&settings, true).err().unwrap();
    assert!(matches!(err, WatermarkError::Configuration(_)));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn host_callbacks_update_ledger_and_preview() {
    let engine = engine();
    let a = PathBuf::from("a.png");
    let b = PathBuf::from("b.png");
    engine.shared.lock().ledger.seed(&[a.clone(), b.clone()]);
    let before = engine.progress().generation;

    engine.shared.image_marked(
        &a,
        PreviewFrame {
            source: a.clone(),
            format: image::ImageFormat::Png,
            bytes: vec![1, 2, 3],
        },
    );
    engine.shared.image_failed(&b);

    let progress = engine.progress();
    assert_eq!((progress.todo, progress.done), (0, 1));
    assert!(progress.generation > before);
    assert_eq!(engine.latest_preview().unwrap().source, a);
}

#[test]
fn wait_for_change_times_out_without_changes() {
    let engine = engine();
    let seen = engine.progress().generation;
    let progress = engine.wait_for_change(seen, Duration::from_millis(20));
    assert_eq!(progress.generation, seen);
    assert_eq!(progress.state, RunState::Idle);
}

#[test]
fn settled_engine_does_not_block() {
    assert_eq!(engine().wait_until_settled(), RunState::Idle);
}

#[test]
fn resume_from_requires_idle() {
    let engine = engine();
    let snapshot = LedgerSnapshot {
        todo: vec![PathBuf::from("a.png")],
        done: vec![PathBuf::from("b.png")],
    };
    assert_eq!(engine.resume_from(snapshot.clone()).unwrap(), RunState::Paused);
    assert_eq!((engine.todo_count(), engine.done_count()), (1, 1));

    assert!(matches!(
        engine.resume_from(snapshot),
        Err(WatermarkError::Validation(_))
    ));
}

#[test]
fn finished_snapshot_stays_idle() {
    let engine = engine();
    let snapshot = LedgerSnapshot {
        todo: Vec::new(),
        done: vec![PathBuf::from("b.png")],
    };
    assert_eq!(engine.resume_from(snapshot).unwrap(), RunState::Idle);
    assert_eq!(engine.done_count(), 1);
}

#[test]
fn preview_needs_a_watermark() {
    let engine = engine();
    assert!(engine.render_single_preview(Path::new("a.png")).is_none());
}

#[test]
fn concurrent_output_checks_do_not_collide() {
    let tmp = temp_dir("sm_probe_race");
    std::fs::create_dir_all(&tmp).unwrap();

    std::thread::scope(|s| {
        let checks: Vec<_> = (0..8).map(|_| s.spawn(|| check_output_dir(&tmp))).collect();
        for check in checks {
            check.join().unwrap().unwrap();
        }
    });
    assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn folded_ledger_seeds_the_next_fresh_run() {
    let engine = engine();
    engine
        .resume_from(LedgerSnapshot {
            todo: vec![PathBuf::from("a.png")],
            done: Vec::new(),
        })
        .unwrap();
    assert_eq!(engine.shared.lock().seed_for(Action::StartFresh), Seed::Ledger);

    engine.request_transition(Intent::Cancel).unwrap();
    assert_eq!(engine.shared.lock().seed_for(Action::StartFresh), Seed::Ledger);

    engine.set_sources(vec![PathBuf::from("b.png")]);
    assert_eq!(engine.shared.lock().seed_for(Action::StartFresh), Seed::Sources);
}
