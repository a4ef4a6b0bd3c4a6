use super::*;

#[test]
fn output_path_keeps_extension_and_appends_suffix() {
    let out = OutputSpec {
        dir: PathBuf::from("out"),
        suffix: "-wm".to_string(),
    };
    assert_eq!(
        out.path_for(Path::new("/photos/beach.JPG")),
        PathBuf::from("out").join("beach-wm.JPG")
    );
    assert_eq!(
        out.path_for(Path::new("a/b/c.tar.png")),
        PathBuf::from("out").join("c.tar-wm.png")
    );
}

#[test]
fn output_path_without_suffix_or_extension() {
    let out = OutputSpec {
        dir: PathBuf::from("out"),
        suffix: String::new(),
    };
    assert_eq!(
        out.path_for(Path::new("img.png")),
        PathBuf::from("out").join("img.png")
    );
    assert_eq!(
        out.path_for(Path::new("README")),
        PathBuf::from("out").join("README")
    );
}

#[test]
fn busy_and_transient_states() {
    assert!(!RunState::Idle.is_busy());
    assert!(!RunState::Paused.is_busy());
    assert!(RunState::Running.is_busy());
    assert!(RunState::Pausing.is_busy());
    assert!(RunState::Canceling.is_busy());

    assert!(RunState::Pausing.is_transient());
    assert!(RunState::Canceling.is_transient());
    assert!(!RunState::Running.is_transient());
}

#[test]
fn run_state_serializes_snake_case() {
    let json = serde_json::to_string(&RunState::Canceling).unwrap();
    assert_eq!(json, "\"canceling\"");
    let back: RunState = serde_json::from_str("\"paused\"").unwrap();
    assert_eq!(back, RunState::Paused);
}
