use super::*;

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

fn touch(path: &Path) {
    std::fs::write(path, b"").unwrap();
}

#[test]
fn scan_filters_extensions_and_skips_subdirectories() {
    let tmp = temp_dir("scan_filter");
    std::fs::create_dir_all(tmp.join("nested.png")).unwrap();
    touch(&tmp.join("b.jpg"));
    touch(&tmp.join("a.png"));
    touch(&tmp.join("c.jpeg"));
    touch(&tmp.join("notes.txt"));
    touch(&tmp.join("noext"));
    touch(&tmp.join("nested.png").join("deep.png"));

    let found = find_images(&tmp, ExtensionCase::Exact).unwrap();
    let names: Vec<_> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.png", "b.jpg", "c.jpeg"]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn scan_case_policy() {
    let tmp = temp_dir("scan_case");
    std::fs::create_dir_all(&tmp).unwrap();
    touch(&tmp.join("upper.JPG"));
    touch(&tmp.join("lower.png"));

    assert_eq!(find_images(&tmp, ExtensionCase::Exact).unwrap().len(), 1);
    assert_eq!(find_images(&tmp, ExtensionCase::Insensitive).unwrap().len(), 2);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn scan_missing_folder_is_an_error() {
    let tmp = temp_dir("scan_missing");
    assert!(find_images(&tmp, ExtensionCase::default()).is_err());
}
