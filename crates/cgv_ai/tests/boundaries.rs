use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(p) = stack.pop() {
        let entries = match fs::read_dir(&p) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for ent in entries.flatten() {
            let path = ent.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn cgv_ai_does_not_reimplement_citation_extraction() {
    // Grounding decisions belong to cgv_core; this crate only transports evidence.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let files = collect_rs_files(&src_root);
    assert!(!files.is_empty());

    for f in files {
        let text = fs::read_to_string(&f).unwrap_or_default();
        assert!(
            !text.contains("Regex"),
            "citation pattern found in {}",
            f.display()
        );
        assert!(
            !text.contains("მუხლ"),
            "citation vocabulary found in {}",
            f.display()
        );
    }
}

#[test]
fn cgv_core_stays_free_of_network_code() {
    let core_src = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("cgv_core")
        .join("src");
    let files = collect_rs_files(&core_src);
    assert!(!files.is_empty());

    for f in files {
        let text = fs::read_to_string(&f).unwrap_or_default();
        for forbidden in ["ureq::", "tokio::", "std::net"] {
            assert!(
                !text.contains(forbidden),
                "`{forbidden}` used in {}",
                f.display()
            );
        }
    }
}
