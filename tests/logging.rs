use std::fs;

use tempfile::tempdir;

#[test]
fn writes_log_file_and_flushes_on_deinit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("modlhandler.log");

    let guard = modl_handler::logging::init(true, Some(path.clone()));
    tracing::info!("\"modl://skyrim/?url=x\"");
    modl_handler::logging::deinit(guard);

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("modl://skyrim/?url=x"));
}
