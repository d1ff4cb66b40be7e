use crossbeam::channel::bounded;
use mongo_river::{load_optime, Checkpointer, OpTime};
use std::path::PathBuf;
use std::thread;

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "mongo_river_test_{}_{}.db",
        tag,
        std::process::id()
    ))
}

#[test]
fn test_final_confirmed_optime_is_persisted() {
    let path = temp_path("final");
    let _ = std::fs::remove_file(&path);

    let (confirmed_tx, confirmed_rx) = bounded(1);
    let ckpt = Checkpointer::new(path.clone());
    let handle = thread::spawn(move || ckpt.run(confirmed_rx));

    confirmed_tx.send(OpTime::new(10, 1)).unwrap();
    confirmed_tx.send(OpTime::new(11, 0)).unwrap();
    drop(confirmed_tx);
    handle.join().unwrap();

    // the newest confirmed value wins, whatever the tick timing was.
    assert_eq!(load_optime(&path), Some(OpTime::new(11, 0)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_missing_checkpoint_means_no_resume_point() {
    assert_eq!(load_optime(&temp_path("missing")), None);
}

#[test]
fn test_garbage_checkpoint_means_no_resume_point() {
    let path = temp_path("garbage");
    std::fs::write(&path, "not a number").unwrap();
    assert_eq!(load_optime(&path), None);
    let _ = std::fs::remove_file(&path);
}
