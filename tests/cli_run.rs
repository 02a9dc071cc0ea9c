use clap::Parser;
use combo_dedup::{Args, Processor, ProcessorConfig};
use std::fs;
use tempfile::TempDir;

#[test]
fn processes_task_folder_into_timestamped_results() {
    let root = TempDir::new().unwrap();
    let task = root.path().join("task");
    let result = root.path().join("result");
    fs::create_dir(&task).unwrap();
    fs::write(
        task.join("combo.txt"),
        "a@x.com:pw1\r\na@x.com:pw2\nb@x.com|pw3\ngarbage_no_sep\nb@x.com:pw4\n",
    )
    .unwrap();

    let args = Args::try_parse_from([
        "combo-dedup",
        "-i",
        task.to_str().unwrap(),
        "-o",
        result.to_str().unwrap(),
        "-t",
        "4",
        "-q",
    ])
    .unwrap();

    let config = ProcessorConfig::from_args(&args).unwrap();
    let summary = Processor::new(config).process(&args.input).unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.processed_lines(), 5);

    let outputs: Vec<_> = fs::read_dir(&result)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(outputs.len(), 1);

    let name = outputs[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("combo_"));
    assert!(name.ends_with(".txt"));
    // combo_YYYY-mm-dd_HH-MM-SS.txt
    assert_eq!(name.len(), "combo_".len() + 19 + ".txt".len());

    let mut tokens: Vec<String> = fs::read_to_string(&outputs[0])
        .unwrap()
        .lines()
        .map(String::from)
        .collect();
    tokens.sort();
    assert_eq!(tokens, vec!["a@x.com", "b@x.com"]);
}

#[test]
fn recursive_scan_picks_up_nested_files() {
    let root = TempDir::new().unwrap();
    let task = root.path().join("task");
    let nested = task.join("nested");
    fs::create_dir_all(&nested).unwrap();
    fs::write(task.join("top.txt"), "a@x.com:1\n").unwrap();
    fs::write(nested.join("deep.txt"), "b@x.com:1\n").unwrap();

    let config = ProcessorConfig {
        output_dir: root.path().join("result"),
        worker_count: 2,
        ..ProcessorConfig::default()
    };
    let flat = Processor::new(config.clone()).process(&task).unwrap();
    assert_eq!(flat.files.len(), 1);

    let config = ProcessorConfig {
        recursive: true,
        ..config
    };
    let deep = Processor::new(config).process(&task).unwrap();
    assert_eq!(deep.files.len(), 2);
}
