use anyhow::Result;
use extract_diff::delta::{DeltaPipeline, Stage, TreeComparator, prune_empty_dirs};
use extract_diff::{ArchiveCodec, Error};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// 以 `/` 分隔的相对路径到文件内容
fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/");
            (relative, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn dirs_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().to_path_buf())
        .collect()
}

fn tree(entries: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
    entries
        .iter()
        .map(|(path, contents)| (path.to_string(), contents.to_vec()))
        .collect()
}

#[test]
fn compare_copies_only_changed_file() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    write_file(old.path(), "a.txt", b"x");
    write_file(old.path(), "b/c.txt", b"y");
    write_file(new.path(), "a.txt", b"x");
    write_file(new.path(), "b/c.txt", b"z");

    let summary = TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert_eq!(read_tree(&delta), tree(&[("b/c.txt", b"z")]));
    assert_eq!(summary.copied, vec![Path::new("b").join("c.txt")]);
    assert_eq!(summary.unchanged, 1);

    prune_empty_dirs(&delta);
    assert!(delta.join("b").is_dir());
    Ok(())
}

#[test]
fn compare_identical_trees_yields_no_files() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    write_file(old.path(), "a.txt", b"x");
    write_file(new.path(), "a.txt", b"x");

    let summary = TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert!(summary.copied.is_empty());
    assert!(read_tree(&delta).is_empty());
    Ok(())
}

#[test]
fn compare_detects_difference_in_last_byte() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    let mut old_bytes = vec![7u8; 20_000];
    let mut new_bytes = old_bytes.clone();
    *old_bytes.last_mut().unwrap() = 1;
    *new_bytes.last_mut().unwrap() = 2;
    write_file(old.path(), "lib/data.bin", &old_bytes);
    write_file(new.path(), "lib/data.bin", &new_bytes);

    TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert_eq!(fs::read(delta.join("lib/data.bin"))?, new_bytes);
    Ok(())
}

#[test]
fn compare_emits_new_files_and_new_directories_in_full() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    write_file(old.path(), "keep.txt", b"same");
    write_file(old.path(), "resized.txt", b"short");
    write_file(new.path(), "keep.txt", b"same");
    write_file(new.path(), "resized.txt", b"much longer");
    write_file(new.path(), "added.txt", b"new");
    write_file(new.path(), "plugins/x/one.dll", b"1");
    write_file(new.path(), "plugins/x/deep/two.dll", b"2");

    TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert_eq!(
        read_tree(&delta),
        tree(&[
            ("added.txt", b"new"),
            ("plugins/x/deep/two.dll", b"2"),
            ("plugins/x/one.dll", b"1"),
            ("resized.txt", b"much longer"),
        ])
    );
    Ok(())
}

#[test]
fn compare_keeps_directory_skeleton_for_unchanged_subtrees() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    write_file(old.path(), "bin/app.dll", b"app");
    write_file(new.path(), "bin/app.dll", b"app");
    write_file(new.path(), "empty/inner/.keep", b"");
    fs::remove_file(new.path().join("empty/inner/.keep"))?;

    TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert!(delta.join("bin").is_dir());
    assert!(delta.join("empty/inner").is_dir());
    assert!(read_tree(&delta).is_empty());
    Ok(())
}

#[test]
fn compare_overwrites_existing_delta_file() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    write_file(new.path(), "a.txt", b"fresh");
    write_file(&delta, "a.txt", b"stale content");

    TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert_eq!(fs::read(delta.join("a.txt"))?, b"fresh");
    Ok(())
}

#[test]
fn prune_removes_directories_without_files() -> Result<()> {
    let root = TempDir::new()?;

    fs::create_dir_all(root.path().join("a/b/c"))?;
    fs::create_dir_all(root.path().join("d"))?;
    write_file(root.path(), "e/f/keep.txt", b"keep");
    fs::create_dir_all(root.path().join("e/empty"))?;

    let removed = prune_empty_dirs(root.path());

    assert_eq!(removed, 5);
    assert!(root.path().is_dir());
    assert_eq!(
        dirs_under(root.path()),
        vec![root.path().join("e"), root.path().join("e/f")]
    );
    assert_eq!(read_tree(root.path()), tree(&[("e/f/keep.txt", b"keep")]));
    Ok(())
}

#[test]
fn prune_is_idempotent_and_keeps_root() -> Result<()> {
    let root = TempDir::new()?;

    fs::create_dir_all(root.path().join("x/y"))?;
    write_file(root.path(), "z/file.txt", b"1");

    prune_empty_dirs(root.path());
    let first = (dirs_under(root.path()), read_tree(root.path()));
    let removed_again = prune_empty_dirs(root.path());
    let second = (dirs_under(root.path()), read_tree(root.path()));

    assert_eq!(removed_again, 0);
    assert_eq!(first, second);

    let empty = TempDir::new()?;
    assert_eq!(prune_empty_dirs(empty.path()), 0);
    assert!(empty.path().is_dir());
    Ok(())
}

#[test]
fn prune_ignores_missing_root() {
    let root = TempDir::new().unwrap();
    assert_eq!(prune_empty_dirs(&root.path().join("missing")), 0);
}

fn package(work: &Path, name: &str, files: &[(&str, &[u8])]) -> Result<PathBuf> {
    let staging = TempDir::new()?;
    for (path, contents) in files {
        write_file(staging.path(), path, contents);
    }
    let archive = work.join(name);
    ArchiveCodec::new().create(&archive, staging.path())?;
    Ok(archive)
}

fn workspace_names(work: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(work)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn pipeline_produces_delta_archive_and_cleans_up() -> Result<()> {
    let work = TempDir::new()?;
    let old = package(
        work.path(),
        "Pkg.1.0.0.zip",
        &[
            ("web.config", b"<config/>"),
            ("bin/core.dll", b"core-v1"),
            ("views/home.cshtml", b"home"),
        ],
    )?;
    let new = package(
        work.path(),
        "Pkg.1.0.1.zip",
        &[
            ("web.config", b"<config/>"),
            ("bin/core.dll", b"core-v2"),
            ("views/home.cshtml", b"home"),
            ("views/partials/nav.cshtml", b"nav"),
        ],
    )?;
    let output = work.path().join("Pkg.Diff.1.0.0-1.0.1.zip");

    let report = DeltaPipeline::default().run(&old, &new, &output)?;

    assert_eq!(report.copied_files, 2);
    assert_eq!(report.unchanged_files, 2);
    assert_eq!(report.archive_sha256.len(), 64);
    assert_eq!(
        workspace_names(work.path()),
        vec!["Pkg.1.0.0.zip", "Pkg.1.0.1.zip", "Pkg.Diff.1.0.0-1.0.1.zip"]
    );

    let extracted = TempDir::new()?;
    let out_dir = extracted.path().join("delta");
    ArchiveCodec::new().extract(&output, &out_dir)?;
    assert_eq!(
        read_tree(&out_dir),
        tree(&[
            ("bin/core.dll", b"core-v2"),
            ("views/partials/nav.cshtml", b"nav"),
        ])
    );
    Ok(())
}

#[test]
fn pipeline_with_identical_packages_writes_empty_archive() -> Result<()> {
    let work = TempDir::new()?;
    let old = package(work.path(), "Pkg.1.0.0.zip", &[("a.txt", b"x")])?;
    let new = package(work.path(), "Pkg.1.0.1.zip", &[("a.txt", b"x")])?;
    let output = work.path().join("Pkg.Diff.1.0.0-1.0.1.zip");

    let report = DeltaPipeline::default().run(&old, &new, &output)?;

    assert_eq!(report.copied_files, 0);
    let archive = zip::ZipArchive::new(fs::File::open(&output)?)?;
    assert_eq!(archive.len(), 0);
    Ok(())
}

#[test]
fn pipeline_fails_on_corrupt_archive_and_cleans_up() -> Result<()> {
    let work = TempDir::new()?;
    let old = work.path().join("Pkg.1.0.0.zip");
    fs::write(&old, b"this is not a zip file")?;
    let new = package(work.path(), "Pkg.1.0.1.zip", &[("a.txt", b"x")])?;
    let output = work.path().join("Pkg.Diff.1.0.0-1.0.1.zip");

    let err = DeltaPipeline::default()
        .run(&old, &new, &output)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Extracting);
    assert!(matches!(err.source, Error::ArchiveCorrupt { .. }));
    assert!(!output.exists());
    assert_eq!(
        workspace_names(work.path()),
        vec!["Pkg.1.0.0.zip", "Pkg.1.0.1.zip"]
    );
    Ok(())
}

#[test]
fn pipeline_reports_missing_input() -> Result<()> {
    let work = TempDir::new()?;
    let new = package(work.path(), "Pkg.1.0.1.zip", &[("a.txt", b"x")])?;
    let old = work.path().join("Pkg.1.0.0.zip");
    let output = work.path().join("Pkg.Diff.1.0.0-1.0.1.zip");

    let err = DeltaPipeline::default()
        .run(&old, &new, &output)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Extracting);
    assert!(matches!(err.source, Error::MissingInput(ref path) if path == &old));
    assert_eq!(workspace_names(work.path()), vec!["Pkg.1.0.1.zip"]);
    Ok(())
}

#[test]
fn pipeline_reuses_existing_extraction_directory() -> Result<()> {
    let work = TempDir::new()?;
    let old = package(work.path(), "Pkg.1.0.0.zip", &[("a.txt", b"x")])?;
    let new = package(work.path(), "Pkg.1.0.1.zip", &[("a.txt", b"x")])?;
    let output = work.path().join("Pkg.Diff.1.0.0-1.0.1.zip");

    // 已存在的解压目录不会被重新解压
    write_file(&work.path().join("Pkg.1.0.1"), "a.txt", b"from cache");

    let report = DeltaPipeline::default().run(&old, &new, &output)?;

    assert_eq!(report.copied_files, 1);
    // 复用的目录不是本次运行创建的，需要保留
    assert_eq!(
        fs::read(work.path().join("Pkg.1.0.1").join("a.txt"))?,
        b"from cache"
    );
    assert_eq!(
        workspace_names(work.path()),
        vec![
            "Pkg.1.0.0.zip",
            "Pkg.1.0.1",
            "Pkg.1.0.1.zip",
            "Pkg.Diff.1.0.0-1.0.1.zip"
        ]
    );
    Ok(())
}

#[test]
fn pipeline_refuses_existing_delta_directory() -> Result<()> {
    let work = TempDir::new()?;
    let old = package(work.path(), "Pkg.1.0.0.zip", &[("a.txt", b"x")])?;
    let new = package(work.path(), "Pkg.1.0.1.zip", &[("a.txt", b"y")])?;
    let output = work.path().join("Pkg.Diff.1.0.0-1.0.1.zip");
    let notes = write_file(&work.path().join("Pkg.Diff.1.0.0-1.0.1"), "notes.txt", b"keep");

    let err = DeltaPipeline::default()
        .run(&old, &new, &output)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Comparing);
    assert!(matches!(err.source, Error::WorkingDirExists(_)));
    assert_eq!(fs::read(&notes)?, b"keep");
    assert!(!output.exists());
    assert_eq!(
        workspace_names(work.path()),
        vec!["Pkg.1.0.0.zip", "Pkg.1.0.1.zip", "Pkg.Diff.1.0.0-1.0.1"]
    );
    Ok(())
}

#[test]
fn compare_aborts_on_io_failure() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    write_file(new.path(), "sub/x.txt", b"x");
    // 增量目录中同名的普通文件让子目录无法创建
    write_file(&delta, "sub", b"not a directory");

    let result = TreeComparator::new().compare(new.path(), old.path(), &delta);

    assert!(matches!(result, Err(Error::Filesystem { .. })));
    Ok(())
}

#[cfg(unix)]
#[test]
fn compare_follows_file_symlinks_and_skips_directory_symlinks() -> Result<()> {
    use std::os::unix::fs::symlink;

    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    let data = write_file(new.path(), "data/f.txt", b"payload");
    symlink(&data, new.path().join("link_file"))?;
    symlink(new.path().join("data"), new.path().join("link_dir"))?;
    symlink(new.path().join("missing"), new.path().join("dangling"))?;

    let summary = TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    let mut copied = summary.copied.clone();
    copied.sort();
    assert_eq!(
        copied,
        vec![PathBuf::from("data/f.txt"), PathBuf::from("link_file")]
    );
    assert_eq!(
        read_tree(&delta),
        tree(&[("data/f.txt", b"payload"), ("link_file", b"payload")])
    );
    Ok(())
}

#[test]
fn compare_detects_change_beyond_first_buffer() -> Result<()> {
    let old = TempDir::new()?;
    let new = TempDir::new()?;
    let work = TempDir::new()?;
    let delta = work.path().join("delta");

    let contents: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let mut changed = contents.clone();
    changed[8192 + 10] ^= 0xff;

    write_file(old.path(), "same.bin", &contents);
    write_file(new.path(), "same.bin", &contents);
    write_file(old.path(), "late.bin", &contents);
    write_file(new.path(), "late.bin", &changed);

    let summary = TreeComparator::new().compare(new.path(), old.path(), &delta)?;

    assert_eq!(summary.copied, vec![PathBuf::from("late.bin")]);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(fs::read(delta.join("late.bin"))?, changed);
    Ok(())
}
