//! End-to-end walker tests against real temporary directory trees.
//!
//! Every test builds a tree with `tempfile`, runs the real
//! `DirectoryScanner` over it with the OS filesystem and compares the
//! reported matches as a set, since report order depends on scheduling.
use crossbeam_channel::bounded;
use projects_core::lister::ProjectLister;
use projects_core::sink::MatchSink;
use projects_core::walker::{DirectoryScanner, ScanError, ScanOptions, ScanSummary};
use projects_core::Match;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Longest a single scan may take before the test is declared hung.
const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

fn mkdir(path: &Path) {
    fs::create_dir_all(path).unwrap();
}

fn repo(path: &Path) {
    mkdir(&path.join(".git"));
}

/// Run a scan on its own thread so a completion-detection bug fails the
/// test instead of hanging it.
fn scan(root: &Path, workers: usize) -> (BTreeSet<Match>, ScanSummary) {
    let (tx, rx) = bounded(1);
    let root = root.to_path_buf();
    thread::spawn(move || {
        let sink = Arc::new(MatchSink::new());
        let collector = Arc::clone(&sink);
        let result = DirectoryScanner::new(root)
            .with_options(ScanOptions::default().with_workers(workers))
            .scan(move |m| collector.add(m))
            .map(|summary| {
                let matches: BTreeSet<Match> = sink.snapshot().into_iter().collect();
                (matches, summary)
            });
        let _ = tx.send(result);
    });

    rx.recv_timeout(SCAN_TIMEOUT)
        .unwrap_or_else(|_| panic!("scan did not complete within {SCAN_TIMEOUT:?}"))
        .expect("scan failed")
}

fn expected(items: &[(&str, PathBuf)]) -> BTreeSet<Match> {
    items
        .iter()
        .map(|(name, path)| Match::new(*name, path.clone()))
        .collect()
}

/// Generated directory: whether it carries the marker, whether it holds a
/// plain file, and its subdirectories.
#[derive(Debug, Clone)]
struct TreeShape {
    marked: bool,
    has_file: bool,
    children: Vec<TreeShape>,
}

// Random fanout per directory, random marker placement, up to 4 levels.
// Marked directories may contain further marked directories.
fn tree_strategy() -> impl Strategy<Value = TreeShape> {
    let leaf = (prop::bool::weighted(0.3), prop::bool::weighted(0.25)).prop_map(
        |(marked, has_file)| TreeShape {
            marked,
            has_file,
            children: Vec::new(),
        },
    );
    leaf.prop_recursive(4, 48, 4, |inner| {
        (
            prop::bool::weighted(0.3),
            prop::bool::weighted(0.25),
            prop::collection::vec(inner, 0..5),
        )
            .prop_map(|(marked, has_file, children)| TreeShape {
                marked,
                has_file,
                children,
            })
    })
}

fn forest_strategy() -> impl Strategy<Value = Vec<TreeShape>> {
    prop::collection::vec(tree_strategy(), 0..5)
}

/// Create `shapes` under `dir` and collect the project roots a correct
/// walker must report: marked directories with no marked ancestor.
fn materialize(
    shapes: &[TreeShape],
    dir: &Path,
    inside_project: bool,
    out: &mut BTreeSet<Match>,
) {
    for (i, shape) in shapes.iter().enumerate() {
        let child = dir.join(format!("d{i}"));
        mkdir(&child);
        if shape.has_file {
            fs::write(child.join(format!("file{i}.txt")), b"data").unwrap();
        }
        if shape.marked {
            repo(&child);
            if !inside_project {
                out.insert(Match::from_path(&child));
            }
        }
        materialize(&shape.children, &child, inside_project || shape.marked, out);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// root/A/.git, root/B/C/.git and a plain root/D yield exactly A and C.
#[test]
fn scan_reports_reference_layout() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    repo(&root.join("A"));
    repo(&root.join("B/C"));
    mkdir(&root.join("D"));
    // Contents of project roots must never be visited.
    repo(&root.join("A/vendor/dep"));
    repo(&root.join("B/C/sub"));

    let (matches, summary) = scan(root, 4);
    assert_eq!(
        matches,
        expected(&[("A", root.join("A")), ("C", root.join("B/C"))])
    );
    assert_eq!(summary.matches, 2);
    // root, B and D only.
    assert_eq!(summary.directories_listed, 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Generated trees scanned with any pool size report exactly the
    /// expected project roots, and every registered job is finished.
    #[test]
    fn scan_matches_generated_trees(
        shapes in forest_strategy(),
        workers in prop::sample::select(vec![1usize, 2, 8, 64]),
    ) {
        let tmp = TempDir::new().unwrap();
        let mut want = BTreeSet::new();
        materialize(&shapes, tmp.path(), false, &mut want);

        let (matches, summary) = scan(tmp.path(), workers);
        prop_assert_eq!(&matches, &want, "workers = {}", workers);
        prop_assert_eq!(summary.matches as usize, want.len());
        prop_assert_eq!(summary.jobs_added, summary.jobs);
        prop_assert_eq!(summary.net_pending(), 0);
        // Every job that ran listed its directory.
        prop_assert_eq!(summary.jobs, summary.directories_listed + summary.soft_errors);
        prop_assert!(summary.faults.is_empty(), "faults: {:?}", summary.faults);
    }

    /// One tree, every pool size: the result set does not depend on it.
    #[test]
    fn scan_is_stable_across_pool_sizes(shapes in forest_strategy()) {
        let tmp = TempDir::new().unwrap();
        let mut want = BTreeSet::new();
        materialize(&shapes, tmp.path(), false, &mut want);

        for workers in [1, 2, 8, 64] {
            let (matches, _) = scan(tmp.path(), workers);
            prop_assert_eq!(&matches, &want, "workers = {}", workers);
        }
    }
}

#[test]
fn scan_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    repo(&root.join("one"));
    repo(&root.join("two/three"));
    repo(&root.join("two/three/nested"));
    mkdir(&root.join("four/five/six"));
    let want = expected(&[("one", root.join("one")), ("three", root.join("two/three"))]);

    let (first, _) = scan(tmp.path(), 3);
    let (second, _) = scan(tmp.path(), 3);
    assert_eq!(first, second);
    assert_eq!(first, want);
}

#[test]
fn scan_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let (matches, summary) = scan(tmp.path(), 2);
    assert!(matches.is_empty());
    assert_eq!(summary.jobs, 1);
}

/// A deep chain exercises the queue instead of the call stack.
#[test]
fn scan_deep_chain() {
    let tmp = TempDir::new().unwrap();
    let mut deep = tmp.path().to_path_buf();
    for i in 0..200 {
        deep.push(format!("level{i}"));
    }
    repo(&deep);

    let (matches, summary) = scan(tmp.path(), 2);
    assert_eq!(matches, expected(&[("level199", deep.clone())]));
    assert_eq!(summary.directories_listed, 200);
}

#[test]
fn scan_missing_root_fails() {
    let tmp = TempDir::new().unwrap();
    let err = DirectoryScanner::new(tmp.path().join("nope"))
        .scan(|_| {})
        .unwrap_err();
    assert!(matches!(err, ScanError::RootNotFound { .. }), "{err}");
}

#[test]
fn scan_file_root_fails() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    let err = DirectoryScanner::new(&file).scan(|_| {}).unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory { .. }), "{err}");
}

/// A permission-denied subtree must not abort the scan. When the tests run
/// with privileges that bypass the mode bits, the locked repo is simply
/// found as well.
#[cfg(unix)]
#[test]
fn scan_survives_unreadable_subdirectory() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    repo(&root.join("open/repo"));
    repo(&root.join("locked/inner"));
    let locked = root.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let (matches, _) = scan(root, 4);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    assert!(matches.contains(&Match::new("repo", root.join("open/repo"))));
    assert!(matches.len() <= 2);
}

/// A `.git` file (worktrees, submodules) marks a project root too.
#[test]
fn scan_accepts_marker_file() {
    let tmp = TempDir::new().unwrap();
    let worktree = tmp.path().join("worktree");
    mkdir(&worktree);
    fs::write(worktree.join(".git"), b"gitdir: /elsewhere").unwrap();

    let (matches, _) = scan(tmp.path(), 2);
    assert_eq!(matches, expected(&[("worktree", worktree)]));
}

// ── Lister ───────────────────────────────────────────────────────────────────

#[test]
fn lister_regenerates_and_reads_cache() {
    let code = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    repo(&code.path().join("alpha"));
    repo(&code.path().join("group/beta"));

    let lister = ProjectLister::new(code.path(), cache_dir.path().join("projects"))
        .with_options(ScanOptions::default().with_workers(2));

    // Cache is missing, so the first read regenerates it.
    let cached = lister.cached_matches().unwrap();
    let names: Vec<_> = cached.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(!lister.cache().is_expired());

    // A fresh cache is served without rescanning.
    repo(&code.path().join("gamma"));
    assert_eq!(lister.cached_matches().unwrap(), cached);
    assert_eq!(lister.live_matches().unwrap().len(), 3);

    let beta = lister.find("beta").unwrap().unwrap();
    assert_eq!(beta.full_path, code.path().join("group/beta"));
    assert!(lister.find("missing").unwrap().is_none());
}

#[test]
fn lister_finds_names_containing_equals() {
    let code = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    repo(&code.path().join("a=b"));
    repo(&code.path().join("x=y/plain"));

    let lister = ProjectLister::new(code.path(), cache_dir.path().join("projects"))
        .with_options(ScanOptions::default().with_workers(2));
    lister.regenerate().unwrap();

    assert_eq!(lister.cached_matches().unwrap(), lister.live_matches().unwrap());
    let found = lister.find("a=b").unwrap().unwrap();
    assert_eq!(found.full_path, code.path().join("a=b"));
    assert!(lister.find("a").unwrap().is_none());
    let plain = lister.find("plain").unwrap().unwrap();
    assert_eq!(plain.full_path, code.path().join("x=y/plain"));
}

#[test]
fn lister_propagates_root_errors() {
    let cache_dir = TempDir::new().unwrap();
    let lister = ProjectLister::new(
        cache_dir.path().join("no-code-here"),
        cache_dir.path().join("projects"),
    );
    assert!(lister.regenerate().is_err());
    assert!(!cache_dir.path().join("projects").exists());
}
