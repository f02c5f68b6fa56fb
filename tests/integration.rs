use ves::commit::commit_create;
use ves::error::VesError;
use ves::index::{Index, MODE_TYPE_SYMLINK, with_index};
use ves::object::Object;
use ves::refs::{ref_create, ref_resolve, tag_create};
use ves::repository::Repository;
use ves::status::{branch_get_active, collect_status};
use ves::storage::{object_find, object_hash, object_read, object_resolve};
use ves::tree::tree_from_index;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use chrono::Local;
use tempfile::TempDir;

// Tests that touch process environment (identity lookup) serialize here.
static ENV_LOCK: Mutex<()> = Mutex::new(());

//
//
// Helpers
//
//

fn setup() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("repo");
    let repo = Repository::create(&root).unwrap();
    (dir, repo)
}

fn write_file(repo: &Repository, rel: &str, data: &[u8]) -> PathBuf {
    let path = repo.worktree.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, data).unwrap();
    path
}

fn add_paths(repo: &Repository, rels: &[&str]) {
    let paths: Vec<PathBuf> = rels.iter().map(|r| repo.worktree.join(r)).collect();
    ves::add::add(repo, &paths).unwrap();
}

/// Commit the index with a fixed identity, advancing the branch the way
/// the commit command does, without depending on user config files.
fn commit_all(repo: &Repository, message: &str) -> String {
    let index = Index::read(repo).unwrap();
    let tree = tree_from_index(repo, &index).unwrap();
    let parent = object_find(repo, "HEAD", None, true).ok().flatten();

    let sha = commit_create(
        repo,
        &tree,
        parent.as_deref(),
        "Test User <test@example.com>",
        Local::now(),
        message,
    )
    .unwrap();

    match branch_get_active(repo).unwrap() {
        Some(branch) => {
            let path = repo.repo_file(format!("refs/heads/{branch}"), true).unwrap();
            fs::write(path, format!("{sha}\n")).unwrap();
        }
        None => fs::write(repo.repo_path("HEAD"), format!("{sha}\n")).unwrap(),
    }

    sha
}

/// Force a stat change so status has to fall back to re-hashing.
fn touch(path: &Path) {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
}

//
//
// Init
//
//

#[test]
fn test_init_creates_skeleton() {
    let (_dir, repo) = setup();
    let ves = &repo.ves_dir;

    assert!(ves.join("HEAD").is_file());
    assert!(ves.join("config").is_file());
    assert!(ves.join("description").is_file());
    assert!(ves.join("objects").is_dir());
    assert!(ves.join("refs/heads").is_dir());
    assert!(ves.join("refs/tags").is_dir());
    assert!(ves.join("branches").is_dir());

    let head = fs::read_to_string(ves.join("HEAD")).unwrap();
    assert_eq!(head, "ref: refs/heads/master\n");
}

#[test]
fn test_init_refuses_nonempty_repo_dir() {
    let (_dir, repo) = setup();
    let err = Repository::create(&repo.worktree).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::RepositoryExists(_))
    ));
}

#[test]
fn test_open_requires_version_zero() {
    let (_dir, repo) = setup();
    fs::write(
        repo.ves_dir.join("config"),
        "[core]\nrepositoryformatversion=1\n",
    )
    .unwrap();

    let err = Repository::open(&repo.worktree).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_find_walks_up_and_fails_outside() {
    let (_dir, repo) = setup();
    let nested = repo.worktree.join("a/b/c");
    fs::create_dir_all(&nested).unwrap();

    let found = Repository::find(&nested).unwrap();
    assert_eq!(found.worktree, repo.worktree);

    let outside = TempDir::new().unwrap();
    let err = Repository::find(outside.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::NotARepository(_))
    ));
}

//
//
// Object store
//
//

#[test]
fn test_hash_object_known_vector() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, b"hello world\n").unwrap();

    let sha = ves::hash_object::hash_object(None, &file, b"blob").unwrap();
    assert_eq!(sha, "3b18e512dba79e4c8300dd08aeb37f8e728b8dad");
}

#[test]
fn test_object_write_read_roundtrip() {
    let (_dir, repo) = setup();

    let sha = object_hash(b"some file contents", b"blob", Some(&repo)).unwrap();
    assert!(repo.ves_dir.join("objects").join(&sha[..2]).join(&sha[2..]).is_file());

    let obj = object_read(&repo, &sha).unwrap();
    assert_eq!(obj.serialize(), b"some file contents");
    assert_eq!(obj.hash(), sha);
}

#[test]
fn test_object_write_is_idempotent() {
    let (_dir, repo) = setup();
    let h1 = object_hash(b"same", b"blob", Some(&repo)).unwrap();
    let h2 = object_hash(b"same", b"blob", Some(&repo)).unwrap();
    assert_eq!(h1, h2);
}

#[test]
fn test_resolve_by_prefix() {
    let (_dir, repo) = setup();
    let sha = object_hash(b"prefix me", b"blob", Some(&repo)).unwrap();

    let candidates = object_resolve(&repo, &sha[..8]).unwrap();
    assert_eq!(candidates.as_slice(), &[sha.clone()]);

    // Uppercase input resolves too.
    let upper = sha[..8].to_uppercase();
    let candidates = object_resolve(&repo, &upper).unwrap();
    assert_eq!(candidates.as_slice(), &[sha]);
}

#[test]
fn test_resolve_empty_and_unknown_names() {
    let (_dir, repo) = setup();
    assert!(object_resolve(&repo, "  ").unwrap().is_empty());

    let err = object_find(&repo, "no-such-thing", None, true).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::NoSuchReference(_))
    ));
}

#[test]
fn test_ambiguous_partial_hash() {
    let (_dir, repo) = setup();

    // Grind blobs until two share a 4-char prefix.
    let mut seen: HashMap<String, (String, String)> = HashMap::new();
    let mut pair = None;
    for i in 0..200_000 {
        let content = format!("blob number {i}");
        let sha = object_hash(content.as_bytes(), b"blob", None).unwrap();
        let prefix = sha[..4].to_string();

        if let Some((other_sha, other_content)) = seen.get(&prefix) {
            if *other_sha != sha {
                pair = Some((prefix, content, other_content.clone()));
                break;
            }
        } else {
            seen.insert(prefix, (sha, content));
        }
    }

    let (prefix, c1, c2) = pair.expect("a 4-char prefix collision within bounds");
    let s1 = object_hash(c1.as_bytes(), b"blob", Some(&repo)).unwrap();
    let s2 = object_hash(c2.as_bytes(), b"blob", Some(&repo)).unwrap();

    let err = object_find(&repo, &prefix, None, true).unwrap_err();
    match err.downcast_ref::<VesError>() {
        Some(VesError::AmbiguousReference { candidates, .. }) => {
            assert!(candidates.contains(&s1));
            assert!(candidates.contains(&s2));
        }
        other => panic!("expected AmbiguousReference, got {other:?}"),
    }
}

#[test]
fn test_find_follows_commit_to_tree() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let commit_sha = commit_all(&repo, "m");

    let commit = object_read(&repo, &commit_sha).unwrap();
    let tree_sha = {
        let c = commit.try_as_commit().unwrap();
        String::from_utf8(c.kvlm.get(b"tree").unwrap().to_vec()).unwrap()
    };

    let found = object_find(&repo, &commit_sha, Some(b"tree"), true).unwrap();
    assert_eq!(found, Some(tree_sha));

    // Without follow, a type mismatch yields None.
    let found = object_find(&repo, &commit_sha, Some(b"tree"), false).unwrap();
    assert_eq!(found, None);
}

//
//
// Refs
//
//

#[test]
fn test_ref_resolve_follows_symbolic_chain() {
    let (_dir, repo) = setup();

    // HEAD points at an unborn branch: unresolvable for now.
    assert_eq!(ref_resolve(&repo, "HEAD").unwrap(), None);

    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    assert_eq!(ref_resolve(&repo, "HEAD").unwrap(), Some(sha.clone()));
    assert_eq!(ref_resolve(&repo, "refs/heads/master").unwrap(), Some(sha));
}

#[test]
fn test_ref_create_and_show_ref() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    ref_create(&repo, "heads/feature", &sha).unwrap();

    let refs = ves::refs::ref_list(&repo).unwrap();
    let mut out = Vec::new();
    ves::refs::show_refs(&refs, true, "refs", &mut out).unwrap();
    let listing = String::from_utf8(out).unwrap();

    assert!(listing.contains(&format!("{sha} refs/heads/feature")));
    assert!(listing.contains(&format!("{sha} refs/heads/master")));
}

//
//
// Add / rm / index sessions
//
//

#[test]
fn test_add_stages_files_and_writes_blobs() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);

    let index = Index::read(&repo).unwrap();
    assert_eq!(index.entries.len(), 2);
    assert!(index.find("a.txt").is_some());
    assert!(index.find("sub/b.txt").is_some());

    let i = index.find("a.txt").unwrap();
    let blob = object_read(&repo, &index.entries[i].sha).unwrap();
    assert_eq!(blob.serialize(), b"A");
}

#[test]
fn test_add_is_idempotent() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    add_paths(&repo, &["a.txt"]);

    let index = Index::read(&repo).unwrap();
    assert_eq!(index.entries.len(), 1);
}

#[test]
fn test_add_rejects_directories_and_outside_paths() {
    let (_dir, repo) = setup();
    fs::create_dir(repo.worktree.join("dir")).unwrap();

    let err = ves::add::add(&repo, &[repo.worktree.join("dir")]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::NotAFileOrSymlink(_))
    ));

    let outside = TempDir::new().unwrap();
    let stray = outside.path().join("x.txt");
    fs::write(&stray, b"x").unwrap();
    let err = ves::add::add(&repo, &[stray]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::PathOutsideWorktree(_))
    ));

    // Failed sessions must not write the index.
    assert!(Index::read(&repo).unwrap().entries.is_empty());
}

#[cfg(unix)]
#[test]
fn test_add_symlink_stores_target_text() {
    let (_dir, repo) = setup();
    write_file(&repo, "target.txt", b"pointed at");
    std::os::unix::fs::symlink("target.txt", repo.worktree.join("link")).unwrap();

    add_paths(&repo, &["link"]);

    let index = Index::read(&repo).unwrap();
    let entry = &index.entries[index.find("link").unwrap()];
    assert_eq!(entry.mode_type, MODE_TYPE_SYMLINK);
    assert_eq!(entry.mode_perms, 0);

    let blob = object_read(&repo, &entry.sha).unwrap();
    assert_eq!(blob.serialize(), b"target.txt");
}

#[test]
fn test_rm_removes_from_index_and_disk() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);

    ves::remove::rm(&repo, &[repo.worktree.join("a.txt")], true, false).unwrap();

    let index = Index::read(&repo).unwrap();
    assert!(index.find("a.txt").is_none());
    assert!(index.find("sub/b.txt").is_some());
    assert!(!repo.worktree.join("a.txt").exists());
}

#[test]
fn test_rm_without_delete_keeps_file() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);

    ves::remove::rm(&repo, &[repo.worktree.join("a.txt")], false, false).unwrap();

    assert!(Index::read(&repo).unwrap().find("a.txt").is_none());
    assert!(repo.worktree.join("a.txt").exists());
}

#[test]
fn test_rm_missing_path_errors_unless_skipped() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);

    let ghost = repo.worktree.join("ghost.txt");
    let err = ves::remove::rm(&repo, &[ghost.clone()], true, false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::NotInIndex(_))
    ));

    ves::remove::rm(&repo, &[ghost], true, true).unwrap();
    assert!(Index::read(&repo).unwrap().find("a.txt").is_some());
}

#[test]
fn test_index_session_discards_on_error() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);

    let res: Result<()> = with_index(&repo, |index| {
        index.entries.clear();
        anyhow::bail!("abort the session");
    });
    assert!(res.is_err());

    // The on-disk index still has the entry.
    assert_eq!(Index::read(&repo).unwrap().entries.len(), 1);
}

#[test]
fn test_index_on_disk_roundtrip() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);

    let index = Index::read(&repo).unwrap();
    index.write(&repo).unwrap();
    assert_eq!(Index::read(&repo).unwrap(), index);
}

//
//
// Trees, commit, checkout
//
//

#[test]
fn test_tree_from_index_nests_directories() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);

    let index = Index::read(&repo).unwrap();
    let root_sha = tree_from_index(&repo, &index).unwrap();

    let root = object_read(&repo, &root_sha).unwrap();
    let root = root.try_as_tree().unwrap();
    assert_eq!(root.leaves.len(), 2);

    let file = &root.leaves[0];
    assert_eq!(file.path, "a.txt");
    assert_eq!(file.mode, *b"100644");

    let sub = &root.leaves[1];
    assert_eq!(sub.path, "sub");
    assert_eq!(sub.mode, *b"040000");

    let subtree = object_read(&repo, &sub.sha).unwrap();
    let subtree = subtree.try_as_tree().unwrap();
    assert_eq!(subtree.leaves[0].path, "b.txt");
}

#[test]
fn test_commit_advances_branch_and_links_parent() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let first = commit_all(&repo, "first");

    let branch = fs::read_to_string(repo.repo_path("refs/heads/master")).unwrap();
    assert_eq!(branch, format!("{first}\n"));

    write_file(&repo, "a.txt", b"A2");
    touch(&repo.worktree.join("a.txt"));
    add_paths(&repo, &["a.txt"]);
    let second = commit_all(&repo, "second");

    let obj = object_read(&repo, &second).unwrap();
    let commit = obj.try_as_commit().unwrap();
    assert_eq!(commit.kvlm.get(b"parent").unwrap(), first.as_bytes());

    let author = commit.kvlm.get(b"author").unwrap();
    let committer = commit.kvlm.get(b"committer").unwrap();
    assert_eq!(author, committer);
    assert!(author.starts_with(b"Test User <test@example.com> "));
    assert_eq!(commit.kvlm.message(), b"second\n");
}

#[test]
fn test_commit_message_is_normalized() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "  spaced out \n\n");

    let obj = object_read(&repo, &sha).unwrap();
    assert_eq!(obj.try_as_commit().unwrap().kvlm.message(), b"spaced out\n");
}

#[test]
fn test_commit_author_line_carries_offset() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    let obj = object_read(&repo, &sha).unwrap();
    let author = obj.try_as_commit().unwrap().kvlm.get(b"author").unwrap().to_vec();
    let author = String::from_utf8(author).unwrap();

    // ... <unix-seconds> <±HHMM>
    let mut parts = author.rsplitn(3, ' ');
    let tz = parts.next().unwrap();
    let secs = parts.next().unwrap();
    assert!(tz.starts_with('+') || tz.starts_with('-'));
    assert_eq!(tz.len(), 5);
    assert!(secs.parse::<i64>().is_ok());
}

#[test]
fn test_checkout_roundtrip() {
    let (dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);
    let sha = commit_all(&repo, "m");

    let dest = dir.path().join("out");
    ves::checkout::checkout(&repo, &sha, &dest).unwrap();

    assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"A");
    assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"B");
}

#[test]
fn test_checkout_refuses_nonempty_destination() {
    let (dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    let dest = dir.path().join("out");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("occupied"), b"x").unwrap();

    assert!(ves::checkout::checkout(&repo, &sha, &dest).is_err());
}

#[cfg(unix)]
#[test]
fn test_checkout_materializes_symlinks() {
    let (dir, repo) = setup();
    write_file(&repo, "target.txt", b"T");
    std::os::unix::fs::symlink("target.txt", repo.worktree.join("link")).unwrap();
    add_paths(&repo, &["target.txt", "link"]);
    let sha = commit_all(&repo, "m");

    let dest = dir.path().join("out");
    ves::checkout::checkout(&repo, &sha, &dest).unwrap();

    let link = dest.join("link");
    assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("target.txt"));
}

//
//
// Status
//
//

#[test]
fn test_status_buckets() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);
    commit_all(&repo, "base");

    // Modify without staging.
    write_file(&repo, "a.txt", b"A changed");
    touch(&repo.worktree.join("a.txt"));

    // Untracked file and a fully-untracked directory.
    write_file(&repo, "u.txt", b"u");
    write_file(&repo, "newdir/one.txt", b"1");
    write_file(&repo, "newdir/two.txt", b"2");

    let report = collect_status(&repo).unwrap();
    assert_eq!(report.branch.as_deref(), Some("master"));
    assert_eq!(report.wt_modified, vec!["a.txt".to_string()]);
    assert!(report.staged_modified.is_empty());
    assert!(report.untracked.contains(&"u.txt".to_string()));
    assert!(report.untracked.contains(&"newdir/".to_string()));
    assert!(!report.untracked.iter().any(|p| p.starts_with("newdir/one")));

    // Stage the modification: it moves to the staged bucket.
    add_paths(&repo, &["a.txt"]);
    let report = collect_status(&repo).unwrap();
    assert_eq!(report.staged_modified, vec!["a.txt".to_string()]);
    assert!(report.wt_modified.is_empty());
}

#[test]
fn test_status_added_and_deleted() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    commit_all(&repo, "base");

    // Staged addition.
    write_file(&repo, "new.txt", b"n");
    add_paths(&repo, &["new.txt"]);

    // Worktree deletion (still in the index).
    fs::remove_file(repo.worktree.join("a.txt")).unwrap();

    let report = collect_status(&repo).unwrap();
    assert_eq!(report.staged_added, vec!["new.txt".to_string()]);
    assert_eq!(report.wt_deleted, vec!["a.txt".to_string()]);

    // Removing from the index turns it into a staged deletion.
    ves::remove::rm(&repo, &[repo.worktree.join("a.txt")], false, true).unwrap();
    let report = collect_status(&repo).unwrap();
    assert_eq!(report.staged_deleted, vec!["a.txt".to_string()]);
}

#[test]
fn test_status_respects_scoped_ignore() {
    let (_dir, repo) = setup();
    write_file(&repo, ".vesignore", b"*.log\n");
    add_paths(&repo, &[".vesignore"]);
    commit_all(&repo, "base");

    write_file(&repo, "x.log", b"noise");
    write_file(&repo, "seen.txt", b"s");

    let report = collect_status(&repo).unwrap();
    assert!(report.untracked.contains(&"seen.txt".to_string()));
    assert!(!report.untracked.contains(&"x.log".to_string()));
}

#[test]
fn test_status_partial_untracked_directory_lists_files() {
    let (_dir, repo) = setup();
    write_file(&repo, "mixed/tracked.txt", b"t");
    add_paths(&repo, &["mixed/tracked.txt"]);
    commit_all(&repo, "base");

    write_file(&repo, "mixed/loose.txt", b"l");

    let report = collect_status(&repo).unwrap();
    assert!(report.untracked.contains(&"mixed/loose.txt".to_string()));
    assert!(!report.untracked.contains(&"mixed/".to_string()));
}

#[test]
fn test_status_detached_head() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    fs::write(repo.repo_path("HEAD"), format!("{sha}\n")).unwrap();

    let report = collect_status(&repo).unwrap();
    assert_eq!(report.branch, None);
    assert_eq!(report.head_sha, Some(sha));
}

#[test]
fn test_status_print_sections() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);

    let mut out = Vec::new();
    ves::status::status(&repo, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("On branch master."));
    assert!(text.contains("Changes to be committed:"));
    assert!(text.contains("  added:    a.txt"));
    assert!(text.contains("Untracked files:"));
}

//
//
// Tags
//
//

#[test]
fn test_lightweight_tag_points_at_commit() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    tag_create(&repo, "v1", "HEAD", false).unwrap();

    let tag_ref = fs::read_to_string(repo.repo_path("refs/tags/v1")).unwrap();
    assert_eq!(tag_ref, format!("{sha}\n"));
}

#[test]
fn test_annotated_tag_writes_tag_object() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let commit_sha = commit_all(&repo, "m");

    tag_create(&repo, "v1", "HEAD", true).unwrap();

    let tag_sha = ref_resolve(&repo, "refs/tags/v1").unwrap().unwrap();
    assert_ne!(tag_sha, commit_sha);

    let obj = object_read(&repo, &tag_sha).unwrap();
    assert!(matches!(obj, Object::Tag(_)));
    if let Object::Tag(tag) = &obj {
        assert_eq!(tag.kvlm.get(b"object").unwrap(), commit_sha.as_bytes());
        assert_eq!(tag.kvlm.get(b"type").unwrap(), b"commit");
        assert_eq!(tag.kvlm.get(b"tag").unwrap(), b"v1");
    }

    // Finding the tag as a commit peels the tag object.
    let peeled = object_find(&repo, "v1", Some(b"commit"), true).unwrap();
    assert_eq!(peeled, Some(commit_sha));
}

#[test]
fn test_tag_listing() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    commit_all(&repo, "m");

    tag_create(&repo, "v1", "HEAD", false).unwrap();
    tag_create(&repo, "v2", "HEAD", false).unwrap();

    let mut out = Vec::new();
    ves::tag::tag_list(&repo, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "v1\nv2\n");
}

//
//
// Log, ls-tree, ls-files, cat-file
//
//

#[test]
fn test_log_emits_dot_graph() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);
    let first = commit_all(&repo, "first");

    write_file(&repo, "a.txt", b"A2");
    touch(&repo.worktree.join("a.txt"));
    add_paths(&repo, &["a.txt"]);
    let second = commit_all(&repo, "second\nwith detail");

    let mut out = Vec::new();
    ves::log::log(&repo, "HEAD", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("digraph veslog{\n  node[shape=rect]\n"));
    assert!(text.ends_with("}\n"));
    assert!(text.contains(&format!("c_{second} [label=\"{}: second\"]", &second[..7])));
    assert!(text.contains(&format!("c_{second} -> c_{first};")));
}

#[test]
fn test_ls_tree_flat_and_recursive() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    write_file(&repo, "sub/b.txt", b"B");
    add_paths(&repo, &["a.txt", "sub/b.txt"]);
    let sha = commit_all(&repo, "m");

    let mut out = Vec::new();
    ves::ls_tree::ls_tree(&repo, &sha, false, &mut out).unwrap();
    let flat = String::from_utf8(out).unwrap();
    assert!(flat.contains("100644 blob "));
    assert!(flat.contains("\ta.txt\n"));
    assert!(flat.contains("040000 tree "));
    assert!(flat.contains("\tsub\n"));

    let mut out = Vec::new();
    ves::ls_tree::ls_tree(&repo, &sha, true, &mut out).unwrap();
    let recursive = String::from_utf8(out).unwrap();
    assert!(recursive.contains("\tsub/b.txt\n"));
    assert!(!recursive.contains("040000 tree "));
}

#[test]
fn test_ls_files_lists_and_verbose() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);

    let mut out = Vec::new();
    ves::ls_files::ls_files(&repo, false, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a.txt\n");

    let mut out = Vec::new();
    ves::ls_files::ls_files(&repo, true, &mut out).unwrap();
    let verbose = String::from_utf8(out).unwrap();
    assert!(verbose.contains("regular file with perms: 644"));
    assert!(verbose.contains("on blob: "));
    assert!(verbose.contains("flags: stage=0 assume_valid=false"));
}

#[test]
fn test_cat_file_prints_payloads() {
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"raw bytes here");
    add_paths(&repo, &["a.txt"]);
    let sha = commit_all(&repo, "m");

    let index = Index::read(&repo).unwrap();
    let blob_sha = index.entries[0].sha.clone();

    let mut out = Vec::new();
    ves::cat_file::cat_file(&repo, &blob_sha, Some(b"blob"), &mut out).unwrap();
    assert_eq!(out, b"raw bytes here");

    let mut out = Vec::new();
    ves::cat_file::cat_file(&repo, &sha, Some(b"commit"), &mut out).unwrap();
    let body = String::from_utf8(out).unwrap();
    assert!(body.starts_with("tree "));
    assert!(body.ends_with("\nm\n"));
}

//
//
// Identity / ignore files from the environment
//
//

#[test]
fn test_commit_flow_reads_identity_from_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    let (_dir, repo) = setup();
    write_file(&repo, "a.txt", b"A");
    add_paths(&repo, &["a.txt"]);

    let config_home = TempDir::new().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", config_home.path());

    // No identity configured: commit refuses.
    let home = TempDir::new().unwrap();
    std::env::set_var("HOME", home.path());
    let err = ves::commit::commit(&repo, "m").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VesError>(),
        Some(VesError::UserIdentityMissing)
    ));

    fs::create_dir_all(config_home.path().join("ves")).unwrap();
    fs::write(
        config_home.path().join("ves/config"),
        "[user]\nname=Config User\nemail=cfg@example.com\n",
    )
    .unwrap();

    let sha = ves::commit::commit(&repo, "m").unwrap();
    let obj = object_read(&repo, &sha).unwrap();
    let author = obj.try_as_commit().unwrap().kvlm.get(b"author").unwrap().to_vec();
    assert!(author.starts_with(b"Config User <cfg@example.com> "));

    std::env::remove_var("XDG_CONFIG_HOME");
    std::env::remove_var("HOME");
}

#[test]
fn test_global_ignore_file_applies() {
    let _guard = ENV_LOCK.lock().unwrap();
    let (_dir, repo) = setup();

    let config_home = TempDir::new().unwrap();
    fs::create_dir_all(config_home.path().join("ves")).unwrap();
    fs::write(config_home.path().join("ves/ignore"), "*.swp\n").unwrap();
    std::env::set_var("XDG_CONFIG_HOME", config_home.path());

    let rules = ves::ignore::ignore_read(&repo).unwrap();
    assert!(ves::ignore::check_ignore(&rules, "editor.swp").unwrap());
    assert!(!ves::ignore::check_ignore(&rules, "editor.txt").unwrap());

    std::env::remove_var("XDG_CONFIG_HOME");
}

#[test]
fn test_info_exclude_applies() {
    let (_dir, repo) = setup();
    fs::create_dir_all(repo.ves_dir.join("info")).unwrap();
    fs::write(repo.ves_dir.join("info/exclude"), "*.bak\n").unwrap();

    let rules = ves::ignore::ignore_read(&repo).unwrap();
    assert!(ves::ignore::check_ignore(&rules, "old.bak").unwrap());
}
