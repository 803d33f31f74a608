//! Line-oriented file primitives and multi-file transactions.
//!
//! Every rewrite goes through a staged file (`<name>.staged`) that is fsynced
//! and then renamed over the target, so readers never see a half-written
//! file. A [`Transaction`] groups several rewrites: before the first rename a
//! journal naming every target is written, and it is removed after the last
//! one. [`recover`] finishes a journalled transaction that was interrupted and
//! discards staged files that never made it into a journal.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const STAGED_SUFFIX: &str = ".staged";
const JOURNAL_FILE: &str = ".planner.journal";

/// Raw lines of a file, without their `\n`. A missing file reads as empty.
pub fn read_raw_lines(path: &Path) -> io::Result<Vec<Vec<u8>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut lines: Vec<Vec<u8>> = bytes.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect();
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    Ok(lines)
}

/// Read all lines of a file as text, dropping a trailing `\r`. Lines that
/// are not valid UTF-8 are skipped with a warning.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    for (idx, raw) in read_raw_lines(path)?.into_iter().enumerate() {
        match String::from_utf8(raw) {
            Ok(mut line) => {
                if line.ends_with('\r') {
                    line.pop();
                }
                lines.push(line);
            }
            Err(_) => tracing::warn!(
                file = %path.display(),
                line = idx + 1,
                "skipping line that is not valid UTF-8"
            ),
        }
    }
    Ok(lines)
}

/// Create an empty file if it does not exist yet.
pub fn ensure_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Append lines to a file and flush them to disk. A file whose last line
/// lacks its `\n` gets one first.
pub fn append_lines<I, S>(path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut content = join_lines(lines);
    if content.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    if !ends_with_newline(&mut file)? {
        content.insert(0, b'\n');
    }
    file.write_all(&content)?;
    file.sync_data()
}

/// Replace a file's lines atomically.
pub fn write_lines_atomic<I, S>(path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let temp = staged_path(path);
    write_synced(&temp, &join_lines(lines))?;
    fs::rename(&temp, path)
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn join_lines<I, S>(lines: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut content = Vec::new();
    for line in lines {
        content.extend_from_slice(line.as_ref());
        content.push(b'\n');
    }
    content
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn staged_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(STAGED_SUFFIX);
    target.with_file_name(name)
}

fn journal_path(dir: &Path) -> PathBuf {
    dir.join(JOURNAL_FILE)
}

struct Staged {
    target: PathBuf,
    temp: PathBuf,
}

/// A group of file rewrites that land together.
///
/// All targets must live in the transaction's directory. Dropping an
/// uncommitted transaction removes its staged files.
pub struct Transaction {
    dir: PathBuf,
    staged: Vec<Staged>,
    committed: bool,
}

impl Transaction {
    pub fn new(dir: &Path) -> Self {
        Transaction {
            dir: dir.to_path_buf(),
            staged: Vec::new(),
            committed: false,
        }
    }

    /// Write the new content of `target` to its staged file.
    pub fn stage<I, S>(&mut self, target: &Path, lines: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        if target.parent() != Some(self.dir.as_path()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} is outside the transaction directory {}",
                    target.display(),
                    self.dir.display()
                ),
            ));
        }

        let temp = staged_path(target);
        write_synced(&temp, &join_lines(lines))?;

        self.staged.retain(|s| s.target != target);
        self.staged.push(Staged {
            target: target.to_path_buf(),
            temp,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Journal the targets, move every staged file into place, drop the journal.
    pub fn commit(mut self) -> io::Result<()> {
        if self.staged.is_empty() {
            self.committed = true;
            return Ok(());
        }

        let journal = journal_path(&self.dir);
        let names: Vec<String> = self
            .staged
            .iter()
            .filter_map(|s| s.target.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        write_lines_atomic(&journal, &names)?;
        // From here on the transaction is durable; recover() rolls it forward.
        self.committed = true;

        for staged in &self.staged {
            fs::rename(&staged.temp, &staged.target)?;
        }
        fs::remove_file(&journal)?;

        tracing::debug!(files = names.len(), "transaction committed");
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for staged in &self.staged {
            let _ = fs::remove_file(&staged.temp);
        }
    }
}

/// Outcome of [`recover`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Recovery {
    /// Staged files moved into place from an interrupted commit.
    pub rolled_forward: usize,
    /// Staged files deleted because no journal covered them.
    pub discarded: usize,
}

/// Bring `dir` back to a consistent state after a crash.
pub fn recover(dir: &Path) -> io::Result<Recovery> {
    let mut recovery = Recovery::default();
    let journal = journal_path(dir);

    if journal.exists() {
        for name in read_lines(&journal)? {
            if name.is_empty() {
                continue;
            }
            let target = dir.join(&name);
            let temp = staged_path(&target);
            if temp.exists() {
                fs::rename(&temp, &target)?;
                recovery.rolled_forward += 1;
            }
        }
        fs::remove_file(&journal)?;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(recovery),
        Err(e) => return Err(e),
    };
    for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
        let is_staged = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(STAGED_SUFFIX));
        if is_staged && path.is_file() {
            fs::remove_file(&path)?;
            recovery.discarded += 1;
        }
    }

    if recovery != Recovery::default() {
        tracing::warn!(
            rolled_forward = recovery.rolled_forward,
            discarded = recovery.discarded,
            dir = %dir.display(),
            "recovered from an interrupted write"
        );
    }

    Ok(recovery)
}
