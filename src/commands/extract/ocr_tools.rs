use super::*;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Source of raw text for one page image.
pub trait OcrSource {
    fn text_for_page(&self, page: &Path) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    lang: String,
    psm: u8,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(lang: &str, psm: u8, timeout: Duration) -> Self {
        Self {
            lang: lang.to_string(),
            psm,
            timeout,
        }
    }
}

impl OcrSource for TesseractOcr {
    fn text_for_page(&self, page: &Path) -> Result<String> {
        let mut command = Command::new("tesseract");
        command
            .arg(page)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg(self.psm.to_string());

        let output = run_with_timeout(command, self.timeout)
            .with_context(|| format!("tesseract failed for {}", page.display()))?;

        if !output.status.success() {
            bail!(
                "tesseract returned non-zero exit status for {}: {}",
                page.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
    }
}

#[derive(Debug)]
pub struct TimedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs `command` to completion, killing and reaping it once `timeout` has
/// elapsed. The child never outlives this call.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<TimedOutput> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to execute {program}"))?;

    // Drain the pipes off-thread so a chatty child cannot block on a full
    // pipe while we poll for the timeout.
    let stdout_reader = child.stdout.take().map(spawn_pipe_reader);
    let stderr_reader = child.stderr.take().map(spawn_pipe_reader);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() > timeout => {
                kill_and_reap(&mut child);
                bail!("{program} timed out after {}ms", timeout.as_millis());
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL.min(timeout)),
            Err(err) => {
                kill_and_reap(&mut child);
                return Err(err).with_context(|| format!("failed to wait on {program}"));
            }
        }
    };

    Ok(TimedOutput {
        status,
        stdout: join_pipe_reader(stdout_reader),
        stderr: join_pipe_reader(stderr_reader),
    })
}

pub fn kill_and_reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(pid = child.id(), error = %err, "kill failed; child may have exited");
    }
    if let Err(err) = child.wait() {
        warn!(pid = child.id(), error = %err, "failed to reap child process");
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_pipe_reader(handle: Option<std::thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Replays raw text saved by an earlier run instead of invoking OCR.
#[derive(Debug, Clone)]
pub struct CachedTextOcr {
    raw_text_dir: PathBuf,
}

impl CachedTextOcr {
    pub fn new(raw_text_dir: &Path) -> Self {
        Self {
            raw_text_dir: raw_text_dir.to_path_buf(),
        }
    }
}

impl OcrSource for CachedTextOcr {
    fn text_for_page(&self, page: &Path) -> Result<String> {
        let path = raw_text_path_for(&self.raw_text_dir, page);
        fs::read_to_string(&path)
            .with_context(|| format!("failed to read cached OCR text {}", path.display()))
    }
}

/// Wraps another source and keeps a copy of each page's raw text on disk.
#[derive(Debug, Clone)]
pub struct RecordingOcr<S> {
    inner: S,
    raw_text_dir: PathBuf,
}

impl<S: OcrSource> RecordingOcr<S> {
    pub fn new(inner: S, raw_text_dir: &Path) -> Self {
        Self {
            inner,
            raw_text_dir: raw_text_dir.to_path_buf(),
        }
    }
}

impl<S: OcrSource> OcrSource for RecordingOcr<S> {
    fn text_for_page(&self, page: &Path) -> Result<String> {
        let text = self.inner.text_for_page(page)?;
        let path = raw_text_path_for(&self.raw_text_dir, page);
        if let Err(err) = fs::write(&path, &text) {
            warn!(path = %path.display(), error = %err, "failed to save raw OCR text");
        }
        Ok(text)
    }
}

pub fn raw_text_path_for(raw_text_dir: &Path, page: &Path) -> PathBuf {
    let stem = page
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    raw_text_dir.join(format!("{stem}.txt"))
}

pub fn collect_tool_versions(ocr_mode: OcrMode) -> ToolVersions {
    let tesseract = match ocr_mode {
        OcrMode::Tesseract => command_version_optional("tesseract", &["--version"]),
        OcrMode::Cached => None,
    };
    ToolVersions { tesseract }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
