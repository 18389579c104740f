use crate::config::BridgeConfig;
use crate::{Error, Result};
use std::collections::VecDeque;
use wasmtime::{AsContext, Caller, Linker, Memory};
use wasmtime_wasi::pipe::MemoryOutputPipe;
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::WasiCtxBuilder;

/// State owned by one guest instance's store.
pub struct HostState {
    /// WASI context with stdout/stderr captured in memory.
    wasi: WasiP1Ctx,
    stdout: MemoryOutputPipe,
    stderr: MemoryOutputPipe,
    /// Most recent lines the guest sent through `main._log`.
    console: VecDeque<String>,
    console_lines: usize,
}

impl HostState {
    /// Create fresh host state for a new instance.
    pub fn new(config: &BridgeConfig) -> Self {
        let stdout = MemoryOutputPipe::new(config.output_capacity);
        let stderr = MemoryOutputPipe::new(config.output_capacity);
        let wasi = WasiCtxBuilder::new()
            .stdout(stdout.clone())
            .stderr(stderr.clone())
            .build_p1();
        Self {
            wasi,
            stdout,
            stderr,
            console: VecDeque::new(),
            console_lines: config.console_lines.max(1),
        }
    }

    /// Guest console lines, oldest first.
    pub fn console(&self) -> impl Iterator<Item = &str> {
        self.console.iter().map(String::as_str)
    }

    /// Everything the guest wrote to WASI stdout.
    pub fn captured_stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.contents()).into_owned()
    }

    /// Everything the guest wrote to WASI stderr.
    pub fn captured_stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr.contents()).into_owned()
    }

    pub(crate) fn stderr_len(&self) -> usize {
        self.stderr.contents().len()
    }

    pub(crate) fn clear_console(&mut self) {
        self.console.clear();
    }

    fn push_console(&mut self, line: String) {
        if self.console.len() == self.console_lines {
            self.console.pop_front();
        }
        self.console.push_back(line);
    }

    /// The last line the guest reported before aborting.
    ///
    /// Looks at stderr written after byte `stderr_from` first, then at the
    /// console buffer.
    pub(crate) fn last_diagnostic_line(&self, stderr_from: usize) -> Option<String> {
        let stderr = self.stderr.contents();
        let fresh = stderr.get(stderr_from..).unwrap_or_default();
        last_line(&String::from_utf8_lossy(fresh))
            .or_else(|| self.console.iter().rev().find_map(|line| last_line(line)))
    }
}

fn last_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim_end)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Host functions exposed to the guest.
pub struct HostFunctions;

impl HostFunctions {
    /// Register WASI preview 1 and the guest console import with the linker.
    pub fn register(linker: &mut Linker<HostState>) -> Result<()> {
        preview1::add_to_linker_sync(linker, |state: &mut HostState| &mut state.wasi)
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(
                "env",
                "main._log",
                |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                    Self::log(&mut caller, ptr, len)
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        Ok(())
    }

    /// Console host function.
    fn log(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) {
        let line = match Self::get_memory(caller)
            .and_then(|memory| read_string(&*caller, &memory, ptr as u32, len as u32))
        {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(target: "guest", "unreadable console line: {}", e);
                return;
            }
        };

        tracing::info!(target: "guest", "{}", line);
        caller.data_mut().push_console(line);
    }

    fn get_memory(caller: &mut Caller<'_, HostState>) -> Result<Memory> {
        caller
            .get_export("memory")
            .and_then(|ext| ext.into_memory())
            .ok_or_else(|| Error::MissingExport("memory".to_string()))
    }
}

/// Read `len` bytes at `ptr` from guest memory.
pub(crate) fn read_bytes(
    store: &impl AsContext,
    memory: &Memory,
    ptr: u32,
    len: u32,
) -> Result<Vec<u8>> {
    let start = ptr as usize;
    let end = start + len as usize;
    if end > memory.data_size(store) {
        return Err(Error::Memory(format!(
            "range {start}..{end} exceeds guest memory"
        )));
    }
    let mut buffer = vec![0u8; len as usize];
    memory
        .read(store, start, &mut buffer)
        .map_err(|e| Error::Memory(e.to_string()))?;
    Ok(buffer)
}

/// Read a UTF-8 string; a null pointer or zero length is the empty string.
pub(crate) fn read_string(
    store: &impl AsContext,
    memory: &Memory,
    ptr: u32,
    len: u32,
) -> Result<String> {
    if ptr == 0 || len == 0 {
        return Ok(String::new());
    }
    let bytes = read_bytes(store, memory, ptr, len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read a packed string result.
///
/// `0` is the empty string; anything else points at an 8-byte record holding
/// the little-endian pointer and length of the text.
pub(crate) fn read_packed_string(
    store: &impl AsContext,
    memory: &Memory,
    packed: i32,
) -> Result<String> {
    if packed == 0 {
        return Ok(String::new());
    }
    let record = read_bytes(store, memory, packed as u32, 8)?;
    let ptr = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
    let len = u32::from_le_bytes([record[4], record[5], record[6], record[7]]);
    read_string(store, memory, ptr, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_line_skips_blank_tail() {
        assert_eq!(last_line("a\nb\n\n  \n"), Some("b".to_string()));
        assert_eq!(last_line("\n\n"), None);
    }

    #[test]
    fn console_is_bounded() {
        let config = BridgeConfig {
            console_lines: 2,
            ..BridgeConfig::default()
        };
        let mut state = HostState::new(&config);
        for line in ["one", "two", "three"] {
            state.push_console(line.to_string());
        }
        assert_eq!(state.console().collect::<Vec<_>>(), vec!["two", "three"]);
        assert_eq!(state.last_diagnostic_line(0), Some("three".to_string()));
    }

    #[test]
    fn no_diagnostics_without_output() {
        let state = HostState::new(&BridgeConfig::default());
        assert_eq!(state.last_diagnostic_line(0), None);
        assert!(state.captured_stdout().is_empty());
    }
}
