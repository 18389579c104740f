use crate::config::{BridgeConfig, RestartPolicy};
use crate::host::{self, HostFunctions, HostState};
use crate::{Error, ExecuteResult, Result};
use serde::Deserialize;
use std::path::Path;
use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, Trap, TypedFunc};
use wasmtime_wasi::I32Exit;

/// `(name_ptr, name_len, source_ptr, source_len)`
type TextArgs = (i32, i32, i32, i32);

/// Lifecycle of the guest instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No live instance, or one still starting up.
    Uninitialized,
    /// Exports resolved; calls may be issued.
    Ready,
    /// The instance trapped; only `restart` leaves this state.
    Faulted,
}

/// Structured record returned by the guest's `execute`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRecord {
    exit_code: i32,
    stdout: (u32, u32),
    stderr: (u32, u32),
    trace: (u32, u32),
}

struct GuestExports {
    memory: Memory,
    malloc: TypedFunc<i32, i32>,
    tokenize: TypedFunc<TextArgs, i32>,
    parse: TypedFunc<TextArgs, i32>,
    execute: TypedFunc<TextArgs, i32>,
}

impl GuestExports {
    fn resolve(store: &mut Store<HostState>, instance: &Instance) -> Result<Self> {
        let memory = instance
            .get_memory(&mut *store, "memory")
            .ok_or_else(|| Error::MissingExport("memory".to_string()))?;
        Ok(Self {
            memory,
            malloc: typed(store, instance, "malloc")?,
            tokenize: typed(store, instance, "tokenize")?,
            parse: typed(store, instance, "parse")?,
            execute: typed(store, instance, "execute")?,
        })
    }
}

fn typed<P, R>(
    store: &mut Store<HostState>,
    instance: &Instance,
    name: &str,
) -> Result<TypedFunc<P, R>>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|_| Error::MissingExport(name.to_string()))
}

/// One instantiated guest and its store.
struct LiveGuest {
    store: Store<HostState>,
    exports: GuestExports,
}

impl LiveGuest {
    /// Copy `text` into memory obtained from the guest allocator.
    fn write_string(&mut self, text: &str) -> wasmtime::Result<(i32, i32)> {
        let len = i32::try_from(text.len())?;
        let ptr = self.exports.malloc.call(&mut self.store, len)?;
        self.exports
            .memory
            .write(&mut self.store, ptr as u32 as usize, text.as_bytes())?;
        Ok((ptr, len))
    }

    fn call(
        &mut self,
        func: &TypedFunc<TextArgs, i32>,
        name: &str,
        source: &str,
    ) -> wasmtime::Result<i32> {
        let (name_ptr, name_len) = self.write_string(name)?;
        let (source_ptr, source_len) = self.write_string(source)?;
        func.call(&mut self.store, (name_ptr, name_len, source_ptr, source_len))
    }

    fn read_packed_string(&self, packed: i32) -> Result<String> {
        host::read_packed_string(&self.store, &self.exports.memory, packed)
    }

    fn read_string(&self, (ptr, len): (u32, u32)) -> Result<String> {
        host::read_string(&self.store, &self.exports.memory, ptr, len)
    }

    /// Turn the text returned by `execute` into a result.
    ///
    /// Anything that is not a readable JSON record is handed back as raw
    /// stdout with exit code -1.
    fn decode_result(&self, text: String) -> ExecuteResult {
        if !text.starts_with('{') {
            tracing::warn!("guest returned a non-record result");
            return ExecuteResult::raw(text);
        }

        let record = match serde_json::from_str::<ExecuteRecord>(&text) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("malformed guest result record: {}", e);
                return ExecuteResult::raw(text);
            }
        };

        let fields = self.read_string(record.stdout).and_then(|stdout| {
            Ok((
                stdout,
                self.read_string(record.stderr)?,
                self.read_string(record.trace)?,
            ))
        });
        match fields {
            Ok((stdout, stderr, trace)) => ExecuteResult {
                exit_code: record.exit_code,
                stdout,
                stderr,
                trace,
            },
            Err(e) => {
                tracing::warn!("guest result record points outside memory: {}", e);
                ExecuteResult::raw(text)
            }
        }
    }
}

fn ready_guest(state: BridgeState, live: &mut Option<LiveGuest>) -> Result<&mut LiveGuest> {
    match (state, live) {
        (BridgeState::Ready, Some(live)) => Ok(live),
        (BridgeState::Faulted, _) => Err(Error::Faulted),
        _ => Err(Error::NotReady),
    }
}

fn trap_of(err: &wasmtime::Error) -> Option<Trap> {
    err.downcast_ref::<Trap>().copied()
}

fn describe(err: &wasmtime::Error) -> String {
    match trap_of(err) {
        Some(trap) => trap.to_string(),
        None => format!("{err:#}"),
    }
}

/// Owns the compiled guest module and at most one live instance of it.
///
/// Every call is synchronous and runs on the caller's thread; see
/// [`GuestBridge`](crate::GuestBridge) for the asynchronous front end.
pub struct GuestRunner {
    engine: Engine,
    module: Module,
    linker: Linker<HostState>,
    config: BridgeConfig,
    live: Option<LiveGuest>,
    state: BridgeState,
    /// The live instance has run guest code since it was started.
    tainted: bool,
}

impl GuestRunner {
    /// Compile a guest from binary WebAssembly or its text format.
    pub fn new(wasm: impl AsRef<[u8]>, config: BridgeConfig) -> Result<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, wasm).map_err(|e| Error::Wasm(e.to_string()))?;
        let mut linker = Linker::new(&engine);
        HostFunctions::register(&mut linker)?;

        tracing::debug!(
            imports = module.imports().len(),
            exports = module.exports().len(),
            "compiled guest module"
        );

        Ok(Self {
            engine,
            module,
            linker,
            config,
            live: None,
            state: BridgeState::Uninitialized,
            tainted: false,
        })
    }

    /// Compile the guest module at `path`.
    pub fn from_file(path: impl AsRef<Path>, config: BridgeConfig) -> Result<Self> {
        let wasm = std::fs::read(path)?;
        Self::new(wasm, config)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Whether calls may be issued.
    pub fn is_ready(&self) -> bool {
        self.state == BridgeState::Ready
    }

    /// The bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Host state of the live instance, if any.
    pub fn host_state(&self) -> Option<&HostState> {
        self.live.as_ref().map(|live| live.store.data())
    }

    /// Start the guest. Does nothing when it is already ready.
    pub fn init(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        self.boot()
    }

    /// Discard the live instance and start a fresh one from the compiled module.
    pub fn restart(&mut self) -> Result<()> {
        tracing::debug!(state = ?self.state, "restarting guest");
        self.boot()
    }

    /// Run the guest tokenizer over `source`.
    ///
    /// A trap faults the instance and comes back as [`Error::Trap`] carrying
    /// the trap text; the guest never gets to report it as a string.
    pub fn tokenize(&mut self, name: &str, source: &str) -> Result<String> {
        self.call_text("tokenize", |exports| &exports.tokenize, name, source)
    }

    /// Run the guest parser over `source`. Traps are reported as for
    /// [`tokenize`](Self::tokenize).
    pub fn parse(&mut self, name: &str, source: &str) -> Result<String> {
        self.call_text("parse", |exports| &exports.parse, name, source)
    }

    /// Execute `source` to completion.
    ///
    /// Guest-level failures, including traps, are reported inside the result
    /// with exit code -1. Errors are returned only when no instance could be
    /// brought up.
    pub fn execute(&mut self, name: &str, source: &str) -> Result<ExecuteResult> {
        let restart = match self.config.restart_policy {
            RestartPolicy::Always => true,
            RestartPolicy::WhenTainted => !self.is_ready() || self.tainted,
        };
        if restart {
            self.restart()?;
        }

        let live = ready_guest(self.state, &mut self.live)?;
        self.tainted = true;
        live.store.data_mut().clear_console();
        let stderr_mark = live.store.data().stderr_len();
        let func = live.exports.execute.clone();

        tracing::debug!(name, source_len = source.len(), "executing guest program");
        let err = match live.call(&func, name, source) {
            Ok(packed) => {
                let text = match live.read_packed_string(packed) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("unreadable guest result: {}", e);
                        return Ok(ExecuteResult::failure(e.to_string()));
                    }
                };
                return Ok(live.decode_result(text));
            }
            Err(err) => err,
        };

        let trap = trap_of(&err);
        let message = describe(&err);
        let stderr = match trap {
            Some(Trap::UnreachableCodeReached) => live
                .store
                .data()
                .last_diagnostic_line(stderr_mark)
                .unwrap_or_else(|| message.clone()),
            _ => message.clone(),
        };
        if trap.is_some() {
            self.state = BridgeState::Faulted;
        }
        tracing::warn!(error = %message, state = ?self.state, "guest execute failed");
        Ok(ExecuteResult::failure(stderr))
    }

    fn call_text(
        &mut self,
        op: &'static str,
        pick: fn(&GuestExports) -> &TypedFunc<TextArgs, i32>,
        name: &str,
        source: &str,
    ) -> Result<String> {
        let live = ready_guest(self.state, &mut self.live)?;
        self.tainted = true;
        let func = pick(&live.exports).clone();

        match live.call(&func, name, source) {
            Ok(packed) => live.read_packed_string(packed),
            Err(err) => {
                let message = describe(&err);
                if trap_of(&err).is_some() {
                    self.state = BridgeState::Faulted;
                }
                tracing::warn!(op, error = %message, "guest call failed");
                Err(Error::Trap(message))
            }
        }
    }

    fn boot(&mut self) -> Result<()> {
        self.live = None;
        self.state = BridgeState::Uninitialized;
        self.tainted = false;

        let mut store = Store::new(&self.engine, HostState::new(&self.config));
        let instance = self
            .linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| Error::Wasm(e.to_string()))?;

        if let Some(memory) = instance.get_memory(&mut store, "memory") {
            memory
                .grow(&mut store, self.config.memory_pages)
                .map_err(|e| Error::Memory(e.to_string()))?;
        }

        Self::start(&mut store, &instance)?;
        let exports = self.await_exports(&mut store, &instance)?;

        self.live = Some(LiveGuest { store, exports });
        self.state = BridgeState::Ready;
        tracing::debug!("guest is ready");
        Ok(())
    }

    /// Run the guest's start-up routine, if it exports one.
    fn start(store: &mut Store<HostState>, instance: &Instance) -> Result<()> {
        for entry in ["_initialize", "_start"] {
            let Ok(func) = instance.get_typed_func::<(), ()>(&mut *store, entry) else {
                continue;
            };
            tracing::debug!(entry, "running guest start-up");
            return match func.call(&mut *store, ()) {
                Ok(()) => Ok(()),
                Err(err) if matches!(err.downcast_ref::<I32Exit>(), Some(I32Exit(0))) => Ok(()),
                Err(err) => Err(Error::Trap(format!("{entry}: {}", describe(&err)))),
            };
        }
        Ok(())
    }

    /// Poll until every required export resolves.
    fn await_exports(
        &self,
        store: &mut Store<HostState>,
        instance: &Instance,
    ) -> Result<GuestExports> {
        let attempts = self.config.ready_poll_attempts.max(1);
        for attempt in 1..=attempts {
            match GuestExports::resolve(store, instance) {
                Ok(exports) => return Ok(exports),
                Err(e) => {
                    tracing::debug!(attempt, "waiting for guest to be ready: {}", e);
                    if attempt < attempts {
                        std::thread::sleep(self.config.ready_poll_interval());
                    }
                }
            }
        }
        Err(Error::ReadyTimeout { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUEST: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../testdata/guest.wat"
    ));

    fn runner() -> GuestRunner {
        GuestRunner::new(GUEST, BridgeConfig::default()).unwrap()
    }

    #[test]
    fn calls_before_init_are_rejected() {
        let mut runner = runner();
        assert_eq!(runner.state(), BridgeState::Uninitialized);
        assert!(matches!(runner.tokenize("a", "b"), Err(Error::NotReady)));
    }

    #[test]
    fn init_is_idempotent() {
        let mut runner = runner();
        runner.init().unwrap();
        runner.init().unwrap();
        assert!(runner.is_ready());
    }

    #[test]
    fn tokenize_marshals_unicode() {
        let mut runner = runner();
        runner.init().unwrap();
        assert_eq!(
            runner.tokenize("main.goose", "羊 forward()").unwrap(),
            "羊 forward()"
        );
        assert_eq!(runner.parse("main.goose", "forward()").unwrap(), "");
    }

    #[test]
    fn missing_exports_time_out() {
        let config = BridgeConfig {
            ready_poll_attempts: 2,
            ready_poll_interval_ms: 1,
            ..BridgeConfig::default()
        };
        let mut runner =
            GuestRunner::new(r#"(module (memory (export "memory") 1))"#, config).unwrap();
        assert!(matches!(runner.init(), Err(Error::ReadyTimeout { attempts: 2 })));
        assert!(!runner.is_ready());
    }

    #[test]
    fn nonzero_exit_during_start_up_fails_boot() {
        let guest = r#"(module
            (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
            (func (export "_start") (call $exit (i32.const 3))))"#;
        let mut runner = GuestRunner::new(guest, BridgeConfig::default()).unwrap();
        assert!(matches!(runner.init(), Err(Error::Trap(_))));
    }

    #[test]
    fn trap_reports_last_wasi_stderr_line() {
        let guest = r#"(module
            (import "wasi_snapshot_preview1" "fd_write"
                (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 16) "first\nlast words\n")
            (func (export "malloc") (param i32) (result i32) (i32.const 1024))
            (func (export "tokenize") (param i32 i32 i32 i32) (result i32) (i32.const 0))
            (func (export "parse") (param i32 i32 i32 i32) (result i32) (i32.const 0))
            (func (export "execute") (param i32 i32 i32 i32) (result i32)
                (i32.store (i32.const 0) (i32.const 16))
                (i32.store (i32.const 4) (i32.const 17))
                (drop (call $fd_write (i32.const 2) (i32.const 0) (i32.const 1) (i32.const 8)))
                unreachable))"#;
        let mut runner = GuestRunner::new(guest, BridgeConfig::default()).unwrap();
        runner.init().unwrap();

        let result = runner.execute("main.goose", "x").unwrap();
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.stderr, "last words");
        assert_eq!(runner.state(), BridgeState::Faulted);
        assert_eq!(
            runner.host_state().unwrap().captured_stderr(),
            "first\nlast words\n"
        );
    }

    #[test]
    fn invalid_module_is_a_wasm_error() {
        let err = GuestRunner::new("(module", BridgeConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Wasm(_)));
    }
}
