//! Test utilities for module system testing
//!
//! Provides a shared event journal, recording modules and a log capture
//! writer.
#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Ordered record of lifecycle events, shared through the root context
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events with the given prefix, prefix stripped (`"start"` -> `["A", "B"]`)
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = format!("{}:", prefix);
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

/// Capability used by the scenario tests
pub trait Service: Send + Sync {
    fn label(&self) -> &'static str;
}

/// Define a module that records `start:<Name>` / `stop:<Name>` in the
/// [`Journal`] it gets injected with.
///
/// ```ignore
/// recording_module!(A);
/// recording_module!(B, deps = [ModuleRef::module::<A>()], provides = Service);
/// ```
#[allow(unused_macros)]
macro_rules! recording_module {
    ($name:ident) => {
        recording_module!(@define $name, [], None);
    };
    ($name:ident, deps = [$($dep:expr),* $(,)?]) => {
        recording_module!(@define $name, [$($dep),*], None);
    };
    ($name:ident, deps = [$($dep:expr),* $(,)?], provides = $cap:ident) => {
        recording_module!(
            @define $name,
            [$($dep),*],
            Some(module_host::module::Capability::new(
                |m: std::sync::Arc<Self>| m as std::sync::Arc<dyn $cap>
            ))
        );
    };
    (@define $name:ident, [$($dep:expr),*], $provides:expr) => {
        #[derive(Default)]
        pub struct $name {
            journal: Option<std::sync::Arc<$crate::common::Journal>>,
            running: std::sync::atomic::AtomicBool,
        }

        impl $crate::common::Service for $name {
            fn label(&self) -> &'static str {
                stringify!($name)
            }
        }

        impl module_host::module::Module for $name {
            fn start(&self) -> Result<(), module_host::module::ModuleError> {
                if self.running.swap(true, std::sync::atomic::Ordering::SeqCst) {
                    return Ok(());
                }
                if let Some(journal) = &self.journal {
                    journal.record(concat!("start:", stringify!($name)));
                }
                Ok(())
            }

            fn stop(&self) -> Result<(), module_host::module::ModuleError> {
                if !self.running.swap(false, std::sync::atomic::Ordering::SeqCst) {
                    return Ok(());
                }
                if let Some(journal) = &self.journal {
                    journal.record(concat!("stop:", stringify!($name)));
                }
                Ok(())
            }

            fn is_running(&self) -> bool {
                self.running.load(std::sync::atomic::Ordering::SeqCst)
            }
        }

        impl module_host::module::ModuleDefinition for $name {
            fn create() -> Result<Self, module_host::module::ModuleError> {
                Ok(Self::default())
            }

            fn dependencies() -> Vec<module_host::module::ModuleRef> {
                vec![$($dep),*]
            }

            fn provides() -> Option<module_host::module::Capability<Self>> {
                $provides
            }

            fn slots() -> Vec<module_host::module::Slot<Self>> {
                vec![module_host::module::Slot::of(
                    "journal",
                    |m: &mut Self, journal: std::sync::Arc<$crate::common::Journal>| {
                        m.journal = Some(journal)
                    },
                )]
            }
        }
    };
}

/// In-memory writer for asserting on log output
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Run `f` with a subscriber that writes warnings and above into this buffer
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Write `<root>/<dir>/module.toml`
pub fn write_manifest(root: &Path, dir: &str, contents: &str) -> PathBuf {
    let module_dir = root.join(dir);
    std::fs::create_dir_all(&module_dir).unwrap();
    let path = module_dir.join("module.toml");
    std::fs::write(&path, contents).unwrap();
    path
}
