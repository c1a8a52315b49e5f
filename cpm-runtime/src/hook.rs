//! Loop-site hook
//!
//! The host compiles each candidate loop once into a [`LoopSite`] and
//! calls [`Accelerator::run`] instead of iterating. The accelerated path
//! is attempted first; literal iteration is the fallback.

use cpm_compiler::{CompiledLoop, Instruction, recompile};
use num_bigint::BigInt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::executor::exec_loop;
use crate::frame::Frame;
use crate::naive;
use crate::progression::Iterable;
use crate::settings::Settings;

/// How an invocation was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPath {
    /// Matrix exponentiation
    Accelerated,
    /// Too few iterations, ran literally
    Skipped,
    /// Compilation or the accelerated attempt failed, ran literally
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub path: ExecPath,
    pub iterations: BigInt,
}

/// A compiled loop site. Immutable after [`Accelerator::compile`], so one
/// site can serve concurrent invocations with separate frames.
#[derive(Debug, Clone)]
pub struct LoopSite {
    body: Vec<Instruction>,
    head_line: Option<u32>,
    compiled: Option<CompiledLoop>,
}

impl LoopSite {
    pub fn body(&self) -> &[Instruction] {
        &self.body
    }

    pub fn head_line(&self) -> Option<u32> {
        self.head_line
    }

    /// `None` when recompilation failed and the site always runs literally
    pub fn compiled(&self) -> Option<&CompiledLoop> {
        self.compiled.as_ref()
    }

    pub fn is_accelerated(&self) -> bool {
        self.compiled.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Accelerator {
    settings: Settings,
}

impl Accelerator {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self {
            settings: settings.validate()?,
        })
    }

    /// Settings from defaults and the environment (`CPM_*`, `.env`)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            settings: Settings::from_env()?,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Recompiles a loop body. Outside strict mode a failure is logged and
    /// produces a site that always iterates literally.
    pub fn compile(&self, body: Vec<Instruction>, head_line: Option<u32>) -> Result<LoopSite> {
        let compiled = match recompile(&body, &self.settings.compile_options(), head_line) {
            Ok(compiled) => {
                info!(line = ?head_line, "Recompilation succeeded");
                debug!("matrix code:\n{}", compiled.disassemble());
                Some(compiled)
            }
            Err(err) if self.settings.strict => return Err(Error::Compile(err)),
            Err(err) => {
                warn!(line = ?head_line, error = %err, "Recompilation failed");
                None
            }
        };
        Ok(LoopSite {
            body,
            head_line,
            compiled,
        })
    }

    /// Runs the loop over `iterable` against `frame`. Host variables are
    /// only touched after the accelerated run fully succeeded, or by the
    /// literal fallback.
    pub fn run(&self, site: &LoopSite, iterable: &Iterable, frame: &mut Frame) -> Result<RunReport> {
        let iterations = iterable.len();
        let report = |path| RunReport {
            path,
            iterations: iterations.clone(),
        };

        let Some(compiled) = &site.compiled else {
            naive::run(&site.body, iterable, frame)?;
            return Ok(report(ExecPath::Fallback));
        };

        match exec_loop(compiled, iterable, frame, &self.settings) {
            Ok(Some(write_back)) => {
                write_back.apply(frame);
                info!(line = ?site.head_line, "Optimized execution of {} iterations", iterations);
                Ok(report(ExecPath::Accelerated))
            }
            Ok(None) => {
                debug!(line = ?site.head_line, "Skipped optimization of {} iterations", iterations);
                naive::run(&site.body, iterable, frame)?;
                Ok(report(ExecPath::Skipped))
            }
            Err(err) if self.settings.strict => Err(Error::Runtime(err)),
            Err(err) => {
                warn!(line = ?site.head_line, error = %err, "Hook didn't allow optimization");
                naive::run(&site.body, iterable, frame)?;
                Ok(report(ExecPath::Fallback))
            }
        }
    }
}
