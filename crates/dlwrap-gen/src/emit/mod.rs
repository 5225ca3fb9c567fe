//! C source emission.
//!
//! Both targets render from the same [`ShimModel`]; nothing is re-parsed.
//!
//! - [`Interpose`]: macOS `__DATA,__interpose` table, resolved by dyld before
//!   any user code runs.
//! - [`LazyBind`]: Linux `dlsym(RTLD_NEXT, ...)` slots filled by
//!   `wrapper_init`, with allocation primitives forwarded to `__libc_<name>`.

mod interpose;
mod lazy;

pub use interpose::Interpose;
pub use lazy::LazyBind;

use dlwrap_config::{log_emit_debug, GeneratorConfig, InitGuard};

use crate::parse::ShimModel;

pub(crate) const INIT_FN: &str = "wrapper_init";
pub(crate) const FINI_FN: &str = "wrapper_fini";
pub(crate) const INIT_FLAG: &str = "inited";

const BASE_HEADERS: &str = "#define _GNU_SOURCE\n#include <dlfcn.h>\n";
const PTHREAD_HEADER: &str = "#include <pthread.h>\n";

/// Knobs that change the generated text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitOptions {
    pub init_guard: InitGuard,
    /// `void f(void)` called from both constructors
    pub on_init: Option<String>,
    /// `void f(void)` called from both destructors
    pub on_fini: Option<String>,
}

impl From<&GeneratorConfig> for EmitOptions {
    fn from(cfg: &GeneratorConfig) -> Self {
        Self {
            init_guard: cfg.init_guard,
            on_init: cfg.on_init.clone(),
            on_fini: cfg.on_fini.clone(),
        }
    }
}

impl EmitOptions {
    pub(crate) fn init_hook_call(&self) -> String {
        hook_call(self.on_init.as_deref())
    }

    pub(crate) fn fini_hook_call(&self) -> String {
        hook_call(self.on_fini.as_deref())
    }
}

fn hook_call(hook: Option<&str>) -> String {
    hook.map(|f| format!("  {f}();\n")).unwrap_or_default()
}

/// One platform-guarded section of the output
pub trait Target {
    /// Preprocessor macro the section is guarded by
    fn platform_macro(&self) -> &'static str;

    fn render_section(&self, model: &ShimModel, options: &EmitOptions) -> String;
}

/// The three output blocks of a generated shim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedShim {
    pub shared_header: String,
    pub interpose_section: String,
    pub lazy_section: String,
}

impl RenderedShim {
    /// Final file contents: header, macOS section, Linux section
    pub fn to_source(&self) -> String {
        let mut out = String::with_capacity(
            self.shared_header.len() + self.interpose_section.len() + self.lazy_section.len(),
        );
        out.push_str(&self.shared_header);
        out.push_str(&self.interpose_section);
        out.push_str(&self.lazy_section);
        out
    }
}

pub fn render(model: &ShimModel, options: &EmitOptions) -> RenderedShim {
    log_emit_debug!(
        "Rendering shim",
        declarations = model.declarations.len(),
        guard = tracing::field::display(options.init_guard),
    );

    RenderedShim {
        shared_header: render_shared_header(model, options),
        interpose_section: Interpose.render_section(model, options),
        lazy_section: LazyBind.render_section(model, options),
    }
}

fn render_shared_header(model: &ShimModel, options: &EmitOptions) -> String {
    let mut out = String::from(BASE_HEADERS);
    if options.init_guard == InitGuard::Once {
        out.push_str(PTHREAD_HEADER);
    }
    for include in &model.includes {
        out.push_str(include);
        out.push('\n');
    }
    out.push('\n');

    for hook in [&options.on_init, &options.on_fini].into_iter().flatten() {
        out.push_str(&format!("extern void {hook}(void);\n"));
    }
    out.push_str(&format!("static int {INIT_FLAG} = 0;\n"));
    out
}

/// `void __attribute__ ((constructor)) wrapper_init(void)` style definition
pub(crate) fn lifecycle_fn(attribute: &str, name: &str, body: &str) -> String {
    format!("void __attribute__ (({attribute})) {name}(void)\n{{\n{body}}}\n\n")
}
