//! Linux lazy-resolution target.
//!
//! Each forwarded symbol gets a `real_<name>` slot that `wrapper_init` fills
//! with `dlsym(RTLD_NEXT, "<name>")`. Wrappers call `wrapper_init` first if
//! the process-wide flag is still clear.
//!
//! Allocation primitives take a separate path: `dlsym` can allocate, so a
//! guarded `malloc` wrapper would re-enter itself while resolving. They call
//! glibc's `__libc_<name>` entry points directly instead.

use dlwrap_config::InitGuard;

use super::{lifecycle_fn, EmitOptions, Target, FINI_FN, INIT_FLAG, INIT_FN};
use crate::classify::SymbolKind;
use crate::parse::{Declaration, ShimModel};

const REAL_PREFIX: &str = "real_";
const LIBC_PREFIX: &str = "__libc_";
const RESOLVE_FN: &str = "wrapper_resolve";
const ONCE_VAR: &str = "wrapper_once";
const HOOK_LATCH: &str = "init_hooked";

pub struct LazyBind;

/// Per-declaration output pieces, appended to separate buffers
struct Pieces {
    declaration: String,
    /// Line for the resolver; `None` for allocation primitives
    resolution: Option<String>,
    body: String,
}

impl LazyBind {
    pub fn real_slot(decl: &Declaration) -> String {
        format!("{REAL_PREFIX}{}", decl.name)
    }

    pub fn libc_alias(decl: &Declaration) -> String {
        format!("{LIBC_PREFIX}{}", decl.name)
    }

    fn pieces(decl: &Declaration, guard: InitGuard) -> Pieces {
        let call = decl.return_prefix();
        let args = decl.call_args();

        match decl.kind {
            SymbolKind::AllocationPrimitive => {
                let alias = Self::libc_alias(decl);
                Pieces {
                    declaration: format!("{}{alias}({});\n", decl.return_type, decl.raw_params),
                    resolution: None,
                    body: format!("{}\n{{\n  {call}{alias}({args});\n}}\n\n", decl.signature),
                }
            }
            SymbolKind::Forwarded => {
                let slot = Self::real_slot(decl);
                Pieces {
                    declaration: format!(
                        "static {}(*{slot}) ({}) = NULL;\n",
                        decl.return_type, decl.raw_params
                    ),
                    resolution: Some(format!(
                        "  {slot} = dlsym(RTLD_NEXT, \"{}\");\n",
                        decl.name
                    )),
                    body: format!(
                        "{}\n{{\n  {}\n  {call}{slot}({args});\n}}\n\n",
                        decl.signature,
                        guard_check(guard)
                    ),
                }
            }
        }
    }
}

fn guard_check(guard: InitGuard) -> String {
    match guard {
        InitGuard::Flag => format!("if (!{INIT_FLAG}) {{ {INIT_FN}(); }}"),
        InitGuard::Once => {
            format!("if (!__atomic_load_n(&{INIT_FLAG}, __ATOMIC_ACQUIRE)) {{ {INIT_FN}(); }}")
        }
    }
}

fn flag_store(guard: InitGuard, value: u8) -> String {
    match guard {
        InitGuard::Flag => format!("  {INIT_FLAG} = {value};\n"),
        InitGuard::Once => format!("  __atomic_store_n(&{INIT_FLAG}, {value}, __ATOMIC_RELEASE);\n"),
    }
}

impl Target for LazyBind {
    fn platform_macro(&self) -> &'static str {
        "__linux__"
    }

    fn render_section(&self, model: &ShimModel, options: &EmitOptions) -> String {
        let guard = options.init_guard;
        let mut declarations = String::new();
        let mut resolutions = String::new();
        let mut bodies = String::new();

        for decl in &model.declarations {
            let pieces = Self::pieces(decl, guard);
            declarations.push_str(&pieces.declaration);
            if let Some(line) = pieces.resolution {
                resolutions.push_str(&line);
            }
            bodies.push_str(&pieces.body);
        }

        let mut out = format!("#ifdef {}\n", self.platform_macro());
        out.push_str(&declarations);
        out.push('\n');

        // resolve every slot, set the flag, then run the user hook
        let mut resolve = resolutions;
        resolve.push_str(&flag_store(guard, 1));
        match (guard, options.on_init.as_deref()) {
            // wrapper_init re-runs whenever the flag is clear, the hook must not
            (InitGuard::Flag, Some(hook)) => {
                out.push_str(&format!("static int {HOOK_LATCH} = 0;\n\n"));
                resolve.push_str(&format!(
                    "  if (!{HOOK_LATCH}) {{ {HOOK_LATCH} = 1; {hook}(); }}\n"
                ));
            }
            _ => resolve.push_str(&options.init_hook_call()),
        }

        match guard {
            InitGuard::Flag => {
                out.push_str(&lifecycle_fn("constructor", INIT_FN, &resolve));
            }
            InitGuard::Once => {
                out.push_str(&format!(
                    "static pthread_once_t {ONCE_VAR} = PTHREAD_ONCE_INIT;\n\n"
                ));
                out.push_str(&format!("static void {RESOLVE_FN}(void)\n{{\n{resolve}}}\n\n"));
                out.push_str(&lifecycle_fn(
                    "constructor",
                    INIT_FN,
                    &format!("  pthread_once(&{ONCE_VAR}, {RESOLVE_FN});\n"),
                ));
            }
        }

        let mut fini = options.fini_hook_call();
        fini.push_str(&flag_store(guard, 0));
        out.push_str(&lifecycle_fn("destructor", FINI_FN, &fini));

        out.push_str(&bodies);
        out.push_str("#endif\n\n");
        out
    }
}
