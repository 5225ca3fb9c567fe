//! macOS interpose-table target.

use super::{lifecycle_fn, EmitOptions, Target, FINI_FN, INIT_FN};
use crate::parse::{Declaration, ShimModel};

const WRAP_PREFIX: &str = "wrap_";

const INTERPOSE_MACRO: &str = "#define DYLD_INTERPOSE(_newfun, _orgfun) \\\n\
__attribute__((used)) static struct{ const void *newfun; const void *orgfun; } _interpose_##_orgfun \\\n\
__attribute__ ((section (\"__DATA,__interpose\"))) = { (const void *)(unsigned long)&_newfun, \\\n\
\x20                                                    (const void *)(unsigned long)&_orgfun }\n\n";

/// dyld binds `wrap_<name>` in place of `<name>` at load time, so no lazy
/// resolution or init guard is needed and allocation primitives are not special.
pub struct Interpose;

impl Interpose {
    pub fn wrapper_name(decl: &Declaration) -> String {
        format!("{WRAP_PREFIX}{}", decl.name)
    }

    fn declaration(decl: &Declaration) -> String {
        format!(
            "{}{}({});\n",
            decl.return_type,
            Self::wrapper_name(decl),
            decl.raw_params
        )
    }

    fn body(decl: &Declaration) -> String {
        let wrapper = Self::wrapper_name(decl);
        format!(
            "{ret}{wrapper}({params})\n{{\n  {call}{name}({args});\n}}\nDYLD_INTERPOSE({wrapper}, {name});\n\n",
            ret = decl.return_type,
            params = decl.raw_params,
            call = decl.return_prefix(),
            name = decl.name,
            args = decl.call_args(),
        )
    }
}

impl Target for Interpose {
    fn platform_macro(&self) -> &'static str {
        "__APPLE__"
    }

    fn render_section(&self, model: &ShimModel, options: &EmitOptions) -> String {
        let mut out = format!("#ifdef {}\n", self.platform_macro());
        out.push_str(INTERPOSE_MACRO);

        for decl in &model.declarations {
            out.push_str(&Self::declaration(decl));
        }
        out.push('\n');

        out.push_str(&lifecycle_fn("constructor", INIT_FN, &options.init_hook_call()));
        out.push_str(&lifecycle_fn("destructor", FINI_FN, &options.fini_hook_call()));

        for decl in &model.declarations {
            out.push_str(&Self::body(decl));
        }
        out.push_str("#endif\n\n\n");
        out
    }
}
