//! Behavioural checks over realistic prototype lists.

use dlwrap_gen::{Generator, Interpose, LazyBind, Parser, SymbolKind};

const STDIO: &str = "\
#include <stdio.h>

void *malloc(size_t size);
void free(void *ptr);
void *calloc(size_t count, size_t size);
void *realloc(void *ptr, size_t size);

FILE* fopen(const char *restrict filename, const char *restrict mode);
int fclose(FILE *stream);
size_t fread(void *restrict ptr, size_t size, size_t nitems, FILE *restrict stream);
size_t fwrite(const void *restrict ptr, size_t size, size_t nitems, FILE *restrict stream);
";

const MMAN: &str = "\
int    mlock(const void *a, size_t b);
int    mlockall(int a);
void  *mmap(void *a, size_t b, int c, int d, int e, off_t f);
int    munlockall(void);
//unsupported: int    posix_typed_mem_get_info(int a, struct posix_typed_mem_info *b);
int    shm_unlink(const char *a);";

#[test]
fn test_every_declaration_gets_interpose_wrapper() {
    let generated = Generator::default().generate(STDIO).unwrap();
    let section = &generated.shim.interpose_section;
    for decl in &generated.model.declarations {
        let wrapper = Interpose::wrapper_name(decl);
        assert_eq!(wrapper, format!("wrap_{}", decl.name));
        assert_eq!(
            section
                .matches(&format!("DYLD_INTERPOSE({wrapper}, {});", decl.name))
                .count(),
            1
        );
    }
}

#[test]
fn test_return_prefix_follows_void_in_both_targets() {
    let generated = Generator::default().generate(STDIO).unwrap();
    let shim = &generated.shim;
    for decl in &generated.model.declarations {
        let args = decl.call_args();
        let interpose_call = format!("  {}({args});\n", decl.name);
        let lazy_target = if decl.kind == SymbolKind::AllocationPrimitive {
            LazyBind::libc_alias(decl)
        } else {
            LazyBind::real_slot(decl)
        };
        let lazy_call = format!("  {lazy_target}({args});\n");

        if decl.returns_void() {
            assert!(shim.interpose_section.contains(&interpose_call), "{}", decl.name);
            assert!(shim.lazy_section.contains(&lazy_call), "{}", decl.name);
            assert!(!shim.interpose_section.contains(&format!("return {}(", decl.name)));
        } else {
            assert!(shim.interpose_section.contains(&format!("  return {}({args});\n", decl.name)));
            assert!(shim.lazy_section.contains(&format!("  return {lazy_target}({args});\n")));
        }
    }
}

#[test]
fn test_allocation_primitives_bypass_dlsym() {
    let lazy = Generator::default().generate(STDIO).unwrap().shim.lazy_section;
    for name in ["malloc", "free", "calloc", "realloc"] {
        assert!(lazy.contains(&format!("__libc_{name}(")), "{name}");
        assert!(!lazy.contains(&format!("real_{name}")), "{name}");
        assert!(!lazy.contains(&format!("\"{name}\"")), "{name}");
    }
    assert!(lazy.contains("void *calloc(size_t count, size_t size)\n{\n  return __libc_calloc(count, size);\n}\n"));
}

#[test]
fn test_forwarded_symbols_resolve_once_and_check_flag() {
    let lazy = Generator::default().generate(STDIO).unwrap().shim.lazy_section;
    for name in ["fopen", "fclose", "fread", "fwrite"] {
        assert_eq!(
            lazy.matches(&format!("  real_{name} = dlsym(RTLD_NEXT, \"{name}\");\n")).count(),
            1,
            "{name}"
        );
    }
    assert_eq!(lazy.matches("  if (!inited) { wrapper_init(); }\n").count(), 4);
    assert!(lazy.contains(
        "size_t fread(void *restrict ptr, size_t size, size_t nitems, FILE *restrict stream)\n{\n  if (!inited) { wrapper_init(); }\n  return real_fread(ptr, size, nitems, stream);\n}\n"
    ));
}

#[test]
fn test_includes_copied_once_and_not_parsed() {
    let source = Generator::default()
        .generate("#include <a.h>\n#include <b.h>\n#include \"weird(x);\"\nint f(int a);\n")
        .unwrap()
        .source();
    assert_eq!(source.matches("#include <a.h>\n").count(), 1);
    assert!(source.find("#include <a.h>").unwrap() < source.find("#include <b.h>").unwrap());
    assert!(source.contains("#include \"weird(x);\"\n"));
    assert!(!source.contains("wrap_weird"));
}

#[test]
fn test_padded_header() {
    let generated = Generator::default().generate(MMAN).unwrap();
    let names: Vec<_> = generated.model.declarations.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["mlock", "mlockall", "mmap", "munlockall", "shm_unlink"]);

    let source = generated.source();
    assert!(source.contains("void  *wrap_mmap(void *a, size_t b, int c, int d, int e, off_t f);\n"));
    assert!(source.contains("static void  *(*real_mmap) (void *a, size_t b, int c, int d, int e, off_t f) = NULL;\n"));
    assert!(source.contains("  return real_mmap(a, b, c, d, e, f);\n"));
    assert!(source.contains("int    wrap_munlockall(void)\n{\n  return munlockall();\n}\n"));
    assert!(!source.contains("posix_typed_mem_get_info"));
}

#[test]
fn test_unbalanced_line_produces_nothing() {
    let generated = Generator::default().generate("int broken(int a;\n").unwrap();
    assert!(generated.model.declarations.is_empty());
    assert_eq!(generated.model.skipped.len(), 1);
    assert!(!generated.source().contains("broken"));
}

#[test]
fn test_parse_once_render_twice() {
    let model = Parser::default().parse_source(STDIO);
    let first = dlwrap_gen::render(&model, &Default::default());
    let second = dlwrap_gen::render(&model, &Default::default());
    assert_eq!(first, second);
    assert_eq!(model.declarations.len(), 8);
}
