//! Byte-exact output checks for the default (flag guard, no hooks) layout.

use dlwrap_gen::Generator;

const INPUT: &str = "\
// allocation
#include <stdio.h>
void *malloc(size_t size);
int fclose(FILE *stream);
";

const EXPECTED: &str = r#"#define _GNU_SOURCE
#include <dlfcn.h>
#include <stdio.h>

static int inited = 0;
#ifdef __APPLE__
#define DYLD_INTERPOSE(_newfun, _orgfun) \
__attribute__((used)) static struct{ const void *newfun; const void *orgfun; } _interpose_##_orgfun \
__attribute__ ((section ("__DATA,__interpose"))) = { (const void *)(unsigned long)&_newfun, \
                                                     (const void *)(unsigned long)&_orgfun }

void *wrap_malloc(size_t size);
int wrap_fclose(FILE *stream);

void __attribute__ ((constructor)) wrapper_init(void)
{
}

void __attribute__ ((destructor)) wrapper_fini(void)
{
}

void *wrap_malloc(size_t size)
{
  return malloc(size);
}
DYLD_INTERPOSE(wrap_malloc, malloc);

int wrap_fclose(FILE *stream)
{
  return fclose(stream);
}
DYLD_INTERPOSE(wrap_fclose, fclose);

#endif


#ifdef __linux__
void *__libc_malloc(size_t size);
static int (*real_fclose) (FILE *stream) = NULL;

void __attribute__ ((constructor)) wrapper_init(void)
{
  real_fclose = dlsym(RTLD_NEXT, "fclose");
  inited = 1;
}

void __attribute__ ((destructor)) wrapper_fini(void)
{
  inited = 0;
}

void *malloc(size_t size)
{
  return __libc_malloc(size);
}

int fclose(FILE *stream)
{
  if (!inited) { wrapper_init(); }
  return real_fclose(stream);
}

#endif

"#;

#[test]
fn test_full_output_matches_layout() {
    let source = Generator::default().generate(INPUT).unwrap().source();
    assert_eq!(source, EXPECTED);
}

#[test]
fn test_empty_input_still_has_boilerplate() {
    let source = Generator::default().generate("").unwrap().source();
    assert!(source.starts_with("#define _GNU_SOURCE\n#include <dlfcn.h>\n\nstatic int inited = 0;\n#ifdef __APPLE__\n"));
    assert!(source.contains(
        "#ifdef __linux__\n\nvoid __attribute__ ((constructor)) wrapper_init(void)\n{\n  inited = 1;\n}\n\n"
    ));
    assert!(source.ends_with("  inited = 0;\n}\n\n#endif\n\n"));
}

#[test]
fn test_generation_is_idempotent() {
    let generator = Generator::default();
    let first = generator.generate(INPUT).unwrap().source();
    let second = generator.generate(INPUT).unwrap().source();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_crlf_input_matches_lf_input() {
    let crlf = INPUT.replace('\n', "\r\n");
    let source = Generator::default().generate(&crlf).unwrap().source();
    assert_eq!(source, EXPECTED);
}
