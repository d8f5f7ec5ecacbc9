//! Helper Registry C text fragments (spec.md §4.8 "Runtime Helper
//! Registry"). One fragment per [`HelperCategory`], keyed by the same
//! enum `btrc_irgen::helpers` uses for the prerequisite graph -- this
//! crate owns the actual C source, that one only owns the names and
//! dependency edges.
//!
//! `VectorOf`/`ListOf`/`ArrayOf`/`MapOf`/`SetOf` have no fragment of their
//! own: every built-in collection operation lowers to real generated IR
//! (struct + functions emitted like any other declaration), so by the
//! time the Emitter gets here there is nothing left for those categories
//! to contribute but their place in the reachability graph that keeps
//! `Arc` live.

use btrc_irgen::helpers::HelperCategory;

use crate::context::EmitContext;

pub fn emit(ctx: &mut EmitContext, category: HelperCategory) {
    match category {
        HelperCategory::Arc => emit_arc(ctx),
        HelperCategory::ArcCycle => emit_arc_cycle(ctx),
        HelperCategory::SafeDiv => emit_safe_div(ctx),
        HelperCategory::StringPool => emit_string_pool(ctx),
        HelperCategory::FStringFormat => emit_fstring_format(ctx),
        HelperCategory::ExceptionUnwind => emit_exception_unwind(ctx),
        HelperCategory::VectorOf
        | HelperCategory::ListOf
        | HelperCategory::ArrayOf
        | HelperCategory::MapOf
        | HelperCategory::SetOf => {}
    }
}

/// Null-checked allocation wrappers plus the generic retain/release pair
/// (spec.md §4.5 "Reference counting", §4.8 "safe allocation wrappers").
/// `__btrc_retain`/`__btrc_release` read/write the `__rc` field through a
/// bare `void*` reinterpreted as `__btrc_rc_header*` -- every lowered
/// class struct places `__rc` first (see `btrc_irgen::lower::class`), so
/// one pair of functions serves every class without per-class codegen.
fn emit_arc(ctx: &mut EmitContext) {
    ctx.writeln("// __btrc_alloc / __btrc_realloc: null-checked heap allocation");
    ctx.writeln("static void* __btrc_alloc(size_t size) {");
    ctx.indent();
    ctx.writeln("void* p = malloc(size);");
    ctx.writeln("if (!p) { fprintf(stderr, \"btrc: out of memory\\n\"); abort(); }");
    ctx.writeln("return p;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static void* __btrc_realloc(void* ptr, size_t size) {");
    ctx.indent();
    ctx.writeln("void* p = realloc(ptr, size);");
    ctx.writeln("if (!p) { fprintf(stderr, \"btrc: out of memory\\n\"); abort(); }");
    ctx.writeln("return p;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("// __btrc_retain / __btrc_release: generic per-object reference counting");
    ctx.writeln("typedef struct { int __rc; } __btrc_rc_header;");
    ctx.newline();
    ctx.writeln("static void __btrc_retain(void* obj) {");
    ctx.indent();
    ctx.writeln("if (!obj) { return; }");
    ctx.writeln("((__btrc_rc_header*)obj)->__rc++;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static void __btrc_release(void* obj, void (*destroy)(void*)) {");
    ctx.indent();
    ctx.writeln("if (!obj) { return; }");
    ctx.writeln("if (--((__btrc_rc_header*)obj)->__rc <= 0) { destroy(obj); }");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
}

/// Bacon-Rajan-style trial deletion for classes the type-graph analysis
/// marked `is_cycle_capable` (spec.md §4.5, §4.8 "ARC cycle collection").
/// `__btrc_release_cyclable` behaves exactly like `__btrc_release` when
/// the count reaches zero; when it doesn't, the object is queued as a
/// possible cycle root instead of leaking forever. `__btrc_collect_cycles`
/// walks the queue, trial-decrements every root's children through its
/// `_trace` function, frees whatever that leaves at zero, and restores the
/// count of everything still externally reachable.
fn emit_arc_cycle(ctx: &mut EmitContext) {
    ctx.writeln("// __btrc_release_cyclable / __btrc_collect_cycles: trial-deletion cycle collection");
    ctx.writeln("typedef struct {");
    ctx.indent();
    ctx.writeln("void* obj;");
    ctx.writeln("void (*destroy)(void*);");
    ctx.writeln("void (*trace)(void*, void (*)(void*));");
    ctx.dedent();
    ctx.writeln("} __btrc_cycle_candidate;");
    ctx.newline();
    ctx.writeln("static __btrc_cycle_candidate* __btrc_cycle_roots = NULL;");
    ctx.writeln("static size_t __btrc_cycle_root_count = 0;");
    ctx.writeln("static size_t __btrc_cycle_root_cap = 0;");
    ctx.newline();
    ctx.writeln("static void __btrc_cycle_add_root(void* obj, void (*destroy)(void*), void (*trace)(void*, void (*)(void*))) {");
    ctx.indent();
    ctx.writeln("if (__btrc_cycle_root_count == __btrc_cycle_root_cap) {");
    ctx.indent();
    ctx.writeln("__btrc_cycle_root_cap = __btrc_cycle_root_cap ? __btrc_cycle_root_cap * 2 : 16;");
    ctx.writeln("__btrc_cycle_roots = __btrc_realloc(__btrc_cycle_roots, __btrc_cycle_root_cap * sizeof(__btrc_cycle_candidate));");
    ctx.dedent();
    ctx.writeln("}");
    ctx.writeln("__btrc_cycle_roots[__btrc_cycle_root_count].obj = obj;");
    ctx.writeln("__btrc_cycle_roots[__btrc_cycle_root_count].destroy = destroy;");
    ctx.writeln("__btrc_cycle_roots[__btrc_cycle_root_count].trace = trace;");
    ctx.writeln("__btrc_cycle_root_count++;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static void __btrc_cycle_decrement_visit(void* child) { ((__btrc_rc_header*)child)->__rc--; }");
    ctx.writeln("static void __btrc_cycle_increment_visit(void* child) { ((__btrc_rc_header*)child)->__rc++; }");
    ctx.newline();
    ctx.writeln("static void __btrc_release_cyclable(void* obj, void (*destroy)(void*), void (*trace)(void*, void (*)(void*))) {");
    ctx.indent();
    ctx.writeln("if (!obj) { return; }");
    ctx.writeln("if (--((__btrc_rc_header*)obj)->__rc <= 0) {");
    ctx.indent();
    ctx.writeln("destroy(obj);");
    ctx.dedent();
    ctx.writeln("} else {");
    ctx.indent();
    ctx.writeln("__btrc_cycle_add_root(obj, destroy, trace);");
    ctx.dedent();
    ctx.writeln("}");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static void __btrc_collect_cycles(void) {");
    ctx.indent();
    ctx.writeln("for (size_t i = 0; i < __btrc_cycle_root_count; i++) {");
    ctx.indent();
    ctx.writeln("if (__btrc_cycle_roots[i].obj) { __btrc_cycle_roots[i].trace(__btrc_cycle_roots[i].obj, __btrc_cycle_decrement_visit); }");
    ctx.dedent();
    ctx.writeln("}");
    ctx.writeln("for (size_t i = 0; i < __btrc_cycle_root_count; i++) {");
    ctx.indent();
    ctx.writeln("void* obj = __btrc_cycle_roots[i].obj;");
    ctx.writeln("if (!obj) { continue; }");
    ctx.writeln("if (((__btrc_rc_header*)obj)->__rc <= 0) {");
    ctx.indent();
    ctx.writeln("__btrc_cycle_roots[i].destroy(obj);");
    ctx.writeln("__btrc_cycle_roots[i].obj = NULL;");
    ctx.dedent();
    ctx.writeln("} else {");
    ctx.indent();
    ctx.writeln("__btrc_cycle_roots[i].trace(obj, __btrc_cycle_increment_visit);");
    ctx.dedent();
    ctx.writeln("}");
    ctx.dedent();
    ctx.writeln("}");
    ctx.writeln("__btrc_cycle_root_count = 0;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
}

/// Division-by-zero checks (spec.md §4.8). IEEE 754 float/double division
/// already has defined divide-by-zero behavior (`inf`/`nan`), so only the
/// integer forms route through here.
fn emit_safe_div(ctx: &mut EmitContext) {
    ctx.writeln("// __btrc_safe_div / __btrc_safe_mod: checked integer division");
    ctx.writeln("static int __btrc_safe_div(int a, int b) {");
    ctx.indent();
    ctx.writeln("if (b == 0) { fprintf(stderr, \"btrc: division by zero\\n\"); abort(); }");
    ctx.writeln("return a / b;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static int __btrc_safe_mod(int a, int b) {");
    ctx.indent();
    ctx.writeln("if (b == 0) { fprintf(stderr, \"btrc: modulo by zero\\n\"); abort(); }");
    ctx.writeln("return a % b;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
}

/// A growable buffer used to assemble f-string and exception `what()`
/// text before it's handed off as a plain `char*` (spec.md §4.8 "string
/// pool"). Prerequisite of [`HelperCategory::FStringFormat`] and
/// [`HelperCategory::ExceptionUnwind`], never called directly from
/// lowered IR by name -- it only backs those two fragments' own calls.
fn emit_string_pool(ctx: &mut EmitContext) {
    ctx.writeln("// __btrc_strbuf: growable buffer backing f-string and exception formatting");
    ctx.writeln("typedef struct { char* data; size_t len; size_t cap; } __btrc_strbuf;");
    ctx.newline();
    ctx.writeln("static void __btrc_strbuf_init(__btrc_strbuf* buf) {");
    ctx.indent();
    ctx.writeln("buf->cap = 64;");
    ctx.writeln("buf->len = 0;");
    ctx.writeln("buf->data = __btrc_alloc(buf->cap);");
    ctx.writeln("buf->data[0] = '\\0';");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static void __btrc_strbuf_append(__btrc_strbuf* buf, const char* s) {");
    ctx.indent();
    ctx.writeln("size_t add = strlen(s);");
    ctx.writeln("if (buf->len + add + 1 > buf->cap) {");
    ctx.indent();
    ctx.writeln("while (buf->len + add + 1 > buf->cap) { buf->cap *= 2; }");
    ctx.writeln("buf->data = __btrc_realloc(buf->data, buf->cap);");
    ctx.dedent();
    ctx.writeln("}");
    ctx.writeln("memcpy(buf->data + buf->len, s, add + 1);");
    ctx.writeln("buf->len += add;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
}

/// `__btrc_format(fmt, ...)`: a variadic `snprintf`-based formatter
/// backing f-string interpolation (spec.md §4.8 "f-string formatting").
/// Two-pass: `vsnprintf(NULL, 0, ...)` sizes the buffer, then the real
/// call fills it.
fn emit_fstring_format(ctx: &mut EmitContext) {
    ctx.writeln("// __btrc_format: snprintf-based f-string interpolation");
    ctx.writeln("static char* __btrc_format(const char* fmt, ...) {");
    ctx.indent();
    ctx.writeln("va_list args;");
    ctx.writeln("va_start(args, fmt);");
    ctx.writeln("va_list args_copy;");
    ctx.writeln("va_copy(args_copy, args);");
    ctx.writeln("int needed = vsnprintf(NULL, 0, fmt, args_copy);");
    ctx.writeln("va_end(args_copy);");
    ctx.writeln("char* out = __btrc_alloc((size_t)needed + 1);");
    ctx.writeln("vsnprintf(out, (size_t)needed + 1, fmt, args);");
    ctx.writeln("va_end(args);");
    ctx.writeln("return out;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
}

/// `setjmp`/`longjmp` try/catch scaffolding (spec.md §4.8 "exception
/// unwinding"): a stack of frames, the currently-pending exception's type
/// name and payload, and the three functions `Stmt::RawC` lowering
/// assumes exist by name.
fn emit_exception_unwind(ctx: &mut EmitContext) {
    ctx.writeln("// __btrc_exc_frame / __btrc_exc_push / __btrc_exc_pop / __btrc_exc_throw");
    ctx.writeln("#define __BTRC_EXC_MAX_DEPTH 64");
    ctx.newline();
    ctx.writeln("typedef struct {");
    ctx.indent();
    ctx.writeln("jmp_buf buf;");
    ctx.dedent();
    ctx.writeln("} __btrc_exc_frame;");
    ctx.newline();
    ctx.writeln("static __btrc_exc_frame __btrc_exc_stack[__BTRC_EXC_MAX_DEPTH];");
    ctx.writeln("static int __btrc_exc_depth = 0;");
    ctx.writeln("static const char* __btrc_exc_type = NULL;");
    ctx.writeln("static void* __btrc_exc_value = NULL;");
    ctx.newline();
    ctx.writeln("static void __btrc_exc_push(__btrc_exc_frame* frame) {");
    ctx.indent();
    ctx.writeln("if (__btrc_exc_depth >= __BTRC_EXC_MAX_DEPTH) { fprintf(stderr, \"btrc: exception frame overflow\\n\"); abort(); }");
    ctx.writeln("__btrc_exc_stack[__btrc_exc_depth++] = *frame;");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static void __btrc_exc_pop(void) {");
    ctx.indent();
    ctx.writeln("if (__btrc_exc_depth > 0) { __btrc_exc_depth--; }");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
    ctx.writeln("static _Noreturn void __btrc_exc_throw(const char* type, void* value) {");
    ctx.indent();
    ctx.writeln("__btrc_exc_type = type;");
    ctx.writeln("__btrc_exc_value = value;");
    ctx.writeln("if (__btrc_exc_depth == 0) {");
    ctx.indent();
    ctx.writeln("fprintf(stderr, \"btrc: unhandled exception of type %s\\n\", type);");
    ctx.writeln("abort();");
    ctx.dedent();
    ctx.writeln("}");
    ctx.writeln("longjmp(__btrc_exc_stack[--__btrc_exc_depth].buf, 1);");
    ctx.dedent();
    ctx.writeln("}");
    ctx.newline();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_defines_both_wrappers() {
        let mut ctx = EmitContext::new();
        emit(&mut ctx, HelperCategory::Arc);
        let out = ctx.take_output();
        assert!(out.contains("__btrc_alloc"));
        assert!(out.contains("__btrc_realloc"));
    }

    #[test]
    fn arc_defines_retain_and_release() {
        let mut ctx = EmitContext::new();
        emit(&mut ctx, HelperCategory::Arc);
        let out = ctx.take_output();
        assert!(out.contains("__btrc_retain"));
        assert!(out.contains("__btrc_release"));
        assert!(out.contains("__rc"));
    }

    #[test]
    fn arc_cycle_defines_collector_and_cyclable_release() {
        let mut ctx = EmitContext::new();
        emit(&mut ctx, HelperCategory::ArcCycle);
        let out = ctx.take_output();
        assert!(out.contains("__btrc_release_cyclable"));
        assert!(out.contains("__btrc_collect_cycles"));
        assert!(out.contains("__btrc_cycle_add_root"));
    }

    #[test]
    fn safe_div_guards_both_operators() {
        let mut ctx = EmitContext::new();
        emit(&mut ctx, HelperCategory::SafeDiv);
        let out = ctx.take_output();
        assert!(out.contains("__btrc_safe_div"));
        assert!(out.contains("__btrc_safe_mod"));
        assert!(out.contains("division by zero"));
    }

    #[test]
    fn exception_unwind_defines_the_frame_struct_and_trio() {
        let mut ctx = EmitContext::new();
        emit(&mut ctx, HelperCategory::ExceptionUnwind);
        let out = ctx.take_output();
        assert!(out.contains("__btrc_exc_frame"));
        assert!(out.contains("jmp_buf buf"));
        assert!(out.contains("__btrc_exc_push"));
        assert!(out.contains("__btrc_exc_pop"));
        assert!(out.contains("__btrc_exc_throw"));
    }

    #[test]
    fn container_categories_emit_nothing() {
        let mut ctx = EmitContext::new();
        emit(&mut ctx, HelperCategory::VectorOf);
        assert_eq!(ctx.take_output(), "");
    }
}
