//! Program compilation, uniform resolution and resource release.

mod common;

use std::rc::Rc;

use glyphfield::backend::{Call, ShaderStage};
use glyphfield::{Context, Error, Font};

use common::{backend, context, params, Rectangles};

#[test]
fn test_schema_is_identical_across_contexts() {
    let backend = backend();
    let first = context(&backend);
    let second = context(&backend);

    let schema = first.parameter_schema();
    assert_eq!(schema, second.parameter_schema());
    assert_eq!(schema.generator.len(), 10);
    assert_eq!(schema.renderer.len(), 6);
    for name in ["meta_offset", "point_offset", "glyph_height", "translate"] {
        assert!(schema.generator.contains(name), "generator missing {name}");
    }
    for name in ["font_projection", "font_index", "font_atlas", "padding"] {
        assert!(schema.renderer.contains(name), "renderer missing {name}");
    }
}

#[test]
fn test_compile_failure_carries_stage_log() {
    let backend = backend();
    backend.fail_stage(ShaderStage::Geometry);

    let err = Context::create(Rc::clone(&backend))
        .err()
        .expect("geometry stage should fail");
    match err {
        Error::ShaderCompile {
            program,
            stage,
            log,
        } => {
            assert_eq!(program, "renderer");
            assert_eq!(stage, ShaderStage::Geometry);
            assert!(log.contains("geometry"), "log: {log}");
        }
        other => panic!("unexpected error: {other}"),
    }
    // The generator linked before the renderer failed; it must not leak.
    assert_eq!(backend.live_objects(), 0);
}

#[test]
fn test_link_failure_is_reported() {
    let backend = backend();
    backend.fail_link();
    let err = Context::create(Rc::clone(&backend))
        .err()
        .expect("link should fail");
    assert!(matches!(err, Error::ProgramLink { program: "generator", .. }));
    assert_eq!(backend.live_objects(), 0);
}

#[test]
fn test_destroy_releases_every_object() {
    let backend = backend();
    let ctx = context(&backend);
    assert_eq!(backend.live_objects(), 2);

    let mut font = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 256)).unwrap();
    font.generate('A' as u32..='C' as u32).unwrap();
    assert!(backend.live_objects() > 2);

    font.destroy();
    assert_eq!(backend.live_objects(), 2);
    ctx.destroy();
    assert_eq!(backend.live_objects(), 0);

    let deletes = backend
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::Delete { .. }))
        .count();
    // Two programs, three textures plus the atlas, a framebuffer, two buffers
    // and two vertex arrays.
    assert_eq!(deletes, 11);
}

#[test]
fn test_font_creation_failure_releases_partial_objects() {
    let backend = backend();
    let ctx = context(&backend);
    let err = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 0))
        .err()
        .expect("zero texture size should be rejected");
    assert!(matches!(err, Error::InvalidConfig(_)));

    let err = Font::new(&ctx, Rectangles::new(), params(2.0, 2.0, 16384))
        .err()
        .expect("oversized texture should be rejected");
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(backend.live_objects(), 2);
}
