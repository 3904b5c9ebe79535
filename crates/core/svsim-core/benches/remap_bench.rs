//! REMAP 游标性能基准测试
//!
//! 比较各类调度的构建开销与游标遍历吞吐量

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use svsim_core::SvShape;
use svsim_core::svshape::{MODE_DCT, MODE_FFT, MODE_MATRIX, MODE_PREDUCE};

fn shapes() -> Vec<(&'static str, SvShape)> {
    vec![
        (
            "matrix_8x8x2",
            SvShape::default().with_lims([8, 8, 2]).with_mode(MODE_MATRIX),
        ),
        (
            "fft_64",
            SvShape::default().with_lims([64, 1, 1]).with_mode(MODE_FFT),
        ),
        (
            "dct_inner_32",
            SvShape::default()
                .with_lims([32, 2, 1])
                .with_mode(MODE_DCT)
                .with_permute(0b01),
        ),
        (
            "preduce_64",
            SvShape::default().with_lims([64, 1, 1]).with_mode(MODE_PREDUCE),
        ),
    ]
}

/// 基准测试：构建游标
fn bench_cursor_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("remap_cursor_build");
    for (name, shape) in shapes() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &shape, |b, s| {
            b.iter(|| black_box(s.cursor()))
        });
    }
    group.finish();
}

/// 基准测试：按步号查询（调度器每条指令的访问模式）
fn bench_step_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("remap_step_at");
    for (name, shape) in shapes() {
        let Ok(cursor) = shape.cursor() else {
            continue;
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut acc = 0u32;
                for step in 0..128usize {
                    if let Some(s) = cursor.step_at(black_box(step)) {
                        acc = acc.wrapping_add(s.index);
                    }
                }
                acc
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cursor_build, bench_step_at);
criterion_main!(benches);
